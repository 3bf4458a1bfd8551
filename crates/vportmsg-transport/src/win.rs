use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tracing::debug;
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_IO_PENDING, GENERIC_READ, GENERIC_WRITE, HANDLE,
    INVALID_HANDLE_VALUE, WAIT_OBJECT_0,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadFile, WriteFile, FILE_FLAG_OVERLAPPED, FILE_SHARE_READ, FILE_SHARE_WRITE,
    OPEN_EXISTING,
};
use windows_sys::Win32::System::Threading::{CreateEventW, WaitForSingleObject, INFINITE};
use windows_sys::Win32::System::IO::{CancelIoEx, GetOverlappedResult, OVERLAPPED};

use crate::error::{Result, TransportError};
use crate::overlapped::OverlappedIo;

/// A vioserial port handle opened for overlapped I/O.
///
/// Owns the file handle plus one manual-reset event per direction. Both
/// events are closed before the handle on drop.
pub struct OverlappedHandle {
    handle: HANDLE,
    read_event: HANDLE,
    write_event: HANDLE,
    path: PathBuf,
}

// SAFETY: the handle and events are owned exclusively by this value and the
// Win32 calls made on them are not bound to the creating thread.
unsafe impl Send for OverlappedHandle {}

impl OverlappedHandle {
    /// Open `path` for read+write with shared access and overlapped I/O.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: `wide` is a NUL-terminated UTF-16 string that outlives the call;
        // null security attributes and template handle are permitted.
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                std::ptr::null(),
                OPEN_EXISTING,
                FILE_FLAG_OVERLAPPED,
                std::ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(TransportError::Open {
                path,
                source: std::io::Error::last_os_error(),
            });
        }

        let read_event = match create_manual_reset_event() {
            Ok(event) => event,
            Err(err) => {
                close(handle);
                return Err(err.into());
            }
        };
        let write_event = match create_manual_reset_event() {
            Ok(event) => event,
            Err(err) => {
                close(read_event);
                close(handle);
                return Err(err.into());
            }
        };

        debug!(?path, "opened overlapped port handle");
        Ok(Self {
            handle,
            read_event,
            write_event,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OverlappedIo for OverlappedHandle {
    fn read_overlapped(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let mut overlapped = new_overlapped(self.read_event);
        // SAFETY: `buf` and `overlapped` stay alive and unmoved until the
        // completion is collected below.
        let ok = unsafe {
            ReadFile(
                self.handle,
                buf.as_mut_ptr(),
                len,
                std::ptr::null_mut(),
                &mut overlapped,
            )
        };
        complete(self.handle, self.read_event, &mut overlapped, ok)
    }

    fn write_overlapped(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let len = u32::try_from(buf.len())
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "write too large"))?;
        let mut overlapped = new_overlapped(self.write_event);
        // SAFETY: as in `read_overlapped`.
        let ok = unsafe {
            WriteFile(
                self.handle,
                buf.as_ptr(),
                len,
                std::ptr::null_mut(),
                &mut overlapped,
            )
        };
        complete(self.handle, self.write_event, &mut overlapped, ok)
    }
}

impl Drop for OverlappedHandle {
    fn drop(&mut self) {
        close(self.read_event);
        close(self.write_event);
        close(self.handle);
        debug!(path = ?self.path, "closed overlapped port handle");
    }
}

fn new_overlapped(event: HANDLE) -> OVERLAPPED {
    // SAFETY: OVERLAPPED is plain data; all-zero is its documented initial state.
    let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
    overlapped.hEvent = event;
    overlapped
}

/// Wait on the direction's event and collect the transfer count.
fn complete(
    handle: HANDLE,
    event: HANDLE,
    overlapped: &mut OVERLAPPED,
    submitted: i32,
) -> std::io::Result<usize> {
    complete_with(handle, overlapped, submitted, || {
        // SAFETY: `event` is a valid event handle owned by the caller.
        unsafe { WaitForSingleObject(event, INFINITE) }
    })
}

fn complete_with(
    handle: HANDLE,
    overlapped: &mut OVERLAPPED,
    submitted: i32,
    wait: impl FnOnce() -> u32,
) -> std::io::Result<usize> {
    if submitted == 0 {
        // SAFETY: reads the calling thread's last-error value.
        let code = unsafe { GetLastError() };
        if code != ERROR_IO_PENDING {
            return Err(std::io::Error::from_raw_os_error(code as i32));
        }
    }

    if wait() != WAIT_OBJECT_0 {
        let err = std::io::Error::last_os_error();
        // The kernel may still write into `overlapped` and the caller's
        // buffer; neither may be released until the operation has ended.
        let mut transferred = 0u32;
        // SAFETY: `overlapped` is the structure the pending operation was
        // submitted with; the blocking GetOverlappedResult returns only once
        // the cancelled operation has completed.
        unsafe {
            CancelIoEx(handle, overlapped);
            GetOverlappedResult(handle, overlapped, &mut transferred, 1);
        }
        return Err(err);
    }

    let mut transferred = 0u32;
    // SAFETY: `overlapped` is the structure the operation was submitted with
    // and the operation has completed.
    let ok = unsafe { GetOverlappedResult(handle, overlapped, &mut transferred, 0) };
    if ok == 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(transferred as usize)
}

fn create_manual_reset_event() -> std::io::Result<HANDLE> {
    // SAFETY: unnamed manual-reset event, initially non-signalled.
    let event = unsafe { CreateEventW(std::ptr::null(), 1, 0, std::ptr::null()) };
    if event.is_null() {
        return Err(std::io::Error::last_os_error());
    }
    Ok(event)
}

fn close(handle: HANDLE) {
    if !handle.is_null() && handle != INVALID_HANDLE_VALUE {
        // SAFETY: each handle is closed exactly once, from `Drop` or an open
        // error path.
        unsafe {
            CloseHandle(handle);
        }
    }
}
