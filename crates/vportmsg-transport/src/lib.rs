//! Blocking byte transport over virtio serial ports.
//!
//! Provides one [`Backend`] contract over two platform primitives:
//! - Device nodes under `/dev/virtio-ports` (Linux), which already block
//! - vioserial handles under `\\.\Global` (Windows), which only support
//!   overlapped I/O and are wrapped in a [`BufferedOverlappedReader`]
//!
//! This is the lowest layer of vportmsg. Framing lives in `vportmsg-frame`.

use std::path::Path;

pub mod error;
pub mod overlapped;
pub mod path;
pub mod queue;
pub mod traits;

#[cfg(unix)]
pub mod posix;

#[cfg(windows)]
pub mod win;

pub use error::{Result, TransportError};
pub use overlapped::{BufferedOverlappedReader, OverlappedConfig, OverlappedIo};
pub use path::{device_path, posix_device_path, windows_device_path};
pub use queue::ChunkQueue;
pub use traits::Backend;

#[cfg(unix)]
pub use posix::PosixBackend;

#[cfg(windows)]
pub use win::OverlappedHandle;

/// Open `path` with the backend this platform needs.
///
/// `config` only applies where reads go through the overlapped buffer.
#[cfg_attr(not(windows), allow(unused_variables))]
pub fn open_backend(path: impl AsRef<Path>, config: &OverlappedConfig) -> Result<Box<dyn Backend>> {
    #[cfg(windows)]
    {
        let handle = OverlappedHandle::open(path)?;
        Ok(Box::new(BufferedOverlappedReader::with_config(
            handle,
            config.clone(),
        )))
    }

    #[cfg(unix)]
    {
        Ok(Box::new(PosixBackend::open(path)?))
    }
}
