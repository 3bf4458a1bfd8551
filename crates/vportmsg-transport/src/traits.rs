use bytes::Bytes;

use crate::error::Result;

/// Raw read/write primitive for an open port.
///
/// There are exactly two implementors: [`crate::PosixBackend`] for device
/// nodes that already block, and [`crate::BufferedOverlappedReader`] for
/// handles that only expose overlapped I/O. A channel picks one at open time
/// and never branches on the platform again.
pub trait Backend: Send {
    /// Read exactly `n` bytes, blocking until they are available.
    ///
    /// A shorter result is only returned when the peer reached end-of-stream
    /// first; an empty result means nothing at all was left to read.
    fn read(&mut self, n: usize) -> Result<Bytes>;

    /// Write the whole buffer and wait until the transfer completed.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Flush any user-space buffering below the channel.
    fn flush(&mut self) -> Result<()>;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        (**self).read(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
