use std::time::Duration;

use bytes::Bytes;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::queue::ChunkQueue;
use crate::traits::Backend;

/// Largest transfer the vioserial driver completes in one overlapped read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Pause between overlapped reads that completed without data.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// A handle whose only I/O primitive is "submit, then wait for completion".
///
/// Both calls block the calling thread on the completion event of their
/// direction until the OS reports the transfer count.
pub trait OverlappedIo: Send {
    /// Submit one read of up to `buf.len()` bytes and wait for it to finish.
    fn read_overlapped(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Submit one write of `buf` and wait for it to finish.
    fn write_overlapped(&mut self, buf: &[u8]) -> std::io::Result<usize>;
}

/// Tuning for [`BufferedOverlappedReader`].
#[derive(Debug, Clone)]
pub struct OverlappedConfig {
    /// Size of each overlapped read request.
    pub read_chunk_size: usize,
    /// Reject writes larger than this instead of submitting them.
    pub max_write_size: Option<usize>,
    /// Wait after a zero-byte completion before resubmitting.
    pub idle_backoff: Duration,
}

impl Default for OverlappedConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_write_size: None,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }
}

/// Exact-size blocking reads on top of an overlapped handle.
///
/// Every `read(n)` keeps submitting chunk-sized overlapped reads into an
/// ordered [`ChunkQueue`] until at least `n` bytes are queued, then slices
/// exactly `n` bytes off the head. Whatever the transport delivered beyond
/// that stays queued for the next call.
pub struct BufferedOverlappedReader<I> {
    io: I,
    queue: ChunkQueue,
    config: OverlappedConfig,
}

impl<I: OverlappedIo> BufferedOverlappedReader<I> {
    pub fn new(io: I) -> Self {
        Self::with_config(io, OverlappedConfig::default())
    }

    pub fn with_config(io: I, config: OverlappedConfig) -> Self {
        Self {
            io,
            queue: ChunkQueue::new(),
            config,
        }
    }

    /// Bytes received from the handle but not yet returned to a caller.
    pub fn buffered(&self) -> usize {
        self.queue.len()
    }

    pub fn get_ref(&self) -> &I {
        &self.io
    }

    pub fn config(&self) -> &OverlappedConfig {
        &self.config
    }

    pub fn into_inner(self) -> I {
        self.io
    }

    fn fill(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.config.read_chunk_size.max(1)];
        loop {
            let read = self.io.read_overlapped(&mut buf)?;
            if read > 0 {
                trace!(read, queued = self.queue.len() + read, "overlapped read completed");
                self.queue.push(Bytes::copy_from_slice(&buf[..read]));
                return Ok(());
            }

            // The port delivers nothing until the host side writes; keep waiting.
            trace!("overlapped read completed empty");
            if !self.config.idle_backoff.is_zero() {
                std::thread::sleep(self.config.idle_backoff);
            }
        }
    }
}

impl<I: OverlappedIo> Backend for BufferedOverlappedReader<I> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        while self.queue.len() < n {
            self.fill()?;
        }
        Ok(self.queue.take(n).unwrap_or_default())
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        if let Some(max) = self.config.max_write_size {
            if buf.len() > max {
                return Err(TransportError::WriteTooLarge {
                    size: buf.len(),
                    max,
                });
            }
        }

        let written = self.io.write_overlapped(buf)?;
        if written != buf.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: buf.len(),
            });
        }
        trace!(written, "overlapped write completed");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "overlapped"
    }
}

impl<I> std::fmt::Debug for BufferedOverlappedReader<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedOverlappedReader")
            .field("buffered", &self.queue.len())
            .field("chunks", &self.queue.chunk_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::ErrorKind;

    use super::*;

    /// Delivers a fixed script of completions, one per overlapped read.
    #[derive(Default)]
    struct ScriptedIo {
        completions: VecDeque<std::io::Result<Vec<u8>>>,
        reads_submitted: usize,
        written: Vec<Vec<u8>>,
        short_write: bool,
    }

    impl ScriptedIo {
        fn with_chunks(chunks: &[&[u8]]) -> Self {
            Self {
                completions: chunks.iter().map(|c| Ok(c.to_vec())).collect(),
                ..Self::default()
            }
        }
    }

    impl OverlappedIo for ScriptedIo {
        fn read_overlapped(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads_submitted += 1;
            match self.completions.pop_front() {
                Some(Ok(chunk)) => {
                    assert!(chunk.len() <= buf.len(), "script chunk exceeds request");
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(err)) => Err(err),
                None => panic!("read submitted after script ran out"),
            }
        }

        fn write_overlapped(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.push(buf.to_vec());
            if self.short_write {
                Ok(buf.len() / 2)
            } else {
                Ok(buf.len())
            }
        }
    }

    fn no_backoff() -> OverlappedConfig {
        OverlappedConfig {
            idle_backoff: Duration::ZERO,
            ..OverlappedConfig::default()
        }
    }

    #[test]
    fn reads_split_across_uneven_chunks() {
        let data: Vec<u8> = (100u8..120).collect();
        let io = ScriptedIo::with_chunks(&[&data[..10], &data[10..13], &data[13..]]);
        let mut reader = BufferedOverlappedReader::with_config(io, no_backoff());

        let first = reader.read(12).unwrap();
        assert_eq!(first.as_ref(), &data[..12]);
        assert_eq!(reader.buffered(), 1);

        let second = reader.read(8).unwrap();
        assert_eq!(second.as_ref(), &data[12..]);
        assert_eq!(reader.buffered(), 0);
        assert_eq!(reader.get_ref().reads_submitted, 3);
    }

    #[test]
    fn satisfied_read_does_not_touch_the_handle() {
        let io = ScriptedIo::with_chunks(&[b"0123456789"]);
        let mut reader = BufferedOverlappedReader::with_config(io, no_backoff());

        assert_eq!(reader.read(4).unwrap().as_ref(), b"0123");
        assert_eq!(reader.read(4).unwrap().as_ref(), b"4567");
        assert_eq!(reader.read(2).unwrap().as_ref(), b"89");
        assert_eq!(reader.get_ref().reads_submitted, 1);
    }

    #[test]
    fn zero_byte_completions_are_retried() {
        let io = ScriptedIo::with_chunks(&[b"", b"", b"ab", b"", b"cd"]);
        let mut reader = BufferedOverlappedReader::with_config(io, no_backoff());

        assert_eq!(reader.read(4).unwrap().as_ref(), b"abcd");
        assert_eq!(reader.get_ref().reads_submitted, 5);
    }

    #[test]
    fn hard_errors_propagate_without_retry() {
        let mut io = ScriptedIo::with_chunks(&[b"ab"]);
        io.completions
            .push_back(Err(std::io::Error::from(ErrorKind::BrokenPipe)));
        let mut reader = BufferedOverlappedReader::with_config(io, no_backoff());

        let err = reader.read(4).unwrap_err();
        assert!(matches!(err, TransportError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
        // Bytes received before the failure are still queued.
        assert_eq!(reader.buffered(), 2);
        assert_eq!(reader.get_ref().reads_submitted, 2);
    }

    #[test]
    fn read_requests_use_configured_chunk_size() {
        struct SizeProbe(Vec<usize>);

        impl OverlappedIo for SizeProbe {
            fn read_overlapped(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.0.push(buf.len());
                buf.fill(7);
                Ok(buf.len())
            }

            fn write_overlapped(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                Ok(buf.len())
            }
        }

        let mut reader = BufferedOverlappedReader::new(SizeProbe(Vec::new()));
        let out = reader.read(DEFAULT_READ_CHUNK_SIZE + 1).unwrap();
        assert_eq!(out.len(), DEFAULT_READ_CHUNK_SIZE + 1);
        assert_eq!(reader.buffered(), DEFAULT_READ_CHUNK_SIZE - 1);
        assert_eq!(
            reader.into_inner().0,
            vec![DEFAULT_READ_CHUNK_SIZE, DEFAULT_READ_CHUNK_SIZE]
        );
    }

    #[test]
    fn fragmentation_does_not_change_the_byte_stream() {
        let data: Vec<u8> = (0..=255u8).cycle().take(777).collect();

        for chunk_len in [1usize, 3, 64, 500, 777] {
            for read_len in [1usize, 7, 12, 100] {
                let chunks: Vec<&[u8]> = data.chunks(chunk_len).collect();
                let io = ScriptedIo::with_chunks(&chunks);
                let mut reader = BufferedOverlappedReader::with_config(io, no_backoff());

                let mut out = Vec::new();
                while out.len() < data.len() {
                    let want = read_len.min(data.len() - out.len());
                    out.extend_from_slice(&reader.read(want).unwrap());
                }
                assert_eq!(out, data, "chunk_len={chunk_len} read_len={read_len}");
                assert_eq!(reader.buffered(), 0);
            }
        }
    }

    #[test]
    fn write_is_single_shot() {
        let mut reader = BufferedOverlappedReader::new(ScriptedIo::default());
        reader.write(b"frame-bytes").unwrap();
        reader.flush().unwrap();
        assert_eq!(reader.get_ref().written, vec![b"frame-bytes".to_vec()]);
    }

    #[test]
    fn oversized_write_is_rejected_before_submission() {
        let cfg = OverlappedConfig {
            max_write_size: Some(4),
            ..OverlappedConfig::default()
        };
        let mut reader = BufferedOverlappedReader::with_config(ScriptedIo::default(), cfg);

        let err = reader.write(b"too long").unwrap_err();
        assert!(matches!(err, TransportError::WriteTooLarge { size: 8, max: 4 }));
        assert!(reader.get_ref().written.is_empty());
    }

    #[test]
    fn short_write_is_an_error() {
        let io = ScriptedIo {
            short_write: true,
            ..ScriptedIo::default()
        };
        let mut reader = BufferedOverlappedReader::new(io);
        let err = reader.write(b"abcd").unwrap_err();
        assert!(matches!(
            err,
            TransportError::ShortWrite {
                written: 2,
                expected: 4
            }
        ));
    }
}
