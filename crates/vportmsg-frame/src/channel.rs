use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;
use vportmsg_transport::overlapped::{DEFAULT_IDLE_BACKOFF, DEFAULT_READ_CHUNK_SIZE};
use vportmsg_transport::{device_path, open_backend, Backend, OverlappedConfig};

use crate::codec::{decode_payload, Reply, DEFAULT_MAX_PAYLOAD};
use crate::error::Result;
use crate::kind::MessageKind;
use crate::reader::read_frame;
use crate::writer::write_frame;

/// Configuration for an open channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Maximum payload size in bytes, both directions. Default: 1 MiB.
    pub max_payload_size: usize,
    /// Size of each overlapped read request. Default: 4096.
    pub read_chunk_size: usize,
    /// Reject single-shot writes above this size on overlapped handles.
    pub max_write_size: Option<usize>,
    /// Wait between overlapped reads that completed empty. Default: 10 ms.
    pub idle_backoff: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_write_size: None,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }
}

impl ChannelConfig {
    fn overlapped(&self) -> OverlappedConfig {
        OverlappedConfig {
            read_chunk_size: self.read_chunk_size,
            max_write_size: self.max_write_size,
            idle_backoff: self.idle_backoff,
        }
    }
}

/// An open agent port.
///
/// Owns exactly one backend for its whole lifetime; dropping the channel
/// releases the handle.
pub struct Channel {
    backend: Box<dyn Backend>,
    config: ChannelConfig,
}

impl Channel {
    /// Open the named port with default configuration.
    pub fn open(port: &str) -> Result<Self> {
        Self::open_with_config(port, ChannelConfig::default())
    }

    /// Open the named port (`/dev/virtio-ports/<port>` or `\\.\Global\<port>`).
    pub fn open_with_config(port: &str, config: ChannelConfig) -> Result<Self> {
        let path = device_path(port)?;
        Self::open_path_with_config(path, config)
    }

    /// Open an explicit device path with this platform's backend.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_path_with_config(path, ChannelConfig::default())
    }

    pub fn open_path_with_config(path: impl AsRef<Path>, config: ChannelConfig) -> Result<Self> {
        let path = path.as_ref();
        let backend = open_backend(path, &config.overlapped())?;
        debug!(?path, backend = backend.name(), "channel opened");
        Ok(Self { backend, config })
    }

    /// Attach a channel to an already constructed backend.
    pub fn from_backend(backend: Box<dyn Backend>, config: ChannelConfig) -> Self {
        Self { backend, config }
    }

    /// Read the next frame payload.
    ///
    /// Returns an empty payload when the peer has closed the port, which is
    /// indistinguishable from a zero-length frame. Use [`Channel::read_frame`]
    /// when the difference matters.
    pub fn read(&mut self) -> Result<Bytes> {
        Ok(self.read_frame()?.unwrap_or_default())
    }

    /// Read the next frame payload, `None` on end-of-stream.
    ///
    /// A payload over `max_payload_size` is skipped and reported as
    /// [`FrameError::PayloadTooLarge`](crate::FrameError::PayloadTooLarge);
    /// the channel stays readable afterwards.
    pub fn read_frame(&mut self) -> Result<Option<Bytes>> {
        read_frame(&mut self.backend, self.config.max_payload_size)
    }

    /// Read the next frame and decode it as a reply.
    pub fn read_reply(&mut self) -> Result<Option<Reply>> {
        match self.read_frame()? {
            Some(payload) => Ok(Some(decode_payload(payload)?)),
            None => Ok(None),
        }
    }

    /// Send one `kind` notification carrying `arg`.
    pub fn write(&mut self, kind: MessageKind, arg: &str) -> Result<()> {
        write_frame(&mut self.backend, kind, arg, self.config.max_payload_size)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.backend.flush()?;
        Ok(())
    }

    /// Close the channel and release its handle.
    pub fn close(self) {
        debug!(backend = self.backend.name(), "channel closed");
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("backend", &self.backend.name())
            .field("max_payload_size", &self.config.max_payload_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use bytes::{BufMut, BytesMut};
    use vportmsg_transport::{BufferedOverlappedReader, OverlappedIo, TransportError};

    use super::*;
    use crate::codec::{decode_message, READ_HEADER_SIZE};
    use crate::error::FrameError;
    use crate::kind::WireCode;

    /// Host side of a fake port: queued deliveries in, recorded writes out.
    #[derive(Clone, Default)]
    struct FakePort {
        deliveries: Arc<Mutex<VecDeque<Vec<u8>>>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl OverlappedIo for FakePort {
        fn read_overlapped(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let mut deliveries = self.deliveries.lock().unwrap();
            match deliveries.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        deliveries.push_front(chunk[n..].to_vec());
                    }
                    Ok(n)
                }
                None => Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe)),
            }
        }

        fn write_overlapped(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    fn incoming(payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u32(0);
        buf.put_u32(0);
        buf.put_u32((READ_HEADER_SIZE + payload.len()) as u32);
        buf.put_slice(payload);
        buf.to_vec()
    }

    fn overlapped_channel(port: &FakePort) -> Channel {
        let config = ChannelConfig {
            idle_backoff: Duration::ZERO,
            ..ChannelConfig::default()
        };
        let backend = BufferedOverlappedReader::with_config(port.clone(), config.overlapped());
        Channel::from_backend(Box::new(backend), config)
    }

    #[test]
    fn write_then_host_decodes() {
        let port = FakePort::default();
        let mut channel = overlapped_channel(&port);

        channel.write(MessageKind::SessionLogon, "user1").unwrap();
        channel.write(MessageKind::Heartbeat, "").unwrap();
        channel.flush().unwrap();

        let mut wire = BytesMut::from(port.written.lock().unwrap().as_slice());
        let first = decode_message(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let second = decode_message(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(first.code, WireCode::Known(MessageKind::SessionLogon));
        assert_eq!(first.payload.as_ref(), b"user1");
        assert_eq!(second.code, WireCode::Known(MessageKind::Heartbeat));
        assert!(second.payload.is_empty());
    }

    #[test]
    fn read_reassembles_fragmented_frames() {
        let port = FakePort::default();
        let mut wire = incoming(b"hello guest");
        wire.extend(incoming(b"again"));
        {
            let mut deliveries = port.deliveries.lock().unwrap();
            deliveries.push_back(wire[..10].to_vec());
            deliveries.push_back(wire[10..13].to_vec());
            deliveries.push_back(Vec::new());
            deliveries.push_back(wire[13..].to_vec());
        }

        let mut channel = overlapped_channel(&port);
        assert_eq!(channel.read().unwrap().as_ref(), b"hello guest");
        assert_eq!(channel.read().unwrap().as_ref(), b"again");
        assert_eq!(channel.backend_name(), "overlapped");
    }

    #[test]
    fn read_reply_decodes_embedded_code() {
        let port = FakePort::default();
        let mut payload = BytesMut::new();
        payload.put_u32(MessageKind::GuestOs.code());
        payload.put_slice(b"Windows Server 2022\0");
        port.deliveries
            .lock()
            .unwrap()
            .push_back(incoming(&payload));

        let mut channel = overlapped_channel(&port);
        let reply = channel.read_reply().unwrap().unwrap();
        assert_eq!(reply.code.kind(), Some(MessageKind::GuestOs));
        assert_eq!(reply.text().unwrap(), "Windows Server 2022");
    }

    #[test]
    fn transport_failures_surface_as_frame_errors() {
        let port = FakePort::default();
        let mut channel = overlapped_channel(&port);
        let err = channel.read().unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Io(_))));
    }

    #[test]
    fn oversized_write_is_rejected() {
        let port = FakePort::default();
        let config = ChannelConfig {
            max_payload_size: 3,
            ..ChannelConfig::default()
        };
        let backend = BufferedOverlappedReader::new(port.clone());
        let mut channel = Channel::from_backend(Box::new(backend), config);

        let err = channel.write(MessageKind::MachineName, "guest").unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(port.written.lock().unwrap().is_empty());
    }

    #[test]
    fn oversized_frame_does_not_break_the_channel() {
        let port = FakePort::default();
        let mut wire = incoming(&[0xAB; 20]);
        wire.extend(incoming(b"next"));
        port.deliveries.lock().unwrap().push_back(wire);

        let config = ChannelConfig {
            max_payload_size: 16,
            idle_backoff: Duration::ZERO,
            ..ChannelConfig::default()
        };
        let backend = BufferedOverlappedReader::with_config(port.clone(), config.overlapped());
        let mut channel = Channel::from_backend(Box::new(backend), config);

        let err = channel.read().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 20, max: 16 }));
        assert_eq!(channel.read().unwrap().as_ref(), b"next");
    }

    #[test]
    fn invalid_port_name_fails_before_open() {
        let err = Channel::open("../escape").unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::InvalidPortName { .. })
        ));
    }

    #[test]
    #[cfg(unix)]
    fn posix_channel_reads_until_end_of_stream() {
        let path = std::env::temp_dir().join(format!(
            "vportmsg-channel-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        let mut wire = incoming(b"one");
        wire.extend(incoming(b"two"));
        std::fs::write(&path, &wire).unwrap();

        let mut channel = Channel::open_path(&path).unwrap();
        assert_eq!(channel.backend_name(), "posix");
        assert_eq!(channel.read().unwrap().as_ref(), b"one");
        assert_eq!(channel.read().unwrap().as_ref(), b"two");
        assert!(channel.read().unwrap().is_empty());
        assert!(channel.read_frame().unwrap().is_none());
        channel.close();

        let _ = std::fs::remove_file(&path);
    }
}
