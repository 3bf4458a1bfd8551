//! Guest agent message framing over virtio serial ports.
//!
//! Outgoing notifications are framed as four big-endian u32 fields (magic,
//! sub-type, total size, message kind) followed by a text payload. Incoming
//! frames carry a three-field header whose last field is the total size.
//! [`Channel`] ties the codec to a platform backend and hands callers whole
//! payloads, whatever chunking the port delivered them in.

pub mod channel;
pub mod codec;
pub mod error;
pub mod kind;
pub mod reader;
pub mod writer;

pub use channel::{Channel, ChannelConfig};
pub use codec::{
    decode_message, decode_payload, pack_message, pack_message_into, parse_read_header,
    parse_write_header, Message, ReadHeader, Reply, WriteHeader, DEFAULT_MAX_PAYLOAD,
    READ_HEADER_SIZE, WRITE_HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use kind::{MessageKind, UnknownKind, WireCode};
pub use reader::read_frame;
pub use writer::write_frame;
