use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::{MessageKind, WireCode};

/// Incoming header: three big-endian u32 fields = 12 bytes.
pub const READ_HEADER_SIZE: usize = 12;

/// Outgoing header: magic + sub-type + size + kind, big-endian u32 = 16 bytes.
pub const WRITE_HEADER_SIZE: usize = 16;

/// First outgoing header field.
pub const PROTOCOL_MAGIC: u32 = 1;

/// Second outgoing header field.
pub const MESSAGE_SUBTYPE: u32 = 3;

/// Width of the code embedded at the start of a reply payload.
pub const REPLY_CODE_SIZE: usize = 4;

/// Default maximum payload size: 1 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Header of a frame received from the host.
///
/// Only `size` is interpreted; it counts the header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadHeader {
    pub magic: u32,
    pub subtype: u32,
    pub size: u32,
}

impl ReadHeader {
    pub fn from_bytes(raw: &[u8; READ_HEADER_SIZE]) -> Self {
        let mut buf = &raw[..];
        Self {
            magic: buf.get_u32(),
            subtype: buf.get_u32(),
            size: buf.get_u32(),
        }
    }

    /// Payload bytes that follow this header.
    pub fn payload_len(&self) -> Result<usize> {
        (self.size as usize)
            .checked_sub(READ_HEADER_SIZE)
            .ok_or(FrameError::InvalidSize {
                size: self.size,
                min: READ_HEADER_SIZE,
            })
    }
}

/// Header of a frame sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteHeader {
    pub magic: u32,
    pub subtype: u32,
    pub size: u32,
    pub code: WireCode,
}

impl WriteHeader {
    /// Header for a `kind` message carrying `payload_len` bytes.
    pub fn new(kind: MessageKind, payload_len: usize) -> Result<Self> {
        let size = payload_len
            .checked_add(WRITE_HEADER_SIZE)
            .and_then(|size| u32::try_from(size).ok())
            .ok_or(FrameError::PayloadTooLarge {
                size: payload_len,
                max: u32::MAX as usize - WRITE_HEADER_SIZE,
            })?;

        Ok(Self {
            magic: PROTOCOL_MAGIC,
            subtype: MESSAGE_SUBTYPE,
            size,
            code: WireCode::Known(kind),
        })
    }

    pub fn from_bytes(raw: &[u8; WRITE_HEADER_SIZE]) -> Self {
        let mut buf = &raw[..];
        Self {
            magic: buf.get_u32(),
            subtype: buf.get_u32(),
            size: buf.get_u32(),
            code: WireCode::from_u32(buf.get_u32()),
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u32(self.magic);
        dst.put_u32(self.subtype);
        dst.put_u32(self.size);
        dst.put_u32(self.code.code());
    }

    /// Payload bytes that follow this header.
    pub fn payload_len(&self) -> Result<usize> {
        (self.size as usize)
            .checked_sub(WRITE_HEADER_SIZE)
            .ok_or(FrameError::InvalidSize {
                size: self.size,
                min: WRITE_HEADER_SIZE,
            })
    }
}

/// Encode an outgoing message.
///
/// Wire format (all fields big-endian):
/// ```text
/// ┌────────────┬────────────┬────────────┬────────────┬──────────────────┐
/// │ Magic (4B) │ Subtype    │ Size (4B)  │ Kind (4B)  │ Payload          │
/// │ 1          │ (4B) 3     │ 16 + len   │            │ (len bytes)      │
/// └────────────┴────────────┴────────────┴────────────┴──────────────────┘
/// ```
pub fn pack_message_into(kind: MessageKind, payload: &str, dst: &mut BytesMut) -> Result<()> {
    let header = WriteHeader::new(kind, payload.len())?;
    dst.reserve(header.size as usize);
    header.encode(dst);
    dst.put_slice(payload.as_bytes());
    Ok(())
}

/// Encode an outgoing message into a fresh buffer.
pub fn pack_message(kind: MessageKind, payload: &str) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    pack_message_into(kind, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Payload length announced by an incoming header.
///
/// An empty `raw` means the peer closed before sending anything and maps to
/// `0`. Anything else shorter than [`READ_HEADER_SIZE`] is a truncated
/// header; only the first [`READ_HEADER_SIZE`] bytes are interpreted.
pub fn parse_read_header(raw: &[u8]) -> Result<usize> {
    if raw.is_empty() {
        return Ok(0);
    }
    let header: &[u8; READ_HEADER_SIZE] = raw
        .get(..READ_HEADER_SIZE)
        .and_then(|head| head.try_into().ok())
        .ok_or(FrameError::TruncatedHeader {
            expected: READ_HEADER_SIZE,
            got: raw.len(),
        })?;
    ReadHeader::from_bytes(header).payload_len()
}

/// Decode an outgoing header, as the host side sees it.
pub fn parse_write_header(raw: &[u8]) -> Result<WriteHeader> {
    let header: &[u8; WRITE_HEADER_SIZE] = raw
        .get(..WRITE_HEADER_SIZE)
        .and_then(|head| head.try_into().ok())
        .ok_or(FrameError::TruncatedHeader {
            expected: WRITE_HEADER_SIZE,
            got: raw.len(),
        })?;
    Ok(WriteHeader::from_bytes(header))
}

/// A complete outgoing message decoded from a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub code: WireCode,
    pub payload: Bytes,
}

/// Decode one outgoing-format message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
/// On success, consumes the message bytes from the buffer.
pub fn decode_message(src: &mut BytesMut, max_payload: usize) -> Result<Option<Message>> {
    if src.len() < WRITE_HEADER_SIZE {
        return Ok(None);
    }

    let header = parse_write_header(&src[..])?;
    let payload_len = header.payload_len()?;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < WRITE_HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(WRITE_HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    Ok(Some(Message {
        code: header.code,
        payload,
    }))
}

/// A reply payload: an embedded message code followed by a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: WireCode,
    pub body: Bytes,
}

impl Reply {
    /// The body as text, cut at the first NUL.
    pub fn text(&self) -> Result<&str> {
        let end = self
            .body
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.body.len());
        Ok(std::str::from_utf8(&self.body[..end])?)
    }
}

/// Split a reply payload into its embedded code and body.
pub fn decode_payload(mut raw: Bytes) -> Result<Reply> {
    if raw.len() < REPLY_CODE_SIZE {
        return Err(FrameError::ShortReply { len: raw.len() });
    }
    let code = WireCode::from_u32(raw.get_u32());
    Ok(Reply { code, body: raw })
}
