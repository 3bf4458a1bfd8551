use bytes::Bytes;
use tracing::trace;
use vportmsg_transport::Backend;

use crate::codec::{parse_read_header, READ_HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Largest single read used while skipping an oversized payload.
const DISCARD_CHUNK_SIZE: usize = 4096;

/// Read one frame payload from `backend`.
///
/// Asks for exactly [`READ_HEADER_SIZE`] bytes, then for the payload the
/// header announces. Returns `Ok(None)` when the backend produced no header
/// bytes at all (end-of-stream); a partial header or payload is an error.
///
/// A payload above `max_payload` is read and dropped before
/// [`FrameError::PayloadTooLarge`] is returned, so the next call starts on
/// the following header.
pub fn read_frame<B: Backend + ?Sized>(backend: &mut B, max_payload: usize) -> Result<Option<Bytes>> {
    let header = backend.read(READ_HEADER_SIZE)?;
    if header.is_empty() {
        trace!(backend = backend.name(), "end of stream");
        return Ok(None);
    }

    let payload_len = parse_read_header(&header)?;
    if payload_len > max_payload {
        discard(backend, payload_len)?;
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }
    if payload_len == 0 {
        return Ok(Some(Bytes::new()));
    }

    let payload = backend.read(payload_len)?;
    if payload.len() != payload_len {
        return Err(FrameError::TruncatedPayload {
            expected: payload_len,
            got: payload.len(),
        });
    }

    trace!(payload_len, "frame received");
    Ok(Some(payload))
}

fn discard<B: Backend + ?Sized>(backend: &mut B, len: usize) -> Result<()> {
    let mut remaining = len;
    while remaining > 0 {
        let want = remaining.min(DISCARD_CHUNK_SIZE);
        let got = backend.read(want)?.len();
        remaining -= got;
        if got < want {
            break;
        }
    }
    trace!(skipped = len - remaining, "oversized payload discarded");
    Ok(())
}
