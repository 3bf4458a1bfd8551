use bytes::BytesMut;
use tracing::{trace, warn};
use vportmsg_transport::Backend;

use crate::codec::pack_message_into;
use crate::error::{FrameError, Result};
use crate::kind::MessageKind;

/// Encode a `kind` message carrying `payload` and hand it to `backend`.
///
/// The frame is written in one backend call; it has been transferred when
/// this returns.
pub fn write_frame<B: Backend + ?Sized>(
    backend: &mut B,
    kind: MessageKind,
    payload: &str,
    max_payload: usize,
) -> Result<()> {
    if payload.len() > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: max_payload,
        });
    }
    if kind.is_deprecated() {
        warn!(%kind, "sending deprecated message kind");
    }

    let mut buf = BytesMut::new();
    pack_message_into(kind, payload, &mut buf)?;
    backend.write(&buf)?;

    trace!(%kind, size = buf.len(), "frame sent");
    Ok(())
}
