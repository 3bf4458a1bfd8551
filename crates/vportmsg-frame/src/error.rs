use vportmsg_transport::TransportError;

/// Errors that can occur while framing messages on a port.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The peer stopped partway through a frame header.
    #[error("truncated header ({got} of {expected} bytes)")]
    TruncatedHeader { expected: usize, got: usize },

    /// The header's total-size field is smaller than the header itself.
    #[error("invalid frame size {size} (header alone is {min} bytes)")]
    InvalidSize { size: u32, min: usize },

    /// The payload exceeds the configured or representable maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The peer stopped partway through a frame payload.
    #[error("truncated payload ({got} of {expected} bytes)")]
    TruncatedPayload { expected: usize, got: usize },

    /// A reply payload is too short to carry its embedded message code.
    #[error("reply payload too short for a message code ({len} bytes)")]
    ShortReply { len: usize },

    /// A reply body is not valid UTF-8.
    #[error("reply body is not valid UTF-8: {0}")]
    InvalidText(#[from] std::str::Utf8Error),

    /// The backend failed underneath the frame layer.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
