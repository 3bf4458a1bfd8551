use std::path::PathBuf;

/// Errors that can occur in port transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device path for the port.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The port name cannot be turned into a device path.
    #[error("invalid port name {name:?}: {reason}")]
    InvalidPortName { name: String, reason: &'static str },

    /// An I/O error occurred on the open handle.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single-shot write exceeded the configured transfer bound.
    #[error("write too large ({size} bytes, max {max})")]
    WriteTooLarge { size: usize, max: usize },

    /// The handle completed a write without transferring the whole buffer.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
