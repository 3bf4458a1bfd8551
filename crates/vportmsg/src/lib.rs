//! Guest agent notifications over virtio serial ports.
//!
//! vportmsg sends and receives the fixed-layout frames a guest agent
//! exchanges with its host over a named virtio serial port, on Linux
//! (`/dev/virtio-ports`) and Windows (`\\.\Global`, overlapped I/O).
//!
//! # Crate Structure
//!
//! - [`transport`] - Blocking byte backends (device nodes, overlapped handles)
//! - [`frame`] - Message catalog, frame codec and the [`frame::Channel`] handle

/// Re-export transport types.
pub mod transport {
    pub use vportmsg_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use vportmsg_frame::*;
}
