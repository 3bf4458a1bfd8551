//! Device path construction for named virtio serial ports.

use std::path::PathBuf;

use crate::error::{Result, TransportError};

/// Directory where udev publishes named virtio serial ports.
pub const POSIX_PORT_DIR: &str = "/dev/virtio-ports";

/// Namespace prefix for named ports exposed by the Windows vioserial driver.
pub const WINDOWS_PORT_PREFIX: &str = r"\\.\Global\";

/// Reject names that would escape the port namespace.
pub fn validate_port_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains(['/', '\\']) {
        "name contains a path separator"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(TransportError::InvalidPortName {
        name: name.to_string(),
        reason,
    })
}

/// `/dev/virtio-ports/<name>`
pub fn posix_device_path(name: &str) -> Result<PathBuf> {
    validate_port_name(name)?;
    Ok(PathBuf::from(POSIX_PORT_DIR).join(name))
}

/// `\\.\Global\<name>`
pub fn windows_device_path(name: &str) -> Result<PathBuf> {
    validate_port_name(name)?;
    Ok(PathBuf::from(format!("{WINDOWS_PORT_PREFIX}{name}")))
}

/// Device path for `name` on the platform this crate was built for.
pub fn device_path(name: &str) -> Result<PathBuf> {
    #[cfg(windows)]
    {
        windows_device_path(name)
    }

    #[cfg(not(windows))]
    {
        posix_device_path(name)
    }
}
