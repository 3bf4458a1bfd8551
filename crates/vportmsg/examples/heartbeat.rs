//! Minimal guest agent - announces itself and sends periodic heartbeats.
//!
//! Run inside a guest that has a named virtio serial port:
//!   cargo run --example heartbeat -- com.redhat.rhevm.vdsm
//!
//! Pass a device path instead of a port name to point it at any file:
//!   cargo run --example heartbeat -- --device /tmp/agent.bin

use std::time::Duration;

use vportmsg::frame::{Channel, MessageKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let mut channel = match args.next().as_deref() {
        Some("--device") => {
            let path = args.next().ok_or("--device needs a path")?;
            Channel::open_path(path)?
        }
        Some(port) => Channel::open(port)?,
        None => return Err("usage: heartbeat <port-name> | --device <path>".into()),
    };
    eprintln!("Opened port ({} backend)", channel.backend_name());

    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    channel.write(MessageKind::PowerUp, "")?;
    channel.write(MessageKind::MachineName, &hostname)?;
    channel.write(MessageKind::GuestOs, std::env::consts::OS)?;

    for beat in 0..3 {
        channel.write(MessageKind::Heartbeat, "")?;
        eprintln!("Sent heartbeat {beat}");
        std::thread::sleep(Duration::from_secs(1));
    }

    channel.write(MessageKind::PowerDown, "")?;
    channel.close();
    Ok(())
}
