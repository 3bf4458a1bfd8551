use clap::{Args, Subcommand};
use std::path::PathBuf;

use vportmsg_frame::{Channel, ChannelConfig, MessageKind};

use crate::exit::{frame_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod doctor;
pub mod kinds;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single notification.
    Send(SendArgs),
    /// Read and print frames until the port closes.
    Listen(ListenArgs),
    /// List the message catalog.
    Kinds(KindsArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Check the local port environment.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Kinds(args) => kinds::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

/// Where to find the port: a name under the platform namespace, or an
/// explicit device path.
#[derive(Args, Debug, Clone)]
pub struct PortArgs {
    /// Port name (e.g. com.redhat.rhevm.vdsm).
    #[arg(required_unless_present = "device", conflicts_with = "device")]
    pub port: Option<String>,
    /// Open this device path instead of resolving a port name.
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,
    /// Maximum payload size in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_payload: Option<usize>,
}

impl PortArgs {
    pub fn open(&self) -> CliResult<Channel> {
        let mut config = ChannelConfig::default();
        if let Some(max) = self.max_payload {
            config.max_payload_size = max;
        }

        let opened = match (&self.port, &self.device) {
            (_, Some(path)) => Channel::open_path_with_config(path, config),
            (Some(port), None) => Channel::open_with_config(port, config),
            (None, None) => return Err(CliError::new(USAGE, "a port name or --device is required")),
        };
        opened.map_err(|err| frame_error("open failed", err))
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Message kind, by name (session-logon) or code (15).
    #[arg(long, short = 'k')]
    pub kind: MessageKind,
    /// Text payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the text payload from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Wait for one frame from the host and print it.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Decode the message code embedded at the start of each payload.
    #[arg(long)]
    pub replies: bool,
}

#[derive(Args, Debug, Default)]
pub struct KindsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    /// Also check that this named port exists.
    #[arg(long)]
    pub port: Option<String>,
}
