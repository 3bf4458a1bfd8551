//! Message catalog.
//!
//! Codes are wire constants shared with the host-side agent and must never
//! be renumbered. Codes outside the catalog are carried as
//! [`WireCode::Unknown`] instead of being rejected.

use std::fmt;
use std::str::FromStr;

/// Notification kinds exchanged over the agent port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageKind {
    PowerUp = 1,
    PowerDown = 2,
    Heartbeat = 3,
    MachineName = 4,
    GuestOs = 5,
    IpAddresses = 6,
    LastSessionMessage = 7,
    UserInfo = 8,
    NewApp = 9,
    FlushApps = 10,
    /// Deprecated by the host agent.
    ClientIp = 11,
    SessionLock = 12,
    SessionUnlock = 13,
    SessionLogoff = 14,
    SessionLogon = 15,
    /// Deprecated by the host agent.
    AgentCommand = 16,
    /// Reserved; never sent.
    AgentUninstalled = 17,
    SessionStartup = 18,
    SessionShutdown = 19,
}

impl MessageKind {
    /// Every catalog entry in code order.
    pub const ALL: [MessageKind; 19] = [
        Self::PowerUp,
        Self::PowerDown,
        Self::Heartbeat,
        Self::MachineName,
        Self::GuestOs,
        Self::IpAddresses,
        Self::LastSessionMessage,
        Self::UserInfo,
        Self::NewApp,
        Self::FlushApps,
        Self::ClientIp,
        Self::SessionLock,
        Self::SessionUnlock,
        Self::SessionLogoff,
        Self::SessionLogon,
        Self::AgentCommand,
        Self::AgentUninstalled,
        Self::SessionStartup,
        Self::SessionShutdown,
    ];

    /// The wire code.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Look up a wire code in the catalog.
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::PowerUp),
            2 => Some(Self::PowerDown),
            3 => Some(Self::Heartbeat),
            4 => Some(Self::MachineName),
            5 => Some(Self::GuestOs),
            6 => Some(Self::IpAddresses),
            7 => Some(Self::LastSessionMessage),
            8 => Some(Self::UserInfo),
            9 => Some(Self::NewApp),
            10 => Some(Self::FlushApps),
            11 => Some(Self::ClientIp),
            12 => Some(Self::SessionLock),
            13 => Some(Self::SessionUnlock),
            14 => Some(Self::SessionLogoff),
            15 => Some(Self::SessionLogon),
            16 => Some(Self::AgentCommand),
            17 => Some(Self::AgentUninstalled),
            18 => Some(Self::SessionStartup),
            19 => Some(Self::SessionShutdown),
            _ => None,
        }
    }

    /// Stable kebab-case name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PowerUp => "power-up",
            Self::PowerDown => "power-down",
            Self::Heartbeat => "heartbeat",
            Self::MachineName => "machine-name",
            Self::GuestOs => "guest-os",
            Self::IpAddresses => "ip-addresses",
            Self::LastSessionMessage => "last-session-message",
            Self::UserInfo => "user-info",
            Self::NewApp => "new-app",
            Self::FlushApps => "flush-apps",
            Self::ClientIp => "client-ip",
            Self::SessionLock => "session-lock",
            Self::SessionUnlock => "session-unlock",
            Self::SessionLogoff => "session-logoff",
            Self::SessionLogon => "session-logon",
            Self::AgentCommand => "agent-command",
            Self::AgentUninstalled => "agent-uninstalled",
            Self::SessionStartup => "session-startup",
            Self::SessionShutdown => "session-shutdown",
        }
    }

    /// Kinds the host agent no longer acts on.
    #[must_use]
    pub const fn is_deprecated(self) -> bool {
        matches!(
            self,
            Self::ClientIp | Self::AgentCommand | Self::AgentUninstalled
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for MessageKind {
    type Err = UnknownKind;

    /// Accepts the kebab-case name (case-insensitive, `_` allowed for `-`)
    /// or the decimal wire code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u32>() {
            return Self::from_u32(code).ok_or_else(|| UnknownKind(s.to_string()));
        }

        let normalized = trimmed.to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A message code as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireCode {
    Known(MessageKind),
    Unknown(u32),
}

impl WireCode {
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        match MessageKind::from_u32(value) {
            Some(kind) => Self::Known(kind),
            None => Self::Unknown(value),
        }
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Known(kind) => kind.code(),
            Self::Unknown(code) => code,
        }
    }

    #[must_use]
    pub const fn kind(self) -> Option<MessageKind> {
        match self {
            Self::Known(kind) => Some(kind),
            Self::Unknown(_) => None,
        }
    }

    /// Catalog name, or `"unknown"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Known(kind) => kind.name(),
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<MessageKind> for WireCode {
    fn from(kind: MessageKind) -> Self {
        Self::Known(kind)
    }
}

impl From<u32> for WireCode {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl fmt::Display for WireCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(kind) => write!(f, "{kind} ({})", kind.code()),
            Self::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}
