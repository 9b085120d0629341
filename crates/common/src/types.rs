//! Core data types shared by the scanner, the attack catalog and the capture pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::BlueError;

/// 6-byte radio address, rendered as canonical upper-case colon-hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BdAddr(pub [u8; 6]);

impl BdAddr {
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Octets in the little-endian order the kernel expects in `bdaddr_t`.
    #[inline]
    #[must_use]
    pub fn to_le_octets(&self) -> [u8; 6] {
        let mut b = self.0;
        b.reverse();
        b
    }

    /// Filesystem-safe form, `AA_BB_CC_DD_EE_FF`.
    #[must_use]
    pub fn to_file_stem(&self) -> String {
        self.to_string().replace(':', "_")
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for BdAddr {
    type Err = BlueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 6];
        let mut groups = s.trim().split(':');
        for slot in out.iter_mut() {
            let group = groups
                .next()
                .ok_or_else(|| BlueError::InvalidAddress(s.to_string()))?;
            if group.len() != 2 {
                return Err(BlueError::InvalidAddress(s.to_string()));
            }
            *slot = u8::from_str_radix(group, 16)
                .map_err(|_| BlueError::InvalidAddress(s.to_string()))?;
        }
        if groups.next().is_some() {
            return Err(BlueError::InvalidAddress(s.to_string()));
        }
        Ok(Self(out))
    }
}

impl Serialize for BdAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BdAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Coarse device category inferred from the name or the stack's icon hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Phone,
    Computer,
    Headset,
    Speaker,
    #[default]
    Unknown,
}

impl DeviceClass {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Phone => "phone",
            DeviceClass::Computer => "computer",
            DeviceClass::Headset => "headset",
            DeviceClass::Speaker => "speaker",
            DeviceClass::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered peer. Owned by the device registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub address: BdAddr,
    pub name: String,
    #[serde(rename = "type")]
    pub device_class: DeviceClass,
    #[serde(rename = "signal")]
    pub signal_strength: Option<i16>,
    pub services: Vec<String>,
    pub paired: bool,
    pub trusted: bool,
    pub connected: bool,
}

impl Device {
    pub const UNKNOWN_NAME: &'static str = "Unknown";

    #[inline]
    #[must_use]
    pub fn new(address: BdAddr) -> Self {
        Self {
            address,
            name: Self::UNKNOWN_NAME.to_string(),
            device_class: DeviceClass::Unknown,
            signal_strength: None,
            services: Vec::new(),
            paired: false,
            trusted: false,
            connected: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        let name = name.into();
        self.name = if name.trim().is_empty() {
            Self::UNKNOWN_NAME.to_string()
        } else {
            name
        };
        self
    }

    #[inline]
    #[must_use]
    pub fn with_class(mut self, class: DeviceClass) -> Self {
        self.device_class = class;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_services(mut self, services: Vec<String>) -> Self {
        self.services = services;
        self
    }
}

/// Events emitted by a scan worker, in production order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    DeviceFound(Device),
    ScanComplete(Vec<Device>),
}

/// The nine attack modules. Resolved to an implementation through the
/// catalog's fixed registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttackKind {
    /// Vulnerability sweep (BlueBorne-style).
    VulnSweep,
    /// Weak-key negotiation (KNOB-style).
    WeakKey,
    /// L2CAP flood / DoS (BlueSmack-style).
    Flood,
    /// OBEX data exfiltration (BlueSnarf-style).
    Exfiltrate,
    /// Unsolicited OBEX messaging (BlueJacking-style).
    Message,
    /// Raw frame injection on fixed PSMs.
    Inject,
    /// SDP buffer overflow.
    SdpOverflow,
    /// Pairing PIN recovery.
    PinRecovery,
    /// AT-command abuse over RFCOMM (BlueBug-style).
    AtCommand,
}

impl AttackKind {
    pub const ALL: [AttackKind; 9] = [
        AttackKind::VulnSweep,
        AttackKind::WeakKey,
        AttackKind::Flood,
        AttackKind::Exfiltrate,
        AttackKind::Message,
        AttackKind::Inject,
        AttackKind::SdpOverflow,
        AttackKind::PinRecovery,
        AttackKind::AtCommand,
    ];

    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AttackKind::VulnSweep => "vuln-sweep",
            AttackKind::WeakKey => "weak-key",
            AttackKind::Flood => "flood",
            AttackKind::Exfiltrate => "exfiltrate",
            AttackKind::Message => "message",
            AttackKind::Inject => "inject",
            AttackKind::SdpOverflow => "sdp-overflow",
            AttackKind::PinRecovery => "pin-recovery",
            AttackKind::AtCommand => "at-command",
        }
    }

    /// Name of the historical attack the module models.
    #[must_use]
    pub const fn classic_name(&self) -> &'static str {
        match self {
            AttackKind::VulnSweep => "BlueBorne",
            AttackKind::WeakKey => "KNOB",
            AttackKind::Flood => "BlueSmack",
            AttackKind::Exfiltrate => "BlueSnarf",
            AttackKind::Message => "BlueJacking",
            AttackKind::Inject => "L2CAP Injection",
            AttackKind::SdpOverflow => "SDP Overflow",
            AttackKind::PinRecovery => "PIN Cracking",
            AttackKind::AtCommand => "BlueBug",
        }
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackKind {
    type Err = BlueError;

    /// Accepts the kebab-case id or the classic attack name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AttackKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted || k.classic_name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| BlueError::Config(format!("unknown attack kind '{}'", s)))
    }
}

/// Lifecycle of an attack session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
    Stopped,
}

impl AttackStatus {
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttackStatus::Succeeded | AttackStatus::Failed | AttackStatus::Stopped
        )
    }
}

impl fmt::Display for AttackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttackStatus::Idle => "idle",
            AttackStatus::Running => "running",
            AttackStatus::Succeeded => "succeeded",
            AttackStatus::Failed => "failed",
            AttackStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Severity attached to every attack log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        };
        f.write_str(s)
    }
}

/// Structured log/progress event produced by attack workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub session: Uuid,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Final notification for an attack session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub session: Uuid,
    pub kind: AttackKind,
    pub target: BdAddr,
    pub status: AttackStatus,
    pub elapsed: Duration,
    /// Fault text when the attack aborted on an unexpected error.
    pub fault: Option<String>,
}

/// Protocol tags recognised in link traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProtocolTag {
    Hci,
    L2cap,
    Rfcomm,
    Sdp,
    Obex,
    Avdtp,
    Avctp,
    Unknown,
}

impl ProtocolTag {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProtocolTag::Hci => "HCI",
            ProtocolTag::L2cap => "L2CAP",
            ProtocolTag::Rfcomm => "RFCOMM",
            ProtocolTag::Sdp => "SDP",
            ProtocolTag::Obex => "OBEX",
            ProtocolTag::Avdtp => "AVDTP",
            ProtocolTag::Avctp => "AVCTP",
            ProtocolTag::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolTag {
    type Err = BlueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HCI" => Ok(ProtocolTag::Hci),
            "L2CAP" => Ok(ProtocolTag::L2cap),
            "RFCOMM" => Ok(ProtocolTag::Rfcomm),
            "SDP" => Ok(ProtocolTag::Sdp),
            "OBEX" => Ok(ProtocolTag::Obex),
            "AVDTP" => Ok(ProtocolTag::Avdtp),
            "AVCTP" => Ok(ProtocolTag::Avctp),
            "UNKNOWN" => Ok(ProtocolTag::Unknown),
            other => Err(BlueError::Config(format!("unknown protocol tag '{}'", other))),
        }
    }
}

/// Direction marker from the trace (`>` outbound, `<` inbound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
    Unknown,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
            Direction::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl FromStr for Direction {
    type Err = BlueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "inbound" | "<" => Ok(Direction::In),
            "out" | "outbound" | ">" => Ok(Direction::Out),
            "unknown" => Ok(Direction::Unknown),
            other => Err(BlueError::Config(format!("unknown direction '{}'", other))),
        }
    }
}

/// One structured record produced from a trace line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPacket {
    pub timestamp: DateTime<Utc>,
    /// False when the trace line carried no timestamp and wall-clock time was used.
    pub timestamp_from_trace: bool,
    pub protocol: ProtocolTag,
    pub direction: Direction,
    pub source: String,
    pub destination: String,
    pub payload: Vec<u8>,
    pub raw_line: String,
}

/// Radio transport selected for a socket connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    /// Connection-oriented L2CAP (SOCK_SEQPACKET), channel = PSM.
    L2cap,
    /// Connectionless L2CAP (SOCK_DGRAM), channel = PSM.
    L2capDatagram,
    /// RFCOMM stream, channel = RFCOMM channel number.
    Rfcomm,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Transport::L2cap => "l2cap",
            Transport::L2capDatagram => "l2cap-dgram",
            Transport::Rfcomm => "rfcomm",
        };
        f.write_str(s)
    }
}
