//! Option sets for scans, attacks and captures.
//!
//! Attack and capture options arrive as named `key=value` pairs (from the CLI
//! or a front end). Each value is read as JSON, a plain string or a
//! comma-separated list, whichever the target field accepts first, and
//! deserialized over the defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BlueError, BlueResult};
use crate::types::{Direction, ProtocolTag};

/// Lower/upper bound for any single socket or tool deadline.
pub const MIN_SOCKET_TIMEOUT: Duration = Duration::from_secs(2);
pub const MAX_SOCKET_TIMEOUT: Duration = Duration::from_secs(15);
/// Largest flood frame whose 16-bit L2CAP length still covers the payload.
pub const MAX_PACKET_SIZE: usize = 4 + u16::MAX as usize;
/// Largest overflow block whose SDP length and transaction fields stay exact.
pub const MAX_OVERFLOW_SIZE: usize = u16::MAX as usize - 4;

/// Generated payload flavour for the injection module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PayloadType {
    #[default]
    BufferOverflow,
    FormatString,
    Shellcode,
    NopSled,
}

/// Candidate source for PIN recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PinMode {
    /// Common, manufacturer-default and 6-digit PINs.
    #[default]
    List,
    /// Every 4-digit PIN, 0000 through 9999.
    Exhaustive,
}

/// Named options shared by every attack module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AttackConfig {
    /// Per-attempt socket/process deadline, seconds.
    pub timeout: u64,
    /// Upper bound on brute-force candidates.
    pub attempts: u32,
    /// Pause between brute-force candidates, milliseconds.
    pub delay: u64,
    pub stealth: bool,
    pub verbose: bool,
    pub packet_size: usize,
    pub packet_count: u32,
    /// Pause between flood frames, milliseconds.
    pub packet_interval: u64,
    pub overflow_size: usize,
    pub extract_contacts: bool,
    pub extract_calendar: bool,
    /// AT command sent by the AT-command module; `None` runs the fixed battery.
    pub default_command: Option<String>,
    pub default_message: String,
    pub payload_type: PayloadType,
    /// Explicit injection payload (overrides `payload_type`).
    pub payload: Option<String>,
    pub pin_mode: PinMode,
    /// Explicit PIN candidates (overrides `pin_mode`).
    pub pins: Option<Vec<String>>,
    pub output_dir: PathBuf,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            timeout: 5,
            attempts: 50,
            delay: 1000,
            stealth: false,
            verbose: false,
            packet_size: 600,
            packet_count: 100,
            packet_interval: 50,
            overflow_size: 2048,
            extract_contacts: true,
            extract_calendar: true,
            default_command: Some("AT+CGSN".to_string()),
            default_message: "Hello from bluefang".to_string(),
            payload_type: PayloadType::default(),
            payload: None,
            pin_mode: PinMode::default(),
            pins: None,
            output_dir: PathBuf::from("extracted_data"),
        }
    }
}

impl AttackConfig {
    /// Build from `key=value` options layered over the defaults.
    pub fn from_options<I, K, V>(options: I) -> BlueResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let config: Self = merge_options(Self::default(), options)?;
        if config.packet_size > MAX_PACKET_SIZE {
            return Err(BlueError::Config(format!(
                "packetSize {} exceeds {}",
                config.packet_size, MAX_PACKET_SIZE
            )));
        }
        if config.overflow_size > MAX_OVERFLOW_SIZE {
            return Err(BlueError::Config(format!(
                "overflowSize {} exceeds {}",
                config.overflow_size, MAX_OVERFLOW_SIZE
            )));
        }
        Ok(config)
    }

    /// Socket/process deadline clamped into the supported window.
    #[must_use]
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout).clamp(MIN_SOCKET_TIMEOUT, MAX_SOCKET_TIMEOUT)
    }

    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    #[inline]
    #[must_use]
    pub fn packet_interval(&self) -> Duration {
        Duration::from_millis(self.packet_interval)
    }
}

/// Capture buffer and filter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub max_packets: usize,
    /// Only packets with one of these tags are emitted; empty = all.
    pub filter_types: Vec<ProtocolTag>,
    pub filter_direction: Option<Direction>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_packets: 10_000,
            filter_types: Vec::new(),
            filter_direction: None,
        }
    }
}

impl CaptureConfig {
    pub fn from_options<I, K, V>(options: I) -> BlueResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let config: Self = merge_options(Self::default(), options)?;
        if config.max_packets == 0 {
            return Err(BlueError::Config("maxPackets must be at least 1".into()));
        }
        Ok(config)
    }
}

/// Scan loop tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Length of one discovery pass.
    pub duration: Duration,
    /// Restart the pass after completion until stopped.
    pub continuous: bool,
    /// Deadline handed to one inquiry call.
    pub inquiry_timeout: Duration,
    /// Pause after an inquiry that produced nothing.
    pub poll_interval: Duration,
    pub fetch_services: bool,
    pub fetch_info: bool,
    pub info_timeout: Duration,
    pub service_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(30),
            continuous: false,
            inquiry_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            fetch_services: true,
            fetch_info: true,
            info_timeout: Duration::from_secs(10),
            service_timeout: Duration::from_secs(15),
        }
    }
}

impl ScanOptions {
    /// Fast preset: names and addresses only.
    #[inline]
    #[must_use]
    pub fn fast() -> Self {
        Self {
            duration: Duration::from_secs(10),
            fetch_services: false,
            fetch_info: false,
            ..Self::default()
        }
    }

    /// Thorough preset: longer pass, longer per-device lookups.
    #[inline]
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            duration: Duration::from_secs(60),
            info_timeout: Duration::from_secs(15),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }
}

fn merge_options<T, I, K, V>(defaults: T, options: I) -> BlueResult<T>
where
    T: Serialize + DeserializeOwned,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut map = match serde_json::to_value(defaults)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in options {
        let key = key.as_ref().trim();
        if !map.contains_key(key) {
            return Err(BlueError::Config(format!("unknown option '{}'", key)));
        }
        let mut rejection = None;
        for candidate in option_candidates(value.as_ref()) {
            map.insert(key.to_string(), candidate);
            match serde_json::from_value::<T>(Value::Object(map.clone())) {
                Ok(_) => {
                    rejection = None;
                    break;
                }
                Err(e) => rejection = Some(e),
            }
        }
        if let Some(e) = rejection {
            return Err(BlueError::Config(format!("invalid value for '{}': {}", key, e)));
        }
    }
    serde_json::from_value(Value::Object(map))
        .map_err(|e| BlueError::Config(format!("invalid option value: {}", e)))
}

/// Readings of a raw option value, tried in order against the field type:
/// JSON, then a bare string, then a comma-separated string list. So
/// `defaultMessage=1234` stays text and `filterTypes=SDP` becomes `["SDP"]`.
fn option_candidates(raw: &str) -> Vec<Value> {
    let raw = raw.trim();
    let mut candidates = Vec::with_capacity(3);
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        candidates.push(v);
    }
    candidates.push(Value::String(raw.to_string()));
    candidates.push(Value::Array(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
    ));
    candidates
}
