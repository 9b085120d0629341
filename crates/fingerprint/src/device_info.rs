//! Device-info text (`Key: value` lines from the info provider).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static VERSION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:LMP|HCI|Bluetooth)?\s*Version:\s*(.+)$").expect("static regex"));

/// Attributes recovered from one info block. Missing keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceAttributes {
    pub name: Option<String>,
    pub rssi: Option<i16>,
    pub paired: bool,
    pub trusted: bool,
    pub connected: bool,
    pub icon: Option<String>,
    pub discoverable: bool,
    pub pairable: bool,
    /// Raw version strings (`LMP Version: 4.2 (0x8)` → `4.2 (0x8)`).
    pub versions: Vec<String>,
}

fn yes(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

pub fn parse_device_info(text: &str) -> DeviceAttributes {
    let mut attrs = DeviceAttributes::default();
    let lower = text.to_lowercase();
    attrs.discoverable = lower.contains("discoverable");
    attrs.pairable = lower.contains("pairable");

    for line in text.lines().map(str::trim) {
        if let Some(caps) = VERSION_LINE.captures(line) {
            attrs.versions.push(caps[1].trim().to_string());
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "name" | "device name" if !value.is_empty() => attrs.name = Some(value.to_string()),
            "rssi" => {
                attrs.rssi = value
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse::<i16>().ok())
            }
            "paired" => attrs.paired = yes(value),
            "trusted" => attrs.trusted = yes(value),
            "connected" => attrs.connected = yes(value),
            "icon" if !value.is_empty() => attrs.icon = Some(value.to_string()),
            _ => {}
        }
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: &str = "Device AA:BB:CC:DD:EE:01 (public)
\tName: TestPhone
\tIcon: phone
\tPaired: yes
\tTrusted: no
\tConnected: Yes
\tRSSI: -61
\tLMP Version: 4.2 (0x8) LMP Subversion: 0x1
";

    #[test]
    fn parses_known_keys() {
        let a = parse_device_info(INFO);
        assert_eq!(a.name.as_deref(), Some("TestPhone"));
        assert_eq!(a.icon.as_deref(), Some("phone"));
        assert_eq!(a.rssi, Some(-61));
        assert!(a.paired && a.connected && !a.trusted);
        assert_eq!(a.versions.len(), 1);
        assert!(a.versions[0].starts_with("4.2"));
    }

    #[test]
    fn flags_default_to_false() {
        let a = parse_device_info("garbage\nRSSI: n/a\n");
        assert_eq!(a, DeviceAttributes::default());
    }

    #[test]
    fn detects_pairing_mode_words() {
        let a = parse_device_info("Discoverable: yes\nPairable: yes");
        assert!(a.discoverable && a.pairable);
    }
}
