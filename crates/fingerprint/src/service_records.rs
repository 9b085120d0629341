//! Service-record text from the service browser.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static CHANNEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^Channel:\s*(\d+)").expect("static regex"));
static PSM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^PSM:\s*(\d+)").expect("static regex"));
static PROTOCOL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^"([^"]+)"\s*\(0x[0-9a-fA-F]+\)"#).expect("static regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    pub name: String,
    pub rfcomm_channel: Option<u8>,
    pub psm: Option<u16>,
    /// Quoted class and protocol names, e.g. `OBEX Object Push`, `RFCOMM`.
    pub descriptors: Vec<String>,
}

/// Names from every `Service Name:` line, in order.
pub fn parse_service_names(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("service name")
                .then(|| value.trim().to_string())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Split browse output into records, one per `Service Name:` line.
pub fn parse_service_records(text: &str) -> Vec<ServiceRecord> {
    let mut records: Vec<ServiceRecord> = Vec::new();
    for line in text.lines().map(str::trim) {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("service name") {
                records.push(ServiceRecord {
                    name: value.trim().to_string(),
                    ..ServiceRecord::default()
                });
                continue;
            }
        }
        let Some(current) = records.last_mut() else {
            continue;
        };
        if let Some(caps) = CHANNEL.captures(line) {
            current.rfcomm_channel = caps[1].parse().ok();
        } else if let Some(caps) = PSM.captures(line) {
            current.psm = caps[1].parse().ok();
        } else if let Some(caps) = PROTOCOL.captures(line) {
            current.descriptors.push(caps[1].to_string());
        }
    }
    records
}

/// RFCOMM channel of the first record whose name or descriptors mention `needle`.
pub fn channel_for_service(records: &[ServiceRecord], needle: &str) -> Option<u8> {
    let needle = needle.to_lowercase();
    records
        .iter()
        .filter(|r| {
            r.name.to_lowercase().contains(&needle)
                || r.descriptors.iter().any(|d| d.to_lowercase().contains(&needle))
        })
        .find_map(|r| r.rfcomm_channel)
}
