//! Version and service markers treated as vulnerability hints.
//!
//! These are substring heuristics over free-text tool output and say
//! nothing authoritative about a device.

pub const VULN_SWEEP_VERSIONS: &[&str] = &["4.0", "4.1", "4.2"];
pub const VULN_SWEEP_SERVICES: &[&str] = &["sdp", "l2cap", "rfcomm"];
pub const WEAK_KEY_VERSIONS: &[&str] = &["4.0", "4.1", "4.2", "5.0"];
pub const WEAK_KEY_MARKERS: &[&str] = &["secure simple pairing", "ssp"];

/// First marker contained in the lower-cased text.
pub fn matches_any<'a>(text: &str, markers: &[&'a str]) -> Option<&'a str> {
    let lower = text.to_lowercase();
    markers.iter().copied().find(|m| lower.contains(m))
}
