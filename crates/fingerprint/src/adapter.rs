//! Local adapter status from `hciconfig` output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static BD_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"BD Address: ([0-9A-Fa-f:]{17})").expect("static regex"));
static DEVICE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"Name: '?([^'\n]+)'?").expect("static regex"));
static INTERFACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(hci\d+):").expect("static regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdapterStatus {
    pub interface: Option<String>,
    pub address: Option<String>,
    pub name: Option<String>,
    pub up: bool,
}

pub fn parse_adapter_status(text: &str) -> AdapterStatus {
    AdapterStatus {
        interface: text
            .lines()
            .find_map(|l| INTERFACE.captures(l).map(|c| c[1].to_string())),
        address: BD_ADDRESS.captures(text).map(|c| c[1].to_uppercase()),
        name: DEVICE_NAME.captures(text).map(|c| c[1].trim().to_string()),
        up: text.contains("UP RUNNING"),
    }
}
