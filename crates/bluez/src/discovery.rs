//! Inquiry, device info and service browsing through BlueZ tools.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

use bluefang_common::{BdAddr, BlueError, BlueResult, DeviceInfo, Discovery, ServiceBrowser};

use crate::adapter::adapter_status;
use crate::tool::{args, run_tool};

/// One inquiry unit is 1.28 s.
const INQUIRY_UNIT_SECS: f64 = 1.28;

/// Inquiry length in units that finishes inside `timeout`, leaving one unit
/// of slack for name resolution.
pub fn inquiry_length(timeout: Duration) -> u32 {
    let units = (timeout.as_secs_f64() / INQUIRY_UNIT_SECS).floor() as u32;
    units.saturating_sub(1).clamp(1, 48)
}

/// Scan result lines without the `Scanning ...` banner.
pub fn inquiry_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("Scanning"))
        .map(str::to_owned)
        .collect()
}

/// `hcitool scan` inquiry.
#[derive(Debug, Clone)]
pub struct HcitoolDiscovery {
    adapter: String,
}

impl HcitoolDiscovery {
    pub fn new(adapter: &str) -> Self {
        Self {
            adapter: adapter.to_string(),
        }
    }
}

#[async_trait]
impl Discovery for HcitoolDiscovery {
    #[instrument(skip(self))]
    async fn inquiry(&self, timeout: Duration) -> BlueResult<Vec<String>> {
        let length = format!("--length={}", inquiry_length(timeout));
        let out = run_tool(
            "hcitool",
            &args!["-i", self.adapter, "scan", "--flush", length],
            None,
            timeout,
        )
        .await?;
        if !out.success {
            return Err(BlueError::Connectivity(format!("hcitool scan: {}", out.stderr.trim())));
        }
        let lines = inquiry_lines(&out.stdout);
        debug!(sightings = lines.len(), "Inquiry done");
        Ok(lines)
    }

    async fn adapter_ready(&self) -> BlueResult<bool> {
        Ok(adapter_status(&self.adapter).await?.up)
    }
}

/// `bluetoothctl info` (pairing state, RSSI, icon) merged with
/// `hcitool info` (LMP/HCI versions).
#[derive(Debug, Clone)]
pub struct BluezInfo {
    adapter: String,
}

impl BluezInfo {
    pub fn new(adapter: &str) -> Self {
        Self {
            adapter: adapter.to_string(),
        }
    }
}

#[async_trait]
impl DeviceInfo for BluezInfo {
    async fn info(&self, addr: BdAddr, timeout: Duration) -> BlueResult<String> {
        let addr_arg = addr.to_string();
        let ctl_args = args!["info", addr_arg];
        let hci_args = args!["-i", self.adapter, "info", addr_arg];
        let (ctl, hci) = tokio::join!(
            run_tool("bluetoothctl", &ctl_args, None, timeout),
            run_tool("hcitool", &hci_args, None, timeout),
        );

        let parts: Vec<String> = [ctl, hci]
            .into_iter()
            .filter_map(|res| match res {
                Ok(out) if out.success && !out.stdout.trim().is_empty() => Some(out.stdout),
                Ok(_) => None,
                Err(e) => {
                    debug!(error = %e, "Info tool failed");
                    None
                }
            })
            .collect();
        if parts.is_empty() {
            return Err(BlueError::Connectivity(format!("no device info for {}", addr)));
        }
        Ok(parts.join("\n"))
    }
}

/// `sdptool browse` service records.
#[derive(Debug, Clone, Default)]
pub struct SdptoolBrowser;

impl SdptoolBrowser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceBrowser for SdptoolBrowser {
    async fn browse(&self, addr: BdAddr, timeout: Duration) -> BlueResult<String> {
        let out = run_tool("sdptool", &args!["browse", addr], None, timeout).await?;
        if !out.success || out.stdout.trim().is_empty() {
            return Err(BlueError::Connectivity(format!(
                "sdptool browse {}: {}",
                addr,
                out.stderr.trim()
            )));
        }
        Ok(out.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scan_banner() {
        let out = "Scanning ...\n\tAA:BB:CC:DD:EE:01\tTestPhone\n\n\t11:22:33:44:55:66\tn/a\n";
        assert_eq!(
            inquiry_lines(out),
            vec!["AA:BB:CC:DD:EE:01\tTestPhone".to_string(), "11:22:33:44:55:66\tn/a".to_string()]
        );
        assert!(inquiry_lines("Scanning ...\n").is_empty());
    }

    #[test]
    fn inquiry_fits_deadline() {
        assert_eq!(inquiry_length(Duration::from_secs(10)), 6);
        assert_eq!(inquiry_length(Duration::from_secs(1)), 1);
        assert_eq!(inquiry_length(Duration::from_secs(600)), 48);
    }
}
