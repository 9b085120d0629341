//! Raw HCI commands via `hcitool cmd`.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

use bluefang_codec::hci::decode_command;
use bluefang_common::{BlueError, BlueResult, HciControl};

use crate::tool::{args, run_tool};

#[derive(Debug, Clone)]
pub struct HcitoolControl {
    adapter: String,
}

impl HcitoolControl {
    pub fn new(adapter: &str) -> Self {
        Self {
            adapter: adapter.to_string(),
        }
    }
}

/// `hcitool` arguments for an encoded command packet.
pub fn command_args(adapter: &str, frame: &[u8]) -> BlueResult<Vec<String>> {
    let cmd = decode_command(frame)?;
    let mut out = args![
        "-i",
        adapter,
        "cmd",
        format!("0x{:02x}", cmd.ogf),
        format!("0x{:04x}", cmd.ocf),
    ];
    out.extend(cmd.params.iter().map(|b| format!("{:02x}", b)));
    Ok(out)
}

#[async_trait]
impl HciControl for HcitoolControl {
    #[instrument(skip(self, frame), fields(len = frame.len()))]
    async fn command(&self, frame: &[u8], timeout: Duration) -> BlueResult<String> {
        let out = run_tool("hcitool", &command_args(&self.adapter, frame)?, None, timeout).await?;
        if !out.success {
            return Err(BlueError::Protocol(format!(
                "controller rejected command: {}",
                out.stderr.trim()
            )));
        }
        debug!("Controller accepted command");
        Ok(out.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluefang_codec::hci::key_size_request;

    #[test]
    fn vendor_key_size_args() {
        let args = command_args("hci1", &key_size_request(1)).unwrap();
        assert_eq!(args, vec!["-i", "hci1", "cmd", "0x3f", "0x0001", "01"]);
    }

    #[test]
    fn garbage_frame_is_rejected() {
        assert!(command_args("hci0", &[0x02, 0x00]).is_err());
    }
}
