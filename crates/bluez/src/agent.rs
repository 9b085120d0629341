//! Pairing through a scripted `bluetoothctl` session.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use bluefang_common::{BlueResult, PairingAgent};

use crate::tool::run_tool;

#[derive(Debug, Clone, Default)]
pub struct BluetoothctlAgent;

impl BluetoothctlAgent {
    pub fn new() -> Self {
        Self
    }
}

/// One command per line, newline-terminated.
pub fn script(commands: &[String]) -> String {
    commands.iter().fold(String::new(), |mut acc, c| {
        acc.push_str(c);
        acc.push('\n');
        acc
    })
}

#[async_trait]
impl PairingAgent for BluetoothctlAgent {
    async fn run(&self, commands: &[String], timeout: Duration) -> BlueResult<String> {
        debug!(commands = commands.len(), "Driving bluetoothctl");
        let out = run_tool("bluetoothctl", &[], Some(&script(commands)), timeout).await?;
        // The verdict is in the text; the exit status says nothing useful.
        Ok(out.combined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_line_per_command() {
        let cmds = vec!["pair AA:BB:CC:DD:EE:01".to_string(), "0000".to_string()];
        assert_eq!(script(&cmds), "pair AA:BB:CC:DD:EE:01\n0000\n");
        assert_eq!(script(&[]), "");
    }
}
