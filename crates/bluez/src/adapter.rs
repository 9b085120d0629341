//! Local adapter state from `hciconfig`.

use std::time::Duration;
use tracing::debug;

use bluefang_common::{BlueError, BlueResult};
use bluefang_fingerprint::{parse_adapter_status, AdapterStatus};

use crate::tool::{args, run_tool};

const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// `Resource` error when the adapter does not exist or the tool is missing.
pub async fn adapter_status(adapter: &str) -> BlueResult<AdapterStatus> {
    let out = run_tool("hciconfig", &args![adapter], None, STATUS_TIMEOUT).await?;
    if !out.success {
        return Err(BlueError::Resource(format!(
            "adapter {} unavailable: {}",
            adapter,
            out.stderr.trim()
        )));
    }
    let status = parse_adapter_status(&out.stdout);
    debug!(adapter, up = status.up, address = ?status.address, "Adapter status");
    Ok(status)
}
