//! Live link trace from `btmon`.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::info;

use bluefang_common::{BlueError, BlueResult, TraceProvider, TraceSource};

#[derive(Debug, Clone)]
pub struct BtmonTraces {
    adapter: String,
}

impl BtmonTraces {
    pub fn new(adapter: &str) -> Self {
        Self {
            adapter: adapter.to_string(),
        }
    }
}

/// Killed when dropped.
struct BtmonSource {
    _child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl TraceSource for BtmonSource {
    async fn next_line(&mut self) -> BlueResult<Option<String>> {
        self.lines
            .next_line()
            .await
            .map_err(|e| BlueError::from_socket("btmon read", e))
    }
}

#[async_trait]
impl TraceProvider for BtmonTraces {
    async fn open(&self) -> BlueResult<Box<dyn TraceSource>> {
        let mut child = Command::new("btmon")
            .args(["-i", self.adapter.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BlueError::from_socket("spawn btmon", e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BlueError::Resource("btmon stdout unavailable".into()))?;
        info!(adapter = %self.adapter, "btmon started");
        Ok(Box::new(BtmonSource {
            _child: child,
            lines: BufReader::new(stdout).lines(),
        }))
    }
}
