//! External tool invocation with a hard deadline.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use bluefang_common::{BlueError, BlueResult};

/// Captured result of one tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Run `program` to completion, feeding `stdin` when given. The child is
/// killed if `timeout` elapses first. A missing binary is a `Resource`
/// error, a timeout is a `Connectivity` error; a non-zero exit is reported
/// through [`ToolOutput::success`].
pub async fn run_tool(
    program: &str,
    args: &[String],
    stdin: Option<&str>,
    timeout: Duration,
) -> BlueResult<ToolOutput> {
    debug!(program, ?args, "Running tool");
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| BlueError::from_socket(&format!("spawn {}", program), e))?;

    let input = stdin.map(str::to_owned);
    let pipe = child.stdin.take();
    let finished = async move {
        if let (Some(input), Some(mut pipe)) = (input, pipe) {
            // The tool may exit before reading everything.
            let _ = pipe.write_all(input.as_bytes()).await;
        }
        child.wait_with_output().await
    };

    let output = tokio::time::timeout(timeout, finished)
        .await
        .map_err(|_| BlueError::Connectivity(format!("{} timed out after {:?}", program, timeout)))?
        .map_err(|e| BlueError::from_socket(program, e))?;

    Ok(ToolOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// `args!["-i", adapter]` style owned argument lists.
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($arg.to_string()),*]
    };
}
pub(crate) use args;

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_status() {
        let out = run_tool("sh", &args!["-c", "echo hello; echo oops >&2; exit 3"], None, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(out.combined().contains("oops"));
    }

    #[tokio::test]
    async fn feeds_stdin() {
        let out = run_tool("cat", &[], Some("scan on\nquit\n"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.stdout, "scan on\nquit\n");
    }

    #[tokio::test]
    async fn missing_binary_is_resource_error() {
        let err = run_tool("bluefang-no-such-tool", &[], None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BlueError::Resource(_)));
    }

    #[tokio::test]
    async fn deadline_kills_the_tool() {
        let err = run_tool("sleep", &args!["5"], None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, BlueError::Connectivity(_)));
    }
}
