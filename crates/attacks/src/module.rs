//! The three-phase attack contract.

use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

use bluefang_common::{AttackConfig, AttackKind, BdAddr, BlueResult, CancelToken, Toolkit};

use crate::log::AttackLog;

/// Everything a module needs for one run: collaborators, options, the stop
/// flag and the session log.
#[derive(Debug, Clone)]
pub struct AttackContext {
    pub toolkit: Toolkit,
    pub config: AttackConfig,
    pub cancel: CancelToken,
    pub log: AttackLog,
}

impl AttackContext {
    pub fn new(toolkit: Toolkit, config: AttackConfig, cancel: CancelToken, log: AttackLog) -> Self {
        Self {
            toolkit,
            config,
            cancel,
            log,
        }
    }

    /// Deadline for one socket operation or tool invocation.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.config.socket_timeout()
    }
}

/// One attack technique.
///
/// Phases return `Ok(false)` for a negative result (not vulnerable, every
/// candidate refused, no confirmation). `Err` is reserved for cancellation
/// and for faults the module cannot recover from, such as a missing tool.
/// Modules keep whatever they learn in one phase (an open channel, a
/// discovered service) in `self` for the next.
#[async_trait]
pub trait AttackModule: Send {
    fn kind(&self) -> AttackKind;

    async fn check_vulnerability(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool>;

    async fn exploit(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool>;

    async fn run_payload(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool>;

    /// Run check, exploit and payload in order, stopping at the first `false`.
    #[instrument(skip(self, ctx))]
    async fn execute(&mut self, target: BdAddr, ctx: &AttackContext) -> BlueResult<bool> {
        let name = self.kind().classic_name();
        ctx.log.info(format!("Starting {} against {}", name, target));

        ctx.cancel.check()?;
        if !self.check_vulnerability(target, ctx).await? {
            ctx.log.warning(format!("{} does not appear vulnerable to {}", target, name));
            return Ok(false);
        }
        ctx.log.info("Target looks vulnerable, running exploit phase");

        ctx.cancel.check()?;
        if !self.exploit(target, ctx).await? {
            ctx.log.error(format!("{} exploit phase failed", name));
            return Ok(false);
        }

        ctx.cancel.check()?;
        if !self.run_payload(target, ctx).await? {
            ctx.log.warning(format!("{} payload phase did not confirm", name));
            return Ok(false);
        }

        ctx.log.success(format!("{} succeeded against {}", name, target));
        Ok(true)
    }
}
