//! What the orchestrator is doing right now.

use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use bluefang_common::{AttackKind, AttackStatus, BdAddr};

/// Published on the orchestrator's state channel on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ActivityState {
    Idle,
    Scanning,
    Attacking {
        session: Uuid,
        kind: AttackKind,
        target: BdAddr,
    },
}

impl ActivityState {
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, ActivityState::Idle)
    }

    /// Attack status as seen from outside: `Running` while attacking.
    pub fn attack_status(&self, last: Option<AttackStatus>) -> AttackStatus {
        match self {
            ActivityState::Attacking { .. } => AttackStatus::Running,
            _ => last.unwrap_or(AttackStatus::Idle),
        }
    }
}

/// Flips the worker's done flag when dropped, including on panic.
pub(crate) struct DoneGuard(pub(crate) watch::Sender<bool>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}
