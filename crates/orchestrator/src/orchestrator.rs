//! Orchestrator - single-flight coordination of scan and attack workers

use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use bluefang_attacks::{module_for, AttackContext, AttackLog};
use bluefang_common::{
    AttackConfig, AttackKind, AttackOutcome, AttackStatus, BdAddr, BlueError, BlueResult,
    CancelToken, LogEvent, ScanEvent, ScanOptions, Toolkit,
};
use bluefang_scanner::{DeviceRegistry, ScanSummary, Scanner};

use crate::session::{ActivityState, DoneGuard};

/// Receiving ends of the orchestrator's event channels, one per event kind.
/// Each channel is FIFO per producing worker.
#[derive(Debug)]
pub struct EventStreams {
    pub scan: UnboundedReceiver<ScanEvent>,
    pub logs: UnboundedReceiver<LogEvent>,
    pub outcomes: UnboundedReceiver<AttackOutcome>,
}

/// The one live worker, if any.
struct Activity {
    cancel: CancelToken,
    done: watch::Receiver<bool>,
}

impl Activity {
    fn is_live(&self) -> bool {
        !*self.done.borrow()
    }
}

/// Owns the session state. At most one scan or attack runs at a time;
/// `start_*` while one is live fails with `Busy` and changes nothing.
pub struct Orchestrator {
    toolkit: Toolkit,
    scanner: Scanner,
    slot: Mutex<Option<Activity>>,
    state: Arc<watch::Sender<ActivityState>>,
    last: Arc<watch::Sender<Option<AttackOutcome>>>,
    scan_fault: Arc<watch::Sender<Option<String>>>,
    scan_tx: UnboundedSender<ScanEvent>,
    log_tx: UnboundedSender<LogEvent>,
    outcome_tx: UnboundedSender<AttackOutcome>,
}

impl Orchestrator {
    pub fn new(toolkit: Toolkit, registry: Arc<DeviceRegistry>) -> (Self, EventStreams) {
        let (scan_tx, scan) = unbounded_channel();
        let (log_tx, logs) = unbounded_channel();
        let (outcome_tx, outcomes) = unbounded_channel();
        let (state, _) = watch::channel(ActivityState::Idle);
        let (last, _) = watch::channel(None);
        let (scan_fault, _) = watch::channel(None);
        let orch = Self {
            scanner: Scanner::new(&toolkit, registry),
            toolkit,
            slot: Mutex::new(None),
            state: Arc::new(state),
            last: Arc::new(last),
            scan_fault: Arc::new(scan_fault),
            scan_tx,
            log_tx,
            outcome_tx,
        };
        (orch, EventStreams { scan, logs, outcomes })
    }

    #[inline]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        self.scanner.registry()
    }

    /// Counters of the current or most recent scan.
    pub fn scan_stats(&self) -> ScanSummary {
        self.scanner.stats()
    }

    /// Why the most recent scan ended early; `None` when it finished
    /// normally, was stopped, or is still running.
    pub fn scan_fault(&self) -> Option<String> {
        self.scan_fault.borrow().clone()
    }

    pub fn state(&self) -> ActivityState {
        self.state.borrow().clone()
    }

    /// Watch every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ActivityState> {
        self.state.subscribe()
    }

    /// `Running` while an attack is live, otherwise the last session's
    /// final status (`Idle` before any attack).
    pub fn attack_status(&self) -> AttackStatus {
        let last = self.last.borrow().as_ref().map(|o| o.status);
        self.state.borrow().attack_status(last)
    }

    pub fn last_outcome(&self) -> Option<AttackOutcome> {
        self.last.borrow().clone()
    }

    pub async fn is_busy(&self) -> bool {
        self.slot.lock().await.as_ref().is_some_and(Activity::is_live)
    }

    fn ensure_idle(&self, slot: &Option<Activity>) -> BlueResult<()> {
        if !slot.as_ref().is_some_and(Activity::is_live) {
            return Ok(());
        }
        let what = match &*self.state.borrow() {
            ActivityState::Attacking { kind, target, .. } => {
                format!("{} against {} in progress", kind.classic_name(), target)
            }
            _ => "scan in progress".to_string(),
        };
        warn!("Rejected start: {}", what);
        Err(BlueError::Busy(what))
    }

    /// Launch a discovery run on a background worker.
    #[instrument(skip(self, options))]
    pub async fn start_scan(&self, options: ScanOptions) -> BlueResult<()> {
        let mut slot = self.slot.lock().await;
        self.ensure_idle(&slot)?;

        let cancel = CancelToken::new();
        let handle = self
            .scanner
            .start(options, cancel.clone(), self.scan_tx.clone())?;
        let (done_tx, done) = watch::channel(false);
        self.scan_fault.send_replace(None);
        self.state.send_replace(ActivityState::Scanning);

        let state = self.state.clone();
        let scan_fault = self.scan_fault.clone();
        tokio::spawn(async move {
            let _done = DoneGuard(done_tx);
            let fault = match handle.await {
                Ok(Ok(())) => {
                    info!("Scan finished");
                    None
                }
                Ok(Err(e)) if e.is_cancellation() => {
                    info!("Scan stopped");
                    None
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Scan failed");
                    Some(e.to_string())
                }
                Err(e) => {
                    error!(error = %e, "Scan worker aborted");
                    Some(format!("worker aborted: {}", e))
                }
            };
            scan_fault.send_replace(fault);
            state.send_replace(ActivityState::Idle);
        });

        *slot = Some(Activity { cancel, done });
        info!("Scan started");
        Ok(())
    }

    /// Launch `kind` against `target` on a background worker. Returns the
    /// new session id.
    #[instrument(skip(self, config))]
    pub async fn start_attack(
        &self,
        kind: AttackKind,
        target: BdAddr,
        config: AttackConfig,
    ) -> BlueResult<Uuid> {
        let mut slot = self.slot.lock().await;
        self.ensure_idle(&slot)?;

        let session = Uuid::new_v4();
        let cancel = CancelToken::new();
        let log = AttackLog::new(session, kind)
            .with_sink(self.log_tx.clone())
            .with_stealth(config.stealth)
            .with_verbose(config.verbose);
        let worker = AttackWorker {
            kind,
            target,
            ctx: AttackContext::new(self.toolkit.clone(), config, cancel.clone(), log),
            state: self.state.clone(),
            last: self.last.clone(),
            outcomes: self.outcome_tx.clone(),
        };
        let (done_tx, done) = watch::channel(false);
        self.state
            .send_replace(ActivityState::Attacking { session, kind, target });

        tokio::spawn(async move {
            let _done = DoneGuard(done_tx);
            worker.run().await;
        });

        *slot = Some(Activity { cancel, done });
        info!(%session, "Attack started");
        Ok(session)
    }

    /// Ask the live worker to stop. False when nothing was running.
    pub async fn stop(&self) -> bool {
        let slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(activity) if activity.is_live() => {
                activity.cancel.cancel();
                info!("Stop requested");
                true
            }
            _ => false,
        }
    }

    /// Resolves once the live worker, if any, has finished.
    pub async fn wait(&self) {
        let done = self.slot.lock().await.as_ref().map(|a| a.done.clone());
        if let Some(mut done) = done {
            let _ = done.wait_for(|finished| *finished).await;
        }
    }
}

struct AttackWorker {
    kind: AttackKind,
    target: BdAddr,
    ctx: AttackContext,
    state: Arc<watch::Sender<ActivityState>>,
    last: Arc<watch::Sender<Option<AttackOutcome>>>,
    outcomes: UnboundedSender<AttackOutcome>,
}

impl AttackWorker {
    async fn run(self) {
        let started = Instant::now();
        let (kind, target) = (self.kind, self.target);

        // Own task so a panicking module surfaces as a JoinError.
        let module_ctx = self.ctx.clone();
        let joined = tokio::spawn(async move {
            let mut module = module_for(kind);
            module.execute(target, &module_ctx).await
        })
        .await;

        let (status, fault) = settle(joined, &self.ctx.cancel);
        match (&status, &fault) {
            (_, Some(fault)) => self
                .ctx
                .log
                .error(format!("{} aborted: {}", kind.classic_name(), fault)),
            (AttackStatus::Stopped, None) => self
                .ctx
                .log
                .warning(format!("{} stopped by request", kind.classic_name())),
            _ => {}
        }

        let outcome = AttackOutcome {
            session: self.ctx.log.session(),
            kind,
            target,
            status,
            elapsed: started.elapsed(),
            fault,
        };
        info!(
            session = %outcome.session,
            attack = %kind,
            status = ?outcome.status,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Attack finished"
        );
        self.last.send_replace(Some(outcome.clone()));
        let _ = self.outcomes.send(outcome);
        self.state.send_replace(ActivityState::Idle);
    }
}

/// Map the worker's result to a final status plus fault text.
fn settle(
    joined: Result<BlueResult<bool>, JoinError>,
    cancel: &CancelToken,
) -> (AttackStatus, Option<String>) {
    match joined {
        Ok(Ok(true)) => (AttackStatus::Succeeded, None),
        Ok(Ok(false)) if cancel.is_cancelled() => (AttackStatus::Stopped, None),
        Ok(Ok(false)) => (AttackStatus::Failed, None),
        Ok(Err(e)) if e.is_cancellation() => (AttackStatus::Stopped, None),
        Ok(Err(e)) => (AttackStatus::Failed, Some(e.to_string())),
        Err(e) => (AttackStatus::Failed, Some(format!("worker aborted: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    use bluefang_common::{
        BtSocket, DeviceInfo, Discovery, HciControl, PairingAgent, ServiceBrowser,
        SocketConnector, TraceProvider, TraceSource, Transport,
    };

    /// Emits its lines on the first inquiry, nothing afterwards.
    struct OnceDiscovery(std::sync::Mutex<Vec<String>>);

    #[async_trait]
    impl Discovery for OnceDiscovery {
        async fn inquiry(&self, _timeout: Duration) -> BlueResult<Vec<String>> {
            Ok(std::mem::take(&mut *self.0.lock().unwrap()))
        }
    }

    struct FixedText(&'static str);

    #[async_trait]
    impl DeviceInfo for FixedText {
        async fn info(&self, _addr: BdAddr, _timeout: Duration) -> BlueResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[async_trait]
    impl ServiceBrowser for FixedText {
        async fn browse(&self, _addr: BdAddr, _timeout: Duration) -> BlueResult<String> {
            Ok(self.0.to_string())
        }
    }

    /// Rejects the first PIN, then hangs on the second until cancelled.
    #[derive(Default)]
    struct StallingAgent {
        attempts: AtomicUsize,
        stalled: Notify,
    }

    #[async_trait]
    impl PairingAgent for StallingAgent {
        async fn run(&self, _commands: &[String], _timeout: Duration) -> BlueResult<String> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= 2 {
                self.stalled.notify_one();
                std::future::pending::<()>().await;
            }
            Ok("Failed to pair: org.bluez.Error.AuthenticationFailed".into())
        }
    }

    struct Unplugged;

    #[async_trait]
    impl HciControl for Unplugged {
        async fn command(&self, _frame: &[u8], _timeout: Duration) -> BlueResult<String> {
            Err(BlueError::Resource("no adapter".into()))
        }
    }

    #[async_trait]
    impl SocketConnector for Unplugged {
        async fn connect(
            &self,
            addr: BdAddr,
            transport: Transport,
            channel: u16,
            _timeout: Duration,
        ) -> BlueResult<Box<dyn BtSocket>> {
            Err(BlueError::Connectivity(format!(
                "{} {} on {} refused",
                transport, channel, addr
            )))
        }
    }

    #[async_trait]
    impl TraceProvider for Unplugged {
        async fn open(&self) -> BlueResult<Box<dyn TraceSource>> {
            Err(BlueError::Resource("no trace tool".into()))
        }
    }

    fn toolkit(agent: Arc<StallingAgent>) -> Toolkit {
        Toolkit {
            discovery: Arc::new(OnceDiscovery(std::sync::Mutex::new(vec![
                "AA:BB:CC:DD:EE:01 TestPhone".to_string(),
            ]))),
            device_info: Arc::new(FixedText("Name: TestPhone\nPairable: yes\n")),
            services: Arc::new(FixedText("")),
            agent,
            hci: Arc::new(Unplugged),
            sockets: Arc::new(Unplugged),
            traces: Arc::new(Unplugged),
        }
    }

    fn target() -> BdAddr {
        "AA:BB:CC:DD:EE:01".parse().unwrap()
    }

    fn pin_config() -> AttackConfig {
        AttackConfig {
            delay: 0,
            pins: Some((0..20).map(|n| format!("{:04}", 1000 + n)).collect()),
            ..AttackConfig::default()
        }
    }

    #[tokio::test]
    async fn stop_mid_pin_sweep_is_stopped() {
        let agent = Arc::new(StallingAgent::default());
        let (orch, mut events) = Orchestrator::new(toolkit(agent.clone()), Arc::new(DeviceRegistry::new()));

        let session = orch
            .start_attack(AttackKind::PinRecovery, target(), pin_config())
            .await
            .unwrap();
        assert_eq!(orch.attack_status(), AttackStatus::Running);

        agent.stalled.notified().await;
        assert!(orch.stop().await);
        orch.wait().await;

        let outcome = events.outcomes.recv().await.unwrap();
        assert_eq!(outcome.session, session);
        assert_eq!(outcome.status, AttackStatus::Stopped);
        assert!(outcome.fault.is_none());
        assert_eq!(agent.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(orch.attack_status(), AttackStatus::Stopped);
        assert!(orch.state().is_idle());
        assert!(!orch.stop().await);

        let mut saw_start = false;
        while let Ok(event) = events.logs.try_recv() {
            assert_eq!(event.session, session);
            saw_start |= event.message.starts_with("Starting");
        }
        assert!(saw_start);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let agent = Arc::new(StallingAgent::default());
        let (orch, _events) = Orchestrator::new(toolkit(agent.clone()), Arc::new(DeviceRegistry::new()));

        let session = orch
            .start_attack(AttackKind::PinRecovery, target(), pin_config())
            .await
            .unwrap();
        agent.stalled.notified().await;
        let before = orch.state();

        let err = orch
            .start_attack(AttackKind::Flood, target(), AttackConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BlueError::Busy(_)));
        let err = orch.start_scan(ScanOptions::default()).await.unwrap_err();
        assert!(matches!(err, BlueError::Busy(_)));

        assert_eq!(orch.state(), before);
        assert!(matches!(before, ActivityState::Attacking { session: s, .. } if s == session));
        assert_eq!(orch.attack_status(), AttackStatus::Running);
        assert_eq!(orch.scan_stats().passes, 0);

        orch.stop().await;
        orch.wait().await;
        assert!(!orch.is_busy().await);
    }

    #[tokio::test(start_paused = true)]
    async fn scan_blocks_attacks_until_done() {
        let agent = Arc::new(StallingAgent::default());
        let (orch, mut events) = Orchestrator::new(toolkit(agent), Arc::new(DeviceRegistry::new()));

        let options = ScanOptions {
            duration: Duration::from_secs(5),
            fetch_info: false,
            fetch_services: false,
            ..ScanOptions::default()
        };
        orch.start_scan(options).await.unwrap();
        assert_eq!(orch.state(), ActivityState::Scanning);

        let err = orch
            .start_attack(AttackKind::Flood, target(), AttackConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BlueError::Busy(_)));

        orch.wait().await;
        assert!(orch.state().is_idle());

        let mut found = Vec::new();
        let mut complete = None;
        while let Ok(event) = events.scan.try_recv() {
            match event {
                ScanEvent::DeviceFound(d) => found.push(d),
                ScanEvent::ScanComplete(all) => complete = Some(all),
            }
        }
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "TestPhone");
        assert_eq!(complete.map(|all| all.len()), Some(1));
        assert_eq!(orch.registry().len(), 1);

        let stats = orch.scan_stats();
        assert!(stats.passes >= 1);
        assert_eq!(stats.new_devices, 1);
        assert!(orch.scan_fault().is_none());
    }

    struct NoAdapter;

    #[async_trait]
    impl Discovery for NoAdapter {
        async fn inquiry(&self, _timeout: Duration) -> BlueResult<Vec<String>> {
            Err(BlueError::Resource("hcitool not installed".into()))
        }
    }

    #[tokio::test]
    async fn failed_scan_records_fault() {
        let agent = Arc::new(StallingAgent::default());
        let mut kit = toolkit(agent);
        kit.discovery = Arc::new(NoAdapter);
        let (orch, _events) = Orchestrator::new(kit, Arc::new(DeviceRegistry::new()));

        orch.start_scan(ScanOptions::default()).await.unwrap();
        orch.wait().await;

        assert!(orch.state().is_idle());
        let fault = orch.scan_fault().unwrap();
        assert!(fault.contains("hcitool not installed"));
    }

    #[tokio::test]
    async fn refused_flood_is_failed_without_fault() {
        let agent = Arc::new(StallingAgent::default());
        let (orch, mut events) = Orchestrator::new(toolkit(agent), Arc::new(DeviceRegistry::new()));

        orch.start_attack(AttackKind::Flood, target(), AttackConfig::default())
            .await
            .unwrap();
        orch.wait().await;

        let outcome = events.outcomes.recv().await.unwrap();
        assert_eq!(outcome.status, AttackStatus::Failed);
        assert!(outcome.fault.is_none());
        assert_eq!(orch.last_outcome(), Some(outcome));
    }

    #[tokio::test]
    async fn settle_maps_results() {
        let cancel = CancelToken::new();
        assert_eq!(settle(Ok(Ok(true)), &cancel).0, AttackStatus::Succeeded);
        assert_eq!(settle(Ok(Ok(false)), &cancel).0, AttackStatus::Failed);
        assert_eq!(
            settle(Ok(Err(BlueError::Cancelled)), &cancel).0,
            AttackStatus::Stopped
        );

        let (status, fault) = settle(Ok(Err(BlueError::Resource("hcitool missing".into()))), &cancel);
        assert_eq!(status, AttackStatus::Failed);
        assert!(fault.unwrap().contains("hcitool missing"));

        let panicked: Result<BlueResult<bool>, JoinError> = tokio::spawn(async {
            if true {
                panic!("boom");
            }
            Ok(true)
        })
        .await;
        let (status, fault) = settle(panicked, &cancel);
        assert_eq!(status, AttackStatus::Failed);
        assert!(fault.is_some());

        cancel.cancel();
        assert_eq!(settle(Ok(Ok(false)), &cancel).0, AttackStatus::Stopped);
    }
}
