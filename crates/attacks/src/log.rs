//! Per-session attack log.
//!
//! Every event goes to the session channel, when one is attached, and is
//! mirrored to `tracing`.

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use bluefang_common::{AttackKind, LogEvent, LogLevel};

#[derive(Debug, Clone)]
pub struct AttackLog {
    session: Uuid,
    kind: AttackKind,
    sink: Option<UnboundedSender<LogEvent>>,
    stealth: bool,
    verbose: bool,
}

impl AttackLog {
    pub fn new(session: Uuid, kind: AttackKind) -> Self {
        Self {
            session,
            kind,
            sink: None,
            stealth: false,
            verbose: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_sink(mut self, sink: UnboundedSender<LogEvent>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Stealth drops info-level events from the channel.
    #[inline]
    #[must_use]
    pub fn with_stealth(mut self, stealth: bool) -> Self {
        self.stealth = stealth;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[inline]
    pub fn session(&self) -> Uuid {
        self.session
    }

    #[inline]
    pub fn kind(&self) -> AttackKind {
        self.kind
    }

    pub fn emit(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info | LogLevel::Success => {
                info!(session = %self.session, attack = %self.kind, severity = %level, "{}", message)
            }
            LogLevel::Warning => {
                warn!(session = %self.session, attack = %self.kind, "{}", message)
            }
            LogLevel::Error => {
                error!(session = %self.session, attack = %self.kind, "{}", message)
            }
        }

        if self.stealth && level == LogLevel::Info {
            return;
        }
        if let Some(sink) = &self.sink {
            let _ = sink.send(LogEvent {
                session: self.session,
                level,
                message,
                timestamp: Utc::now(),
            });
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(LogLevel::Success, message);
    }

    /// Per-candidate chatter, only forwarded when verbose.
    pub fn detail(&self, message: impl Into<String>) {
        if self.verbose {
            self.emit(LogLevel::Info, message);
        } else {
            debug!(session = %self.session, attack = %self.kind, "{}", message.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<LogEvent>) -> Vec<LogEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn events_carry_session_and_level() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Uuid::new_v4();
        let log = AttackLog::new(session, AttackKind::Flood).with_sink(tx);
        log.info("starting");
        log.success("done");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.session == session));
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(events[1].level, LogLevel::Success);
        assert_eq!(events[1].message, "done");
    }

    #[test]
    fn stealth_hides_info_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let log = AttackLog::new(Uuid::new_v4(), AttackKind::Inject)
            .with_sink(tx)
            .with_stealth(true);
        log.info("quiet");
        log.warning("loud");
        log.error("louder");

        let levels: Vec<_> = drain(&mut rx).into_iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warning, LogLevel::Error]);
    }

    #[test]
    fn detail_requires_verbose() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let quiet = AttackLog::new(Uuid::new_v4(), AttackKind::AtCommand).with_sink(tx.clone());
        quiet.detail("channel 3 refused");
        assert!(drain(&mut rx).is_empty());

        let chatty = quiet.with_sink(tx).with_verbose(true);
        chatty.detail("channel 4 refused");
        assert_eq!(drain(&mut rx).len(), 1);
    }
}
