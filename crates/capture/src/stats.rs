//! Capture counters.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct CaptureStats {
    lines: AtomicU64,
    skipped: AtomicU64,
    buffered: AtomicU64,
    evicted: AtomicU64,
    emitted: AtomicU64,
    filtered: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Lines read from the trace.
    pub lines: u64,
    /// Blank lines.
    pub skipped: u64,
    pub buffered: u64,
    pub evicted: u64,
    /// Packets forwarded to observers.
    pub emitted: u64,
    /// Packets held back by the filter.
    pub filtered: u64,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn line(&self) {
        self.lines.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn buffer(&self, evicted: bool) {
        self.buffered.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn emit(&self, passed: bool) {
        let counter = if passed { &self.emitted } else { &self.filtered };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CaptureSummary {
        CaptureSummary {
            lines: self.lines.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            buffered: self.buffered.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            lines = s.lines,
            buffered = s.buffered,
            evicted = s.evicted,
            emitted = s.emitted,
            filtered = s.filtered,
            "Capture summary"
        );
    }
}
