//! Scan progress counters

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct ScanStats {
    passes: AtomicUsize,
    sightings: AtomicUsize,
    new_devices: AtomicUsize,
    updated_devices: AtomicUsize,
    failed_lookups: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub passes: usize,
    pub sightings: usize,
    pub new_devices: usize,
    pub updated_devices: usize,
    pub failed_lookups: usize,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_passes(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_sightings(&self, n: usize) {
        self.sightings.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_new(&self) {
        self.new_devices.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updated(&self) {
        self.updated_devices.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed_lookups(&self) {
        self.failed_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScanSummary {
        ScanSummary {
            passes: self.passes.load(Ordering::Relaxed),
            sightings: self.sightings.load(Ordering::Relaxed),
            new_devices: self.new_devices.load(Ordering::Relaxed),
            updated_devices: self.updated_devices.load(Ordering::Relaxed),
            failed_lookups: self.failed_lookups.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!("Scan Summary:");
        info!("  Passes: {}", s.passes);
        info!("  Sightings: {}", s.sightings);
        info!("  New devices: {}", s.new_devices);
        info!("  Updated devices: {}", s.updated_devices);
        if s.failed_lookups > 0 {
            info!("  Failed lookups: {}", s.failed_lookups);
        }
    }
}
