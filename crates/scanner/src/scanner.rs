//! Bounded discovery loop feeding the device registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use bluefang_common::{
    BdAddr, BlueError, BlueResult, CancelToken, Device, DeviceClass, DeviceInfo, Discovery,
    ScanEvent, ScanOptions, ServiceBrowser, Toolkit,
};
use bluefang_fingerprint::{
    class_from_icon, class_from_name, parse_device_info, parse_scan_output, parse_service_names,
    DeviceAttributes,
};

use crate::registry::{DeviceRegistry, Lookups, Upsert};
use crate::stats::{ScanStats, ScanSummary};

/// Discovery driver. Cheap to clone; clones share the registry, the
/// counters and the busy flag.
#[derive(Clone)]
pub struct Scanner {
    discovery: Arc<dyn Discovery>,
    device_info: Arc<dyn DeviceInfo>,
    services: Arc<dyn ServiceBrowser>,
    registry: Arc<DeviceRegistry>,
    stats: Arc<ScanStats>,
    active: Arc<AtomicBool>,
}

/// Clears the busy flag when the worker ends, however it ends.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Scanner {
    pub fn new(toolkit: &Toolkit, registry: Arc<DeviceRegistry>) -> Self {
        Self::from_parts(
            toolkit.discovery.clone(),
            toolkit.device_info.clone(),
            toolkit.services.clone(),
            registry,
        )
    }

    pub fn from_parts(
        discovery: Arc<dyn Discovery>,
        device_info: Arc<dyn DeviceInfo>,
        services: Arc<dyn ServiceBrowser>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            discovery,
            device_info,
            services,
            registry,
            stats: Arc::new(ScanStats::new()),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> ScanSummary {
        self.stats.snapshot()
    }

    /// Launch one background scan. A second call while a scan is running is
    /// rejected with `Busy`; nothing is queued.
    pub fn start(
        &self,
        options: ScanOptions,
        cancel: CancelToken,
        events: UnboundedSender<ScanEvent>,
    ) -> BlueResult<JoinHandle<BlueResult<()>>> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BlueError::Busy("scan already in progress".into()));
        }
        let guard = ActiveGuard(self.active.clone());
        let worker = self.clone();
        Ok(tokio::spawn(async move {
            let _guard = guard;
            worker.run(options, &cancel, &events).await
        }))
    }

    /// Worker body. Returns `Err(Cancelled)` when stopped; `ScanComplete` is
    /// only sent for passes that ran to their deadline.
    pub async fn run(
        &self,
        options: ScanOptions,
        cancel: &CancelToken,
        events: &UnboundedSender<ScanEvent>,
    ) -> BlueResult<()> {
        loop {
            self.run_pass(&options, cancel, events).await?;
            let devices = self.registry.list();
            info!(devices = devices.len(), "Scan pass complete");
            self.stats.log_summary();
            let _ = events.send(ScanEvent::ScanComplete(devices));
            if !options.continuous {
                return Ok(());
            }
        }
    }

    #[instrument(skip_all, fields(duration = ?options.duration))]
    async fn run_pass(
        &self,
        options: &ScanOptions,
        cancel: &CancelToken,
        events: &UnboundedSender<ScanEvent>,
    ) -> BlueResult<()> {
        let deadline = Instant::now() + options.duration;
        loop {
            cancel.check()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            self.stats.increment_passes();

            let inquiry = self.discovery.inquiry(options.inquiry_timeout.min(remaining));
            let lines = match cancel.run(inquiry).await {
                Ok(lines) => lines,
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e @ BlueError::Resource(_)) => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Inquiry failed");
                    Vec::new()
                }
            };

            let sightings = parse_scan_output(lines.iter().map(String::as_str));
            self.stats.add_sightings(sightings.len());
            for (addr, name) in sightings {
                cancel.check()?;
                let (device, change) = self.observe(addr, name, options, cancel).await?;
                match change {
                    Upsert::New => self.stats.increment_new(),
                    Upsert::Updated => self.stats.increment_updated(),
                    Upsert::Unchanged => {}
                }
                if change.is_change() {
                    let _ = events.send(ScanEvent::DeviceFound(device));
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            cancel.sleep(options.poll_interval.min(remaining)).await?;
        }
    }

    /// Merge one sighting into the registry, running the once-per-address
    /// lookups on first contact.
    async fn observe(
        &self,
        addr: BdAddr,
        name: String,
        options: &ScanOptions,
        cancel: &CancelToken,
    ) -> BlueResult<(Device, Upsert)> {
        let (device, mut lookups) = self
            .registry
            .snapshot(&addr)
            .unwrap_or_else(|| (Device::new(addr), Lookups::default()));
        let mut device = device.with_name(name);

        if device.device_class == DeviceClass::Unknown {
            device.device_class = class_from_name(&device.name);
        }

        if options.fetch_services && !lookups.services_fetched {
            match cancel.run(self.services.browse(addr, options.service_timeout)).await {
                Ok(text) => device.services = parse_service_names(&text),
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    self.stats.increment_failed_lookups();
                    debug!(address = %addr, error = %e, "Service lookup failed");
                }
            }
            lookups.services_fetched = true;
        }

        if options.fetch_info && !lookups.info_fetched {
            match cancel.run(self.device_info.info(addr, options.info_timeout)).await {
                Ok(text) => apply_info(&mut device, &parse_device_info(&text)),
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    self.stats.increment_failed_lookups();
                    debug!(address = %addr, error = %e, "Info lookup failed");
                }
            }
            lookups.info_fetched = true;
        }

        let change = self.registry.upsert(device.clone(), lookups);
        Ok((device, change))
    }
}

fn apply_info(device: &mut Device, attrs: &DeviceAttributes) {
    if attrs.rssi.is_some() {
        device.signal_strength = attrs.rssi;
    }
    device.paired = attrs.paired;
    device.trusted = attrs.trusted;
    device.connected = attrs.connected;
    if device.device_class == DeviceClass::Unknown {
        if let Some(icon) = attrs.icon.as_deref() {
            device.device_class = class_from_icon(icon);
        }
    }
}
