//! Capture worker and the shared buffer it fills.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use bluefang_common::{
    BlueError, BlueResult, CancelToken, CaptureConfig, CapturedPacket, TraceProvider, TraceSource,
};

use crate::buffer::PacketBuffer;
use crate::filter::PacketFilter;
use crate::parser::parse_line;
use crate::pcap::write_pcap;
use crate::stats::{CaptureStats, CaptureSummary};

/// Cheap to clone; clones share the buffer, filter, counters and the busy
/// flag, so the buffer stays readable while the worker runs.
#[derive(Clone)]
pub struct CapturePipeline {
    buffer: Arc<Mutex<PacketBuffer>>,
    filter: Arc<RwLock<PacketFilter>>,
    stats: Arc<CaptureStats>,
    active: Arc<AtomicBool>,
}

struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CapturePipeline {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(PacketBuffer::new(config.max_packets))),
            filter: Arc::new(RwLock::new(PacketFilter::from_config(config))),
            stats: Arc::new(CaptureStats::new()),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the filter. Takes effect from the next line.
    pub fn set_filter(&self, filter: PacketFilter) {
        *self.filter.write() = filter;
    }

    pub fn filter(&self) -> PacketFilter {
        self.filter.read().clone()
    }

    pub fn set_max_packets(&self, max: usize) {
        let dropped = self.buffer.lock().set_capacity(max);
        if dropped > 0 {
            debug!(dropped, "Buffer shrunk");
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Buffered packets, oldest first.
    pub fn snapshot(&self) -> Vec<CapturedPacket> {
        self.buffer.lock().to_vec()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    pub fn stats(&self) -> CaptureSummary {
        self.stats.snapshot()
    }

    /// Parse and buffer one line. Returns the packet when it passes the
    /// filter and should be forwarded.
    pub fn ingest(&self, line: &str, now: DateTime<Utc>) -> Option<CapturedPacket> {
        self.stats.line();
        let Some(packet) = parse_line(line, now) else {
            self.stats.skip();
            return None;
        };
        let passed = self.filter.read().matches(&packet);
        let evicted = self.buffer.lock().push(packet.clone());
        self.stats.buffer(evicted.is_some());
        self.stats.emit(passed);
        passed.then_some(packet)
    }

    /// Launch the capture worker. Rejected with `Busy` while one is running.
    pub fn start(
        &self,
        provider: Arc<dyn TraceProvider>,
        cancel: CancelToken,
        events: UnboundedSender<CapturedPacket>,
    ) -> BlueResult<JoinHandle<BlueResult<()>>> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BlueError::Busy("capture already in progress".into()));
        }
        let guard = ActiveGuard(self.active.clone());
        let worker = self.clone();
        Ok(tokio::spawn(async move {
            let _guard = guard;
            let source = cancel.run(provider.open()).await?;
            worker.run(source, &cancel, &events).await
        }))
    }

    /// Worker body: read until the trace ends or the token is cancelled.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        mut source: Box<dyn TraceSource>,
        cancel: &CancelToken,
        events: &UnboundedSender<CapturedPacket>,
    ) -> BlueResult<()> {
        info!("Capture started");
        let result = loop {
            match cancel.run(source.next_line()).await {
                Ok(Some(line)) => {
                    if let Some(packet) = self.ingest(&line, Utc::now()) {
                        let _ = events.send(packet);
                    }
                }
                Ok(None) => {
                    info!("Trace ended");
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };
        self.stats.log_summary();
        result
    }

    /// Write the buffer as a PCAP file. Returns the record count.
    pub fn export_pcap(&self, path: &Path) -> BlueResult<usize> {
        let packets = self.snapshot();
        let written = write_pcap(path, &packets)?;
        info!(path = %path.display(), records = written, "PCAP exported");
        Ok(written)
    }

    /// Write each buffered packet's raw trace line, one per line.
    pub fn save_lines(&self, path: &Path) -> BlueResult<usize> {
        let packets = self.snapshot();
        let mut out = BufWriter::new(File::create(path)?);
        for packet in &packets {
            writeln!(out, "{}", packet.raw_line)?;
        }
        out.flush()?;
        Ok(packets.len())
    }
}
