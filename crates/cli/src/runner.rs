// runner.rs
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{info, warn};

use bluefang_attacks::catalog;
use bluefang_capture::CapturePipeline;
use bluefang_common::{
    AttackConfig, AttackKind, AttackStatus, BdAddr, BlueError, CancelToken, CaptureConfig,
    ScanEvent, ScanOptions, Toolkit,
};
use bluefang_orchestrator::Orchestrator;
use bluefang_scanner::DeviceRegistry;

use crate::output::{
    print_catalog, print_capture_summary, print_device_found, print_devices, print_log_event,
    print_outcome, print_packet,
};

/// Scan flags gathered from the command line.
pub struct ScanRequest {
    pub duration: Option<u64>,
    pub continuous: bool,
    pub preset: String,
    pub no_services: bool,
    pub no_info: bool,
    pub export: Option<PathBuf>,
}

impl ScanRequest {
    fn options(&self) -> ScanOptions {
        let mut options = match self.preset.as_str() {
            "fast" => ScanOptions::fast(),
            "thorough" => ScanOptions::thorough(),
            _ => ScanOptions::default(),
        };
        if let Some(secs) = self.duration {
            options = options.with_duration(Duration::from_secs(secs.max(1)));
        }
        options.fetch_services &= !self.no_services;
        options.fetch_info &= !self.no_info;
        options.with_continuous(self.continuous)
    }
}

/// Bring up the BlueZ toolkit for `adapter`, refusing to go on when the
/// adapter is down.
async fn open_adapter(adapter: &str) -> Result<Toolkit> {
    let status = bluefang_bluez::adapter_status(adapter)
        .await
        .with_context(|| format!("Failed to query adapter {}", adapter))?;
    if !status.up {
        return Err(BlueError::Resource(format!(
            "adapter {} is down; bring it up with `hciconfig {} up`",
            adapter, adapter
        )))
        .context("Adapter check failed");
    }
    info!(
        adapter,
        address = status.address.as_deref().unwrap_or("unknown"),
        name = status.name.as_deref().unwrap_or("unknown"),
        "Adapter ready"
    );
    Ok(bluefang_bluez::toolkit(adapter))
}

pub async fn run_scan(adapter: &str, request: ScanRequest, output_format: &str) -> Result<()> {
    let options = request.options();
    info!("Starting scan...");
    info!("Adapter: {}", adapter);
    info!("Pass length: {}s", options.duration.as_secs());
    info!("Continuous: {}", options.continuous);

    let toolkit = open_adapter(adapter).await?;
    let registry = Arc::new(DeviceRegistry::new());
    let (orchestrator, mut events) = Orchestrator::new(toolkit, registry.clone());

    let scan_start = Instant::now();
    orchestrator
        .start_scan(options)
        .await
        .context("Failed to start scan")?;

    let live = output_format.trim().eq_ignore_ascii_case("text");
    let mut stopping = false;
    loop {
        tokio::select! {
            biased;
            Some(event) = events.scan.recv() => show_scan_event(&event, live),
            res = tokio::signal::ctrl_c(), if !stopping => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping scan");
                orchestrator.stop().await;
                stopping = true;
            }
            _ = orchestrator.wait() => break,
        }
    }
    while let Ok(event) = events.scan.try_recv() {
        show_scan_event(&event, live);
    }
    let scan_duration = scan_start.elapsed();

    let devices = registry.list();
    print_devices(&devices, output_format, scan_duration)?;
    let stats = orchestrator.scan_stats();
    info!(
        passes = stats.passes,
        sightings = stats.sightings,
        new = stats.new_devices,
        updated = stats.updated_devices,
        failed_lookups = stats.failed_lookups,
        "Scan finished"
    );

    if let Some(path) = request.export {
        export_devices(&registry, &path)?;
        info!("Exported {} device(s) to {}", devices.len(), path.display());
    }
    match orchestrator.scan_fault() {
        Some(fault) => Err(anyhow!("Scan failed: {}", fault)),
        None => Ok(()),
    }
}

fn show_scan_event(event: &ScanEvent, live: bool) {
    match event {
        ScanEvent::DeviceFound(device) if live => print_device_found(device),
        ScanEvent::DeviceFound(_) => {}
        ScanEvent::ScanComplete(devices) => info!("Scan pass complete: {} device(s)", devices.len()),
    }
}

fn export_devices(registry: &DeviceRegistry, path: &Path) -> Result<()> {
    let tabular = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tsv") || e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false);
    let written = if tabular {
        registry.write_tsv(path)
    } else {
        registry.write_json(path)
    };
    written.with_context(|| format!("Failed to export devices to {}", path.display()))
}

/// Run one attack to completion. Returns true when it succeeded.
pub async fn run_attack(
    adapter: &str,
    attack: &str,
    target: &str,
    options: &[String],
    output_format: &str,
) -> Result<bool> {
    let kind: AttackKind = attack.parse().context("Invalid attack")?;
    let target: BdAddr = target.parse().context("Invalid target address")?;
    let config = AttackConfig::from_options(parse_options(options)?)
        .context("Invalid attack options")?;

    info!("Attack: {} ({})", kind.classic_name(), kind);
    info!("Target: {}", target);

    let toolkit = open_adapter(adapter).await?;
    let (orchestrator, mut events) = Orchestrator::new(toolkit, Arc::new(DeviceRegistry::new()));
    let session = orchestrator
        .start_attack(kind, target, config)
        .await
        .context("Failed to start attack")?;
    info!("Session: {}", session);

    let mut outcome = None;
    let mut stopping = false;
    loop {
        tokio::select! {
            biased;
            Some(event) = events.logs.recv() => print_log_event(&event),
            Some(done) = events.outcomes.recv() => outcome = Some(done),
            res = tokio::signal::ctrl_c(), if !stopping => {
                res.context("Failed to listen for Ctrl-C")?;
                warn!("Interrupted, stopping attack");
                orchestrator.stop().await;
                stopping = true;
            }
            _ = orchestrator.wait() => break,
        }
    }
    while let Ok(event) = events.logs.try_recv() {
        print_log_event(&event);
    }
    if let Ok(done) = events.outcomes.try_recv() {
        outcome = Some(done);
    }

    let outcome = outcome
        .or_else(|| orchestrator.last_outcome())
        .ok_or_else(|| anyhow!("Attack session {} ended without an outcome", session))?;
    print_outcome(&outcome, output_format)?;
    Ok(outcome.status == AttackStatus::Succeeded)
}

pub async fn run_capture(
    adapter: &str,
    duration: Option<u64>,
    options: &[String],
    pcap: Option<&Path>,
    save_text: Option<&Path>,
    output_format: &str,
) -> Result<()> {
    let config = CaptureConfig::from_options(parse_options(options)?)
        .context("Invalid capture options")?;
    info!("Starting capture on {}", adapter);
    info!("Buffer: {} packet(s)", config.max_packets);

    let toolkit = bluefang_bluez::toolkit(adapter);
    let pipeline = CapturePipeline::new(&config);
    let cancel = CancelToken::new();
    let (tx, mut rx) = unbounded_channel();
    let handle = pipeline
        .start(toolkit.traces.clone(), cancel.clone(), tx)
        .context("Failed to start capture")?;

    let limit = async move {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(limit);

    let capture_start = Instant::now();
    let mut stopping = false;
    loop {
        tokio::select! {
            packet = rx.recv() => match packet {
                Some(packet) => print_packet(&packet, output_format)?,
                None => break,
            },
            res = tokio::signal::ctrl_c(), if !stopping => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping capture");
                cancel.cancel();
                stopping = true;
            }
            _ = &mut limit, if !stopping => {
                info!("Capture duration reached");
                cancel.cancel();
                stopping = true;
            }
        }
    }

    match handle.await.context("Capture worker aborted")? {
        Ok(()) => {}
        Err(e) if e.is_cancellation() => {}
        Err(e) => return Err(e).context("Capture failed"),
    }

    if let Some(path) = pcap {
        let written = pipeline
            .export_pcap(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} packet(s) to {}", written, path.display());
    }
    if let Some(path) = save_text {
        let written = pipeline
            .save_lines(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved {} line(s) to {}", written, path.display());
    }
    print_capture_summary(&pipeline.stats(), pipeline.len(), capture_start.elapsed());
    Ok(())
}

pub fn list_attacks(output_format: &str) -> Result<()> {
    print_catalog(&catalog(), output_format)
}

/// Splits `key=value` arguments. The value keeps any further `=`.
fn parse_options(options: &[String]) -> Result<Vec<(String, String)>> {
    options
        .iter()
        .map(|raw| {
            let (key, value) = raw
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid option '{}': expected key=value", raw))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(anyhow!("Invalid option '{}': empty key", raw));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_options_pairs() {
        let parsed = parse_options(&strings(&["attempts=20", " stealth = true "])).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("attempts".to_string(), "20".to_string()),
                ("stealth".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_options_keeps_extra_equals() {
        let parsed = parse_options(&strings(&["defaultCommand=AT+CLIP=1"])).unwrap();
        assert_eq!(parsed[0].1, "AT+CLIP=1");
    }

    #[test]
    fn test_parse_options_invalid() {
        assert!(parse_options(&strings(&["attempts"])).is_err());
        assert!(parse_options(&strings(&["=5"])).is_err());
        assert!(parse_options(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_options_feed_attack_config() {
        let parsed = parse_options(&strings(&["attempts=3", "pinMode=exhaustive"])).unwrap();
        let config = AttackConfig::from_options(parsed).unwrap();
        assert_eq!(config.attempts, 3);
    }

    #[test]
    fn test_scan_request_presets() {
        let request = ScanRequest {
            duration: None,
            continuous: false,
            preset: "fast".into(),
            no_services: false,
            no_info: false,
            export: None,
        };
        let options = request.options();
        assert_eq!(options.duration, ScanOptions::fast().duration);
        assert!(!options.fetch_services);

        let request = ScanRequest {
            duration: Some(7),
            continuous: true,
            preset: "default".into(),
            no_services: true,
            no_info: false,
            export: None,
        };
        let options = request.options();
        assert_eq!(options.duration, Duration::from_secs(7));
        assert!(options.continuous);
        assert!(!options.fetch_services);
        assert!(options.fetch_info);
    }
}
