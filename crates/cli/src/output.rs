//! Output formatting for devices, attack sessions and captured packets

use anyhow::Result;
use serde_json::json;
use std::time::Duration;

use bluefang_attacks::AttackDescriptor;
use bluefang_capture::CaptureSummary;
use bluefang_common::{AttackOutcome, AttackStatus, CapturedPacket, Device, LogEvent, LogLevel};
use bluefang_scanner::devices_to_tsv;

/// Print the device list in the specified format
pub fn print_devices(devices: &[Device], format: &str, scan_duration: Duration) -> Result<()> {
    let format = format.trim().to_lowercase();
    match format.as_str() {
        "json" | "j" => print_devices_json(devices, scan_duration)?,
        "tsv" | "csv" | "c" => print!("{}", devices_to_tsv(devices)),
        "table" | "text" | "t" | "" => print_devices_table(devices, scan_duration),
        _ => {
            eprintln!("Warning: Unknown format '{}', using default table format", format);
            print_devices_table(devices, scan_duration);
        }
    }
    Ok(())
}

/// One line per newly seen or changed device while a scan runs.
pub fn print_device_found(device: &Device) {
    println!(
        "[+] {}  {:<28} {:<9} {}",
        device.address,
        truncate(&device.name, 28),
        device.device_class.to_string(),
        format_signal(device.signal_strength)
    );
}

/// Print devices as ASCII table (sorted by address)
fn print_devices_table(devices: &[Device], scan_duration: Duration) {
    if devices.is_empty() {
        println!("\nNo devices found.\n");
        return;
    }

    let mut sorted = devices.to_vec();
    sorted.sort_by(|a, b| a.address.to_string().cmp(&b.address.to_string()));

    println!("\n{:-<96}", "");
    println!(
        "{:<18} {:<26} {:<9} {:<8} {:<6} {:<25}",
        "ADDRESS", "NAME", "TYPE", "SIGNAL", "PAIRED", "SERVICES"
    );
    println!("{:-<96}", "");

    let mut paired_count = 0;
    let mut with_services = 0;
    for device in &sorted {
        println!(
            "{:<18} {:<26} {:<9} {:<8} {:<6} {:<25}",
            device.address.to_string(),
            truncate(&device.name, 26),
            device.device_class.to_string(),
            format_signal(device.signal_strength),
            if device.paired { "yes" } else { "no" },
            format_services(&device.services)
        );
        if device.paired {
            paired_count += 1;
        }
        if !device.services.is_empty() {
            with_services += 1;
        }
    }

    println!("{:-<96}", "");
    println!("\n📊 Summary:");
    println!("  Devices found: {}", devices.len());
    println!("  ✓ Paired: {}", paired_count);
    println!("  ⊕ With services: {}", with_services);
    println!("  ⏱️  Scan duration: {}", format_duration(scan_duration));
    println!();
}

fn devices_json(devices: &[Device], scan_duration: Duration) -> Result<serde_json::Value> {
    Ok(json!({
        "scan_info": {
            "duration_seconds": scan_duration.as_secs_f64(),
            "duration_formatted": format_duration(scan_duration),
            "total_devices": devices.len()
        },
        "devices": serde_json::to_value(devices)?
    }))
}

fn print_devices_json(devices: &[Device], scan_duration: Duration) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&devices_json(devices, scan_duration)?)?);
    Ok(())
}

/// Attack progress line, e.g. `[12:00:01] [+] PIN found: 1234`.
pub fn print_log_event(event: &LogEvent) {
    println!("{}", format_log_event(event));
}

fn format_log_event(event: &LogEvent) -> String {
    let marker = match event.level {
        LogLevel::Info => "[*]",
        LogLevel::Warning => "[!]",
        LogLevel::Error => "[-]",
        LogLevel::Success => "[+]",
    };
    format!("[{}] {} {}", event.timestamp.format("%H:%M:%S"), marker, event.message)
}

pub fn print_outcome(outcome: &AttackOutcome, format: &str) -> Result<()> {
    if format.trim().eq_ignore_ascii_case("json") {
        let output = json!({
            "session": outcome.session.to_string(),
            "attack": outcome.kind,
            "target": outcome.target,
            "status": outcome.status.to_string(),
            "duration_seconds": outcome.elapsed.as_secs_f64(),
            "fault": outcome.fault,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let badge = match outcome.status {
        AttackStatus::Succeeded => "✓",
        AttackStatus::Stopped => "⊘",
        _ => "✗",
    };
    println!("\n{:-<60}", "");
    println!(
        "{} {} against {}: {}",
        badge,
        outcome.kind.classic_name(),
        outcome.target,
        outcome.status
    );
    println!("  Session: {}", outcome.session);
    println!("  ⏱️  Duration: {}", format_duration(outcome.elapsed));
    if let Some(fault) = &outcome.fault {
        println!("  Fault: {}", fault);
    }
    println!("{:-<60}", "");
    Ok(())
}

/// Live packet line, or one JSON object per line.
pub fn print_packet(packet: &CapturedPacket, format: &str) -> Result<()> {
    if format.trim().eq_ignore_ascii_case("json") {
        println!("{}", serde_json::to_string(packet)?);
    } else {
        println!("{}", format_packet(packet));
    }
    Ok(())
}

fn format_packet(packet: &CapturedPacket) -> String {
    format!(
        "{} {:<7} {:<6} {} -> {} ({} bytes) {}",
        packet.timestamp.format("%H:%M:%S%.3f"),
        packet.direction.to_string(),
        packet.protocol.as_str(),
        packet.source,
        packet.destination,
        packet.payload.len(),
        hex_preview(&packet.payload, 16)
    )
}

pub fn print_capture_summary(summary: &CaptureSummary, buffered_now: usize, elapsed: Duration) {
    println!("\n📊 Capture summary:");
    println!("  Trace lines: {}", summary.lines);
    println!("  Packets buffered: {} (held now: {})", summary.buffered, buffered_now);
    println!("  Evicted: {}", summary.evicted);
    println!("  Shown: {}", summary.emitted);
    println!("  Filtered out: {}", summary.filtered);
    println!("  ⏱️  Duration: {}", format_duration(elapsed));
    println!();
}

pub fn print_catalog(descriptors: &[AttackDescriptor], format: &str) -> Result<()> {
    if format.trim().eq_ignore_ascii_case("json") {
        println!("{}", serde_json::to_string_pretty(descriptors)?);
        return Ok(());
    }
    println!("\n{:-<96}", "");
    println!("{:<20} {:<22} {:<52}", "ID", "NAME", "DESCRIPTION");
    println!("{:-<96}", "");
    for d in descriptors {
        println!("{:<20} {:<22} {:<52}", d.kind.as_str(), d.name, d.summary);
        if !d.options.is_empty() {
            println!("{:<43} options: {}", "", d.options.join(", "));
        }
    }
    println!("{:-<96}", "");
    Ok(())
}

fn format_signal(signal: Option<i16>) -> String {
    signal
        .map(|rssi| format!("{} dBm", rssi))
        .unwrap_or_else(|| "-".to_string())
}

fn format_services(services: &[String]) -> String {
    if services.is_empty() {
        "-".to_string()
    } else {
        truncate(&services.join(", "), 25)
    }
}

/// Clip to `max` characters, ending in `...` when shortened.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

fn hex_preview(payload: &[u8], max: usize) -> String {
    let mut out = payload
        .iter()
        .take(max)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if payload.len() > max {
        out.push_str(" ..");
    }
    out
}

/// Format duration in a human-readable way
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs == 0 {
        format!("{}ms", millis)
    } else if total_secs < 60 {
        if millis > 0 {
            format!("{}.{:03}s", total_secs, millis)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluefang_common::{AttackKind, BdAddr, DeviceClass, Direction, ProtocolTag};
    use chrono::{TimeZone, Utc};

    fn device() -> Device {
        let addr: BdAddr = "AA:BB:CC:DD:EE:01".parse().unwrap();
        Device::new(addr)
            .with_name("Pixel 7")
            .with_class(DeviceClass::Phone)
            .with_services(vec!["Headset AG".into(), "OBEX Object Push".into()])
    }

    #[test]
    fn test_devices_json_layout() {
        let value = devices_json(&[device()], Duration::from_secs(5)).unwrap();
        assert_eq!(value["scan_info"]["total_devices"], 1);
        assert_eq!(value["scan_info"]["duration_formatted"], "5s");
        assert_eq!(value["devices"][0]["address"], "AA:BB:CC:DD:EE:01");
        assert_eq!(value["devices"][0]["type"], "phone");
    }

    #[test]
    fn test_print_devices_formats() {
        let devices = vec![device()];
        assert!(print_devices(&devices, "json", Duration::from_secs(1)).is_ok());
        assert!(print_devices(&devices, "tsv", Duration::from_secs(1)).is_ok());
        assert!(print_devices(&devices, "text", Duration::from_secs(1)).is_ok());
        assert!(print_devices(&[], "text", Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_format_log_event() {
        let event = LogEvent {
            session: uuid_nil(),
            level: LogLevel::Success,
            message: "PIN found: 1234".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 1).unwrap(),
        };
        assert_eq!(format_log_event(&event), "[12:00:01] [+] PIN found: 1234");
    }

    #[test]
    fn test_print_outcome_json() {
        let outcome = AttackOutcome {
            session: uuid_nil(),
            kind: AttackKind::PinRecovery,
            target: "AA:BB:CC:DD:EE:01".parse().unwrap(),
            status: AttackStatus::Stopped,
            elapsed: Duration::from_millis(1500),
            fault: None,
        };
        assert!(print_outcome(&outcome, "json").is_ok());
        assert!(print_outcome(&outcome, "text").is_ok());
    }

    #[test]
    fn test_format_packet() {
        let packet = CapturedPacket {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            timestamp_from_trace: true,
            protocol: ProtocolTag::Rfcomm,
            direction: Direction::Out,
            source: "local".into(),
            destination: "RFCOMM:3".into(),
            payload: vec![0x01, 0xff],
            raw_line: String::new(),
        };
        let line = format_packet(&packet);
        assert!(line.starts_with("10:00:00.000 OUT"));
        assert!(line.contains("RFCOMM:3 (2 bytes) 01 ff"));
    }

    #[test]
    fn test_truncate_and_preview() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long device name", 10), "a very ...");
        assert_eq!(hex_preview(&[0xde, 0xad, 0xbe], 2), "de ad ..");
        assert_eq!(format_signal(Some(-61)), "-61 dBm");
        assert_eq!(format_signal(None), "-");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_millis(5500)), "5.500s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
    }

    fn uuid_nil() -> uuid::Uuid {
        uuid::Uuid::nil()
    }
}
