//! In-memory device registry keyed by address.
//!
//! Entries are only created and replaced through `upsert`, which holds the
//! per-key shard lock for the whole compare-and-write, so each address has a
//! single writer at a time.

use bluefang_common::{BdAddr, BlueResult, Device};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// What an upsert did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    New,
    Updated,
    Unchanged,
}

impl Upsert {
    /// New and updated entries are reported to observers.
    #[inline]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Upsert::Unchanged)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    device: Device,
    services_fetched: bool,
    info_fetched: bool,
}

/// Lookup state carried alongside a device between scan passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lookups {
    pub services_fetched: bool,
    pub info_fetched: bool,
}

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: DashMap<BdAddr, Entry>,
    next_seq: AtomicU64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the device at its address.
    pub fn upsert(&self, device: Device, lookups: Lookups) -> Upsert {
        match self.devices.entry(device.address) {
            MapEntry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                entry.services_fetched |= lookups.services_fetched;
                entry.info_fetched |= lookups.info_fetched;
                if entry.device == device {
                    Upsert::Unchanged
                } else {
                    entry.device = device;
                    Upsert::Updated
                }
            }
            MapEntry::Vacant(slot) => {
                debug!(address = %device.address, name = %device.name, "new device");
                slot.insert(Entry {
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    device,
                    services_fetched: lookups.services_fetched,
                    info_fetched: lookups.info_fetched,
                });
                Upsert::New
            }
        }
    }

    pub fn get(&self, addr: &BdAddr) -> Option<Device> {
        self.devices.get(addr).map(|e| e.device.clone())
    }

    /// Device and lookup state, if known.
    pub fn snapshot(&self, addr: &BdAddr) -> Option<(Device, Lookups)> {
        self.devices.get(addr).map(|e| {
            (
                e.device.clone(),
                Lookups {
                    services_fetched: e.services_fetched,
                    info_fetched: e.info_fetched,
                },
            )
        })
    }

    /// All devices in first-seen order.
    pub fn list(&self) -> Vec<Device> {
        let mut entries: Vec<(u64, Device)> = self
            .devices
            .iter()
            .map(|e| (e.seq, e.device.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, d)| d).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&self) {
        self.devices.clear();
    }

    pub fn export_json(&self) -> BlueResult<String> {
        Ok(serde_json::to_string_pretty(&self.list())?)
    }

    /// Tab-separated export with a header row.
    pub fn export_tsv(&self) -> String {
        devices_to_tsv(&self.list())
    }

    pub fn write_json(&self, path: &Path) -> BlueResult<()> {
        std::fs::write(path, self.export_json()?)?;
        Ok(())
    }

    pub fn write_tsv(&self, path: &Path) -> BlueResult<()> {
        std::fs::write(path, self.export_tsv())?;
        Ok(())
    }
}

pub fn devices_to_tsv(devices: &[Device]) -> String {
    let mut out = String::from("address\tname\ttype\tsignal\tservices\tpaired\tconnected\n");
    for d in devices {
        let signal = d.signal_strength.map(|s| s.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            d.address,
            d.name.replace('\t', " "),
            d.device_class,
            signal,
            d.services.join(", "),
            d.paired,
            d.connected
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluefang_common::DeviceClass;

    fn addr(s: &str) -> BdAddr {
        s.parse().unwrap()
    }

    #[test]
    fn upsert_reports_changes() {
        let reg = DeviceRegistry::new();
        let d = Device::new(addr("00:11:22:33:44:55")).with_name("Phone");
        assert_eq!(reg.upsert(d.clone(), Lookups::default()), Upsert::New);
        assert_eq!(reg.upsert(d.clone(), Lookups::default()), Upsert::Unchanged);
        let renamed = d.with_name("Phone 2");
        assert_eq!(reg.upsert(renamed, Lookups::default()), Upsert::Updated);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(&addr("00:11:22:33:44:55")).unwrap().name, "Phone 2");
    }

    #[test]
    fn lookup_flags_are_sticky() {
        let reg = DeviceRegistry::new();
        let a = addr("00:11:22:33:44:55");
        reg.upsert(
            Device::new(a),
            Lookups {
                services_fetched: true,
                info_fetched: false,
            },
        );
        reg.upsert(Device::new(a), Lookups::default());
        let (_, lookups) = reg.snapshot(&a).unwrap();
        assert!(lookups.services_fetched);
        assert!(!lookups.info_fetched);
    }

    #[test]
    fn list_keeps_first_seen_order() {
        let reg = DeviceRegistry::new();
        for a in ["FF:00:00:00:00:01", "00:00:00:00:00:02", "88:00:00:00:00:03"] {
            reg.upsert(Device::new(addr(a)), Lookups::default());
        }
        let order: Vec<String> = reg.list().iter().map(|d| d.address.to_string()).collect();
        assert_eq!(order, vec!["FF:00:00:00:00:01", "00:00:00:00:00:02", "88:00:00:00:00:03"]);
        reg.clear();
        assert!(reg.is_empty());
    }

    #[test]
    fn exports() {
        let reg = DeviceRegistry::new();
        let mut d = Device::new(addr("AA:BB:CC:DD:EE:01"))
            .with_name("TestPhone")
            .with_class(DeviceClass::Phone)
            .with_services(vec!["OBEX Object Push".into(), "Headset".into()]);
        d.signal_strength = Some(-40);
        reg.upsert(d, Lookups::default());

        let tsv = reg.export_tsv();
        let row = tsv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "AA:BB:CC:DD:EE:01\tTestPhone\tphone\t-40\tOBEX Object Push, Headset\tfalse\tfalse"
        );

        let json: serde_json::Value = serde_json::from_str(&reg.export_json().unwrap()).unwrap();
        assert_eq!(json[0]["address"], "AA:BB:CC:DD:EE:01");
        assert_eq!(json[0]["type"], "phone");
        assert_eq!(json[0]["signal"], -40);
    }

    #[test]
    fn write_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let reg = DeviceRegistry::new();
        reg.upsert(Device::new(addr("AA:BB:CC:DD:EE:01")), Lookups::default());
        let path = dir.path().join("devices.json");
        reg.write_json(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("AA:BB:CC:DD:EE:01"));
    }
}
