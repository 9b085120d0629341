//! Fingerprint Engine - text parsers for stack tool output
//!
//! The host stack is a black box that prints text. This crate turns that
//! text into typed values:
//! - scan lines into `(address, name)` pairs
//! - device-info blocks into attribute sets
//! - service records into names and RFCOMM channels
//! - names and icon hints into a `DeviceClass`
//! - version/service strings into vulnerability hints

mod adapter;
mod classify;
mod device_info;
mod scan_line;
mod service_records;
mod vulns;

pub use adapter::{parse_adapter_status, AdapterStatus};
pub use classify::{class_from_icon, class_from_name, infer_class};
pub use device_info::{parse_device_info, DeviceAttributes};
pub use scan_line::{parse_scan_line, parse_scan_output};
pub use service_records::{
    channel_for_service, parse_service_names, parse_service_records, ServiceRecord,
};
pub use vulns::{
    matches_any, VULN_SWEEP_SERVICES, VULN_SWEEP_VERSIONS, WEAK_KEY_MARKERS, WEAK_KEY_VERSIONS,
};
