//! Bluefang Scanner - device registry and discovery loop
//!
//! A scan pass repeatedly asks the discovery collaborator for sightings
//! until its duration elapses, enriches first-seen devices once with
//! service and attribute lookups, and reports every new or changed device.

mod registry;
mod scanner;
mod stats;

pub use registry::{devices_to_tsv, DeviceRegistry, Lookups, Upsert};
pub use scanner::Scanner;
pub use stats::{ScanStats, ScanSummary};
