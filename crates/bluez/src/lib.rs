//! Bluefang BlueZ - collaborator implementations for Linux hosts
//!
//! Discovery, device info, service browsing, pairing and raw HCI commands
//! drive the BlueZ command-line tools (`hcitool`, `hciconfig`,
//! `bluetoothctl`, `sdptool`, `btmon`) through `tokio::process`. Radio
//! sockets are opened directly on `AF_BLUETOOTH`.

pub mod adapter;
pub mod agent;
pub mod discovery;
pub mod hci;
pub mod socket;
pub mod tool;
pub mod trace;

use std::sync::Arc;

use bluefang_common::Toolkit;

pub use adapter::adapter_status;
pub use agent::BluetoothctlAgent;
pub use discovery::{BluezInfo, HcitoolDiscovery, SdptoolBrowser};
pub use hci::HcitoolControl;
pub use socket::BluezSockets;
pub use trace::BtmonTraces;

/// Local adapter used when none is configured.
pub const DEFAULT_ADAPTER: &str = "hci0";

/// Every collaborator bound to `adapter`.
pub fn toolkit(adapter: &str) -> Toolkit {
    Toolkit {
        discovery: Arc::new(HcitoolDiscovery::new(adapter)),
        device_info: Arc::new(BluezInfo::new(adapter)),
        services: Arc::new(SdptoolBrowser::new()),
        agent: Arc::new(BluetoothctlAgent::new()),
        hci: Arc::new(HcitoolControl::new(adapter)),
        sockets: Arc::new(BluezSockets::new()),
        traces: Arc::new(BtmonTraces::new(adapter)),
    }
}
