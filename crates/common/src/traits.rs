//! Collaborator traits for the host Bluetooth stack.
//!
//! Every blocking interaction with the radio goes through one of these, and
//! every call carries its own deadline. `bluefang-bluez` implements them on
//! Linux; tests substitute in-memory mocks.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::BlueResult;
use crate::types::{BdAddr, Transport};

/// Inquiry-style scan provider.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Run one inquiry and return its raw output lines (`<addr> <name...>`).
    async fn inquiry(&self, timeout: Duration) -> BlueResult<Vec<String>>;

    /// Whether a local adapter is present and up.
    async fn adapter_ready(&self) -> BlueResult<bool> {
        Ok(true)
    }
}

/// Per-device attribute provider (signal, pairing state, icon hint, versions).
#[async_trait]
pub trait DeviceInfo: Send + Sync {
    async fn info(&self, addr: BdAddr, timeout: Duration) -> BlueResult<String>;
}

/// Service discovery provider; returns service-record text.
#[async_trait]
pub trait ServiceBrowser: Send + Sync {
    async fn browse(&self, addr: BdAddr, timeout: Duration) -> BlueResult<String>;
}

/// Interactive pairing agent fed a script of commands.
#[async_trait]
pub trait PairingAgent: Send + Sync {
    /// Feed `commands` one per line and return everything the agent printed.
    async fn run(&self, commands: &[String], timeout: Duration) -> BlueResult<String>;

    /// One pairing attempt answering the PIN prompt with `pin`.
    async fn pair_with_pin(&self, addr: BdAddr, pin: &str, timeout: Duration) -> BlueResult<String> {
        let script = vec![
            "scan on".to_string(),
            format!("pair {}", addr),
            pin.to_string(),
            "quit".to_string(),
        ];
        self.run(&script, timeout).await
    }
}

/// Raw HCI command submission.
#[async_trait]
pub trait HciControl: Send + Sync {
    /// Submit an encoded HCI command packet and return the controller's reply text.
    async fn command(&self, frame: &[u8], timeout: Duration) -> BlueResult<String>;
}

/// A connected radio socket. Closed when dropped.
#[async_trait]
pub trait BtSocket: Send {
    async fn send(&mut self, data: &[u8], timeout: Duration) -> BlueResult<usize>;

    /// Receive up to `max` bytes. An empty vector means the peer closed.
    async fn recv(&mut self, max: usize, timeout: Duration) -> BlueResult<Vec<u8>>;
}

/// Opens sockets addressed by (peer, channel). The channel is a PSM for
/// L2CAP transports and a channel number for RFCOMM.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(
        &self,
        addr: BdAddr,
        transport: Transport,
        channel: u16,
        timeout: Duration,
    ) -> BlueResult<Box<dyn BtSocket>>;
}

/// Live link-trace line stream.
#[async_trait]
pub trait TraceSource: Send {
    /// Next trace line, or `None` at end of stream.
    async fn next_line(&mut self) -> BlueResult<Option<String>>;
}

/// Starts trace streams on demand.
#[async_trait]
pub trait TraceProvider: Send + Sync {
    async fn open(&self) -> BlueResult<Box<dyn TraceSource>>;
}

/// One handle per collaborator, cloned into every worker.
#[derive(Clone)]
pub struct Toolkit {
    pub discovery: Arc<dyn Discovery>,
    pub device_info: Arc<dyn DeviceInfo>,
    pub services: Arc<dyn ServiceBrowser>,
    pub agent: Arc<dyn PairingAgent>,
    pub hci: Arc<dyn HciControl>,
    pub sockets: Arc<dyn SocketConnector>,
    pub traces: Arc<dyn TraceProvider>,
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit").finish_non_exhaustive()
    }
}
