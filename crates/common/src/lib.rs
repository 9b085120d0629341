//! Bluefang Common - shared types and traits
//!
//! Data model, option sets, error taxonomy, cancellation token and the
//! collaborator traits used across the bluefang workspace.

pub mod cancel;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use config::{AttackConfig, CaptureConfig, PayloadType, PinMode, ScanOptions};
pub use error::{BlueError, BlueResult};
pub use traits::{
    BtSocket, DeviceInfo, Discovery, HciControl, PairingAgent, ServiceBrowser, SocketConnector,
    Toolkit, TraceProvider, TraceSource,
};
pub use types::{
    AttackKind, AttackOutcome, AttackStatus, BdAddr, CapturedPacket, Device, DeviceClass,
    Direction, LogEvent, LogLevel, ProtocolTag, ScanEvent, Transport,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
