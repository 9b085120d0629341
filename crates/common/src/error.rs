//! Error types for bluefang
//!
//! The variants follow the failure classes an operation can hit: the peer was
//! unreachable, it answered with something unexpected, a local tool or adapter
//! was missing, or the operation was stopped cooperatively.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlueError {
    /// Target unreachable, connect refused, send/recv timed out.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Malformed or missing response where one was expected.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Required external tool, adapter or provider is unavailable.
    #[error("Resource unavailable: {0}")]
    Resource(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// Another scan or attack already holds the single-flight slot.
    #[error("Busy: {0}")]
    Busy(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BlueError {
    /// True when the error came from a cooperative stop rather than a fault.
    #[inline]
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, BlueError::Cancelled)
    }

    /// Connectivity and protocol errors are recovered locally by callers
    /// (next candidate / negative probe result).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, BlueError::Connectivity(_) | BlueError::Protocol(_))
    }

    /// Classify a socket-level I/O error. A missing binary or a missing
    /// address family is a resource problem, everything else is connectivity.
    pub fn from_socket(context: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied | io::ErrorKind::Unsupported => {
                BlueError::Resource(format!("{}: {}", context, err))
            }
            _ if err.raw_os_error() == Some(97) => {
                // EAFNOSUPPORT: kernel has no Bluetooth support
                BlueError::Resource(format!("{}: {}", context, err))
            }
            _ => BlueError::Connectivity(format!("{}: {}", context, err)),
        }
    }

    /// Classify an I/O error from connect/send/recv on an existing socket.
    /// Refusals from the peer (including EACCES on a secured channel) are
    /// connectivity; only a missing address family is a resource problem.
    pub fn from_peer(context: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::Unsupported => BlueError::Resource(format!("{}: {}", context, err)),
            _ if err.raw_os_error() == Some(97) => BlueError::Resource(format!("{}: {}", context, err)),
            _ => BlueError::Connectivity(format!("{}: {}", context, err)),
        }
    }
}

/// Result type alias for bluefang operations
pub type BlueResult<T> = Result<T, BlueError>;
