//! Bluefang Codec - frame builders and trace decoding
//!
//! Pure functions over byte buffers for the link and session protocols the
//! attack modules speak, plus the best-effort trace-line classifier used by
//! the capture pipeline. Builders never validate payload semantics.

pub mod error;
pub mod hci;
pub mod l2cap;
pub mod obex;
pub mod rfcomm;
pub mod sdp;
pub mod trace;

pub use error::{CodecError, CodecResult};
pub use trace::{classify, extract_hex};
