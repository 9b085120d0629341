//! Orchestrator - single-flight ownership of scan and attack sessions
//!
//! Workers report through typed channels (scan events, attack log events,
//! final outcomes) and the current activity is published on a watch
//! channel.

mod orchestrator;
mod session;

pub use orchestrator::{EventStreams, Orchestrator};
pub use session::ActivityState;
