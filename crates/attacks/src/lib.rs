//! Bluefang Attacks - the attack module catalog
//!
//! Every module follows the same three-phase contract (`check_vulnerability`,
//! `exploit`, `run_payload`) and is resolved from an `AttackKind` through the
//! fixed registry in [`catalog`]. Modules talk to the radio only through the
//! collaborator traits carried in the [`AttackContext`].

pub mod catalog;
pub mod log;
pub mod module;
pub mod modules;
pub mod obex_session;
pub mod payloads;
pub mod probe;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{catalog, describe, module_for, AttackDescriptor};
pub use log::AttackLog;
pub use module::{AttackContext, AttackModule};
