//! Fixed registry from `AttackKind` to its implementation.

use serde::Serialize;

use bluefang_common::AttackKind;

use crate::module::AttackModule;
use crate::modules::{
    AtCommand, Exfiltrate, Flood, Inject, Message, PinRecovery, SdpOverflow, VulnSweep, WeakKey,
};

/// Fresh module instance for one session.
pub fn module_for(kind: AttackKind) -> Box<dyn AttackModule> {
    match kind {
        AttackKind::VulnSweep => Box::new(VulnSweep::new()),
        AttackKind::WeakKey => Box::new(WeakKey::new()),
        AttackKind::Flood => Box::new(Flood::new()),
        AttackKind::Exfiltrate => Box::new(Exfiltrate::new()),
        AttackKind::Message => Box::new(Message::new()),
        AttackKind::Inject => Box::new(Inject::new()),
        AttackKind::SdpOverflow => Box::new(SdpOverflow::new()),
        AttackKind::PinRecovery => Box::new(PinRecovery::new()),
        AttackKind::AtCommand => Box::new(AtCommand::new()),
    }
}

/// One catalog line for listings.
#[derive(Debug, Clone, Serialize)]
pub struct AttackDescriptor {
    pub kind: AttackKind,
    pub name: &'static str,
    pub summary: &'static str,
    /// Options the module reads beyond `timeout`, `stealth` and `verbose`.
    pub options: &'static [&'static str],
}

pub fn describe(kind: AttackKind) -> AttackDescriptor {
    let (summary, options): (&'static str, &'static [&'static str]) = match kind {
        AttackKind::VulnSweep => (
            "Match stack version and exposed protocols, send malformed SDP/L2CAP/RFCOMM frames",
            &[],
        ),
        AttackKind::WeakKey => (
            "Pair through the agent, then request a 1-byte encryption key",
            &[],
        ),
        AttackKind::Flood => (
            "Flood L2CAP PSM 1 and re-probe for unresponsiveness",
            &["packetSize", "packetCount", "packetInterval"],
        ),
        AttackKind::Exfiltrate => (
            "Pull phonebook, calendar and folder listing over OBEX",
            &["extractContacts", "extractCalendar", "outputDir"],
        ),
        AttackKind::Message => (
            "Push a text message as a contact card over OBEX",
            &["defaultMessage"],
        ),
        AttackKind::Inject => (
            "Inject a signaling frame on SDP, RFCOMM, AVDTP and AVCTP PSMs",
            &["payloadType", "payload"],
        ),
        AttackKind::SdpOverflow => (
            "Send an oversized SDP search and check the server survived",
            &["overflowSize"],
        ),
        AttackKind::PinRecovery => (
            "Try candidate PINs through the pairing agent",
            &["attempts", "delay", "pinMode", "pins"],
        ),
        AttackKind::AtCommand => (
            "Find a serial channel that answers AT commands and query the modem",
            &["defaultCommand", "delay"],
        ),
    };
    AttackDescriptor {
        kind,
        name: kind.classic_name(),
        summary,
        options,
    }
}

pub fn catalog() -> Vec<AttackDescriptor> {
    AttackKind::ALL.into_iter().map(describe).collect()
}
