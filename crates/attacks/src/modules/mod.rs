mod at_command;
mod exfiltrate;
mod flood;
mod inject;
mod message;
mod pin_recovery;
mod sdp_overflow;
mod vuln_sweep;
mod weak_key;

pub use at_command::AtCommand;
pub use exfiltrate::Exfiltrate;
pub use flood::Flood;
pub use inject::Inject;
pub use message::Message;
pub use pin_recovery::PinRecovery;
pub use sdp_overflow::SdpOverflow;
pub use vuln_sweep::VulnSweep;
pub use weak_key::WeakKey;
