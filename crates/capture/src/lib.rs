//! Bluefang Capture - link-trace capture pipeline
//!
//! Trace lines from the capture collaborator are parsed into
//! [`CapturedPacket`](bluefang_common::CapturedPacket)s, kept in a bounded
//! FIFO buffer and, when they pass the active filter, forwarded to
//! observers. The buffer exports to a PCAP file or to plain text.

mod buffer;
mod filter;
mod parser;
mod pcap;
mod pipeline;
mod stats;

pub use buffer::PacketBuffer;
pub use filter::PacketFilter;
pub use parser::{endpoint, parse_line};
pub use pcap::{write_pcap, PcapWriter, LINKTYPE, MAGIC};
pub use pipeline::CapturePipeline;
pub use stats::{CaptureStats, CaptureSummary};
