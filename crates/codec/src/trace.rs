//! Heuristic decoding of link-trace text lines.
//!
//! The trace tool's text format is not a stable interface, so classification
//! is substring-driven with an explicit `Unknown` fallback and payload bytes
//! are recovered from whitespace-separated hex pairs.

use bluefang_common::{Direction, ProtocolTag};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

static TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}:\d{2}:\d{2}\.\d{6}").expect("static regex"));
static HEX_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9A-Fa-f]{2}\b").expect("static regex"));

/// Tags probed in priority order; the first token found in the line wins.
const PRIMARY: [ProtocolTag; 5] = [
    ProtocolTag::Hci,
    ProtocolTag::L2cap,
    ProtocolTag::Rfcomm,
    ProtocolTag::Sdp,
    ProtocolTag::Obex,
];
const SECONDARY: [ProtocolTag; 2] = [ProtocolTag::Avdtp, ProtocolTag::Avctp];

/// Protocol tag for a trace line. Never fails.
pub fn classify(line: &str) -> ProtocolTag {
    PRIMARY
        .iter()
        .chain(SECONDARY.iter())
        .copied()
        .find(|tag| line.contains(tag.as_str()))
        .unwrap_or(ProtocolTag::Unknown)
}

/// First `HH:MM:SS.ffffff` token in the line.
pub fn find_timestamp(line: &str) -> Option<&str> {
    TIMESTAMP.find(line).map(|m| m.as_str())
}

/// Standalone two-digit hex tokens, in order. Timestamp digits are ignored.
pub fn extract_hex(line: &str) -> Vec<u8> {
    let stripped = TIMESTAMP.replace_all(line, " ");
    HEX_PAIR
        .find_iter(&stripped)
        .filter_map(|m| u8::from_str_radix(m.as_str(), 16).ok())
        .collect()
}

/// Direction marker adjacent to the protocol token (`> TAG` / `< TAG`).
pub fn direction_of(line: &str, tag: ProtocolTag) -> Direction {
    if tag == ProtocolTag::Unknown {
        return Direction::Unknown;
    }
    if line.contains(&format!("> {}", tag.as_str())) {
        Direction::Out
    } else if line.contains(&format!("< {}", tag.as_str())) {
        Direction::In
    } else {
        Direction::Unknown
    }
}

/// Render bytes as a trace line the classifier understands.
pub fn render_line(timestamp: &str, direction: Direction, tag: ProtocolTag, bytes: &[u8]) -> String {
    let marker = match direction {
        Direction::Out => "> ",
        Direction::In => "< ",
        Direction::Unknown => "",
    };
    let mut line = String::with_capacity(timestamp.len() + 16 + bytes.len() * 3);
    let _ = write!(line, "{} {}{}:", timestamp, marker, tag.as_str());
    for b in bytes {
        let _ = write!(line, " {:02x}", b);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{l2cap, rfcomm, sdp};

    #[test]
    fn classify_by_priority() {
        assert_eq!(classify("> HCI Command: Inquiry"), ProtocolTag::Hci);
        assert_eq!(classify("< L2CAP: Connection Request (SDP)"), ProtocolTag::L2cap);
        assert_eq!(classify("RFCOMM: UIH Port: 3"), ProtocolTag::Rfcomm);
        assert_eq!(classify("SDP: Service Search Request"), ProtocolTag::Sdp);
        assert_eq!(classify("OBEX: Connect"), ProtocolTag::Obex);
        assert_eq!(classify("AVDTP: Discover"), ProtocolTag::Avdtp);
        assert_eq!(classify("AVCTP: Control"), ProtocolTag::Avctp);
        assert_eq!(classify("random noise"), ProtocolTag::Unknown);
    }

    #[test]
    fn hex_extraction_skips_timestamp_and_words() {
        let line = "12:34:56.123456 > L2CAP: CID: 0x0040 data 0a ff 10 zz 1";
        assert_eq!(extract_hex(line), vec![0x0a, 0xff, 0x10]);
        assert_eq!(find_timestamp(line), Some("12:34:56.123456"));
        assert!(extract_hex("no payload here").is_empty());
    }

    #[test]
    fn direction_markers() {
        assert_eq!(direction_of("> L2CAP: x", ProtocolTag::L2cap), Direction::Out);
        assert_eq!(direction_of("< SDP: x", ProtocolTag::Sdp), Direction::In);
        assert_eq!(direction_of("L2CAP: x", ProtocolTag::L2cap), Direction::Unknown);
    }

    #[test]
    fn rendered_frames_keep_length_fields() {
        for len in [0usize, 1, 4, 255, 256, 4096, 65535] {
            let payload = vec![0x11; len];

            let frame = l2cap::encode(l2cap::cid::SIGNALING, &payload);
            let line = render_line("10:00:00.000001", Direction::Out, ProtocolTag::L2cap, &frame);
            assert_eq!(classify(&line), ProtocolTag::L2cap);
            let bytes = extract_hex(&line);
            assert_eq!(l2cap::decode_header(&bytes).unwrap().0.length as usize, len);

            let frame = sdp::encode(sdp::pdu::SERVICE_SEARCH_REQUEST, 1, &payload);
            let line = render_line("10:00:00.000002", Direction::In, ProtocolTag::Sdp, &frame);
            assert_eq!(classify(&line), ProtocolTag::Sdp);
            let bytes = extract_hex(&line);
            assert_eq!(sdp::decode_header(&bytes).unwrap().0.param_len as usize, len);

            let frame = rfcomm::encode(0x03, rfcomm::control::UIH, &payload);
            let line = render_line("10:00:00.000003", Direction::Out, ProtocolTag::Rfcomm, &frame);
            assert_eq!(classify(&line), ProtocolTag::Rfcomm);
            let bytes = extract_hex(&line);
            assert_eq!(rfcomm::decode_header(&bytes).unwrap().0.length, len as u8);
        }
    }
}
