//! Trace line to packet.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use bluefang_codec::trace::{classify, direction_of, extract_hex, find_timestamp};
use bluefang_common::{CapturedPacket, ProtocolTag};

static L2CAP_CID: Lazy<Regex> = Lazy::new(|| Regex::new(r"CID: (\w+)").expect("static regex"));
static RFCOMM_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"Port: (\d+)").expect("static regex"));

/// Endpoint label for a line: `L2CAP:<cid>`, `RFCOMM:<port>`, or the bare
/// protocol tag.
pub fn endpoint(line: &str, tag: ProtocolTag) -> String {
    let field = |re: &Regex| {
        re.captures(line)
            .and_then(|c| c.get(1))
            .map_or("Unknown", |m| m.as_str())
            .to_string()
    };
    match tag {
        ProtocolTag::L2cap => format!("L2CAP:{}", field(&L2CAP_CID)),
        ProtocolTag::Rfcomm => format!("RFCOMM:{}", field(&RFCOMM_PORT)),
        other => other.as_str().to_string(),
    }
}

/// Parse one trace line. Blank lines yield `None`; anything else yields a
/// packet, with `Unknown` protocol and direction when nothing matched.
/// Trace timestamps carry only a time of day and are placed on `now`'s date.
pub fn parse_line(line: &str, now: DateTime<Utc>) -> Option<CapturedPacket> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let protocol = classify(line);
    let (timestamp, timestamp_from_trace) = match find_timestamp(line).and_then(|t| on_date(t, now)) {
        Some(ts) => (ts, true),
        None => (now, false),
    };
    let ep = endpoint(line, protocol);
    Some(CapturedPacket {
        timestamp,
        timestamp_from_trace,
        protocol,
        direction: direction_of(line, protocol),
        source: ep.clone(),
        destination: ep,
        payload: extract_hex(line),
        raw_line: line.to_string(),
    })
}

fn on_date(token: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(token, "%H:%M:%S%.f").ok()?;
    Some(Utc.from_utc_datetime(&now.date_naive().and_time(time)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluefang_common::Direction;
    use chrono::Timelike;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn parses_l2cap_line() {
        let p = parse_line("12:34:56.000250 > L2CAP: CID: 0x0040 len 4 01 02 0a ff", now()).unwrap();
        assert_eq!(p.protocol, ProtocolTag::L2cap);
        assert_eq!(p.direction, Direction::Out);
        assert_eq!(p.source, "L2CAP:0x0040");
        assert_eq!(p.destination, p.source);
        assert_eq!(p.payload, vec![0x01, 0x02, 0x0a, 0xff]);
        assert!(p.timestamp_from_trace);
        assert_eq!(p.timestamp.hour(), 12);
        assert_eq!(p.timestamp.nanosecond(), 250_000);
        assert_eq!(p.timestamp.date_naive(), now().date_naive());
    }

    #[test]
    fn rfcomm_port_and_inbound() {
        let p = parse_line("< RFCOMM: UIH Port: 3 41 54", now()).unwrap();
        assert_eq!(p.direction, Direction::In);
        assert_eq!(p.source, "RFCOMM:3");
        assert!(!p.timestamp_from_trace);
        assert_eq!(p.timestamp, now());
    }

    #[test]
    fn unknown_lines_still_parse() {
        let p = parse_line("  something else entirely  ", now()).unwrap();
        assert_eq!(p.protocol, ProtocolTag::Unknown);
        assert_eq!(p.direction, Direction::Unknown);
        assert_eq!(p.source, "UNKNOWN");
        assert_eq!(p.raw_line, "something else entirely");
        assert!(parse_line("   ", now()).is_none());
        assert!(parse_line("", now()).is_none());
    }

    #[test]
    fn endpoint_without_identifier() {
        assert_eq!(endpoint("L2CAP: Connection Request", ProtocolTag::L2cap), "L2CAP:Unknown");
        assert_eq!(endpoint("SDP: Search", ProtocolTag::Sdp), "SDP");
    }
}
