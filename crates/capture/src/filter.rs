//! Emission filter over protocol tag and direction.

use bluefang_common::{CaptureConfig, CapturedPacket, Direction, ProtocolTag};

/// Empty criteria match everything. The filter only decides which packets
/// reach observers; the buffer keeps every packet either way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketFilter {
    types: Vec<ProtocolTag>,
    direction: Option<Direction>,
}

impl PacketFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            types: config.filter_types.clone(),
            direction: config.filter_direction,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = ProtocolTag>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_direction(mut self, direction: Option<Direction>) -> Self {
        self.direction = direction;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.direction.is_none()
    }

    pub fn matches(&self, packet: &CapturedPacket) -> bool {
        let type_ok = self.types.is_empty() || self.types.contains(&packet.protocol);
        let direction_ok = self.direction.map_or(true, |d| d == packet.direction);
        type_ok && direction_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn packet(protocol: ProtocolTag, direction: Direction) -> CapturedPacket {
        CapturedPacket {
            timestamp: Utc::now(),
            timestamp_from_trace: false,
            protocol,
            direction,
            source: protocol.as_str().into(),
            destination: protocol.as_str().into(),
            payload: Vec::new(),
            raw_line: String::new(),
        }
    }

    #[test]
    fn empty_filter_matches_all() {
        let f = PacketFilter::new();
        assert!(f.is_empty());
        assert!(f.matches(&packet(ProtocolTag::Unknown, Direction::Unknown)));
    }

    #[test]
    fn type_and_direction_both_apply() {
        let f = PacketFilter::new()
            .with_types([ProtocolTag::L2cap, ProtocolTag::Sdp])
            .with_direction(Some(Direction::Out));
        assert!(f.matches(&packet(ProtocolTag::Sdp, Direction::Out)));
        assert!(!f.matches(&packet(ProtocolTag::Sdp, Direction::In)));
        assert!(!f.matches(&packet(ProtocolTag::Hci, Direction::Out)));
    }

    #[test]
    fn built_from_config() {
        let config = CaptureConfig::from_options([("filterTypes", r#"["RFCOMM"]"#)]).unwrap();
        let f = PacketFilter::from_config(&config);
        assert!(f.matches(&packet(ProtocolTag::Rfcomm, Direction::In)));
        assert!(!f.matches(&packet(ProtocolTag::Obex, Direction::In)));
    }
}
