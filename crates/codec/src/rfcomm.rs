//! RFCOMM frames: `address:u8 | control:u8 | length:u8 | payload`.
//!
//! The length field is a single byte; payloads longer than 255 bytes are
//! sent with the low byte of their length.

use crate::error::{need, CodecResult};

pub const HEADER_LEN: usize = 3;

/// Control field values (P/F bit set where the frame type requires it).
pub mod control {
    pub const SABM: u8 = 0x3F;
    pub const UA: u8 = 0x73;
    pub const DM: u8 = 0x1F;
    pub const DISC: u8 = 0x53;
    pub const UIH: u8 = 0xEF;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub address: u8,
    pub control: u8,
    pub length: u8,
}

/// Address byte for `dlci` with the EA bit set.
#[inline]
#[must_use]
pub const fn address(dlci: u8, command: bool) -> u8 {
    (dlci << 2) | ((command as u8) << 1) | 0x01
}

pub fn encode(address: u8, control: u8, payload: &[u8]) -> Vec<u8> {
    encode_with_length(address, control, payload.len() as u8, payload)
}

pub fn encode_with_length(address: u8, control: u8, length: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push(address);
    buf.push(control);
    buf.push(length);
    buf.extend_from_slice(payload);
    buf
}

pub fn decode_header(buf: &[u8]) -> CodecResult<(Header, &[u8])> {
    need(buf, HEADER_LEN)?;
    Ok((
        Header {
            address: buf[0],
            control: buf[1],
            length: buf[2],
        },
        &buf[HEADER_LEN..],
    ))
}

/// Frame with a bare address byte, empty control and length, and 256 bytes of junk.
pub fn malformed_frame() -> Vec<u8> {
    encode_with_length(0x02, 0x00, 0x00, &[b'C'; 256])
}
