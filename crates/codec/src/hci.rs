//! HCI command packets: `0x01 | opcode:u16le | param_len:u8 | params`.

use crate::error::{need, CodecError, CodecResult};

pub const PACKET_COMMAND: u8 = 0x01;
pub const HEADER_LEN: usize = 4;

pub const OGF_LINK_CONTROL: u16 = 0x01;
pub const OGF_VENDOR: u16 = 0x3F;

#[inline]
#[must_use]
pub const fn opcode(ogf: u16, ocf: u16) -> u16 {
    (ogf << 10) | (ocf & 0x03FF)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub ogf: u16,
    pub ocf: u16,
    pub params: Vec<u8>,
}

/// Parameters longer than 255 bytes are truncated.
pub fn encode_command(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let params = &params[..params.len().min(u8::MAX as usize)];
    let mut buf = vec![0u8; HEADER_LEN + params.len()];
    buf[0] = PACKET_COMMAND;
    buf[1..3].copy_from_slice(&opcode(ogf, ocf).to_le_bytes());
    buf[3] = params.len() as u8;
    buf[HEADER_LEN..].copy_from_slice(params);
    buf
}

pub fn decode_command(buf: &[u8]) -> CodecResult<Command> {
    need(buf, HEADER_LEN)?;
    if buf[0] != PACKET_COMMAND {
        return Err(CodecError::UnexpectedOpcode(buf[0]));
    }
    let op = u16::from_le_bytes([buf[1], buf[2]]);
    let len = buf[3] as usize;
    need(buf, HEADER_LEN + len)?;
    Ok(Command {
        ogf: op >> 10,
        ocf: op & 0x03FF,
        params: buf[HEADER_LEN..HEADER_LEN + len].to_vec(),
    })
}

/// Vendor command asking the controller to accept an encryption key of
/// `key_size` bytes.
pub fn key_size_request(key_size: u8) -> Vec<u8> {
    encode_command(OGF_VENDOR, 0x0001, &[key_size])
}
