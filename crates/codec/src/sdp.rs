//! SDP PDUs: `pdu:u8 | tid:u16be | param_len:u16be | params`.

use crate::error::{need, CodecResult};

pub const HEADER_LEN: usize = 5;

pub mod pdu {
    pub const ERROR_RESPONSE: u8 = 0x01;
    pub const SERVICE_SEARCH_REQUEST: u8 = 0x02;
    pub const SERVICE_SEARCH_RESPONSE: u8 = 0x03;
    pub const SERVICE_ATTRIBUTE_REQUEST: u8 = 0x04;
    pub const SERVICE_ATTRIBUTE_RESPONSE: u8 = 0x05;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub pdu: u8,
    pub transaction_id: u16,
    pub param_len: u16,
}

pub fn encode(pdu: u8, transaction_id: u16, params: &[u8]) -> Vec<u8> {
    encode_with_length(pdu, transaction_id, params.len() as u16, params)
}

/// PDU with an arbitrary parameter-length field.
pub fn encode_with_length(pdu: u8, transaction_id: u16, param_len: u16, params: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_LEN + params.len()];
    buf[0] = pdu;
    buf[1..3].copy_from_slice(&transaction_id.to_be_bytes());
    buf[3..5].copy_from_slice(&param_len.to_be_bytes());
    buf[HEADER_LEN..].copy_from_slice(params);
    buf
}

pub fn decode_header(buf: &[u8]) -> CodecResult<(Header, &[u8])> {
    need(buf, HEADER_LEN)?;
    let header = Header {
        pdu: buf[0],
        transaction_id: u16::from_be_bytes([buf[1], buf[2]]),
        param_len: u16::from_be_bytes([buf[3], buf[4]]),
    };
    Ok((header, &buf[HEADER_LEN..]))
}

/// Minimal well-formed search request used to check that the server still answers.
pub fn probe_request() -> Vec<u8> {
    encode_with_length(pdu::SERVICE_SEARCH_REQUEST, 0x0001, 0, &[0x00, 0x01])
}

/// Search request carrying an oversized parameter block. The transaction id
/// echoes the payload length plus four.
pub fn oversized_search(params: &[u8]) -> Vec<u8> {
    let tid = (params.len() + 4) as u16;
    encode(pdu::SERVICE_SEARCH_REQUEST, tid, params)
}

/// Error-response PDU with zeroed header fields and 1 KiB of filler.
pub fn malformed_pdu() -> Vec<u8> {
    encode_with_length(pdu::ERROR_RESPONSE, 0, 0, &[b'A'; 1024])
}
