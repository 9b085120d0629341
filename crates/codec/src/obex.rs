//! OBEX requests and responses.
//!
//! Packet: `opcode:u8 | total_len:u16be | [connect fields] | headers`.
//! Header encoding is selected by the top two bits of the header id:
//! Unicode and byte-sequence headers carry a `u16be` length that includes
//! the 3-byte id+length prefix; 1-byte and 4-byte headers have no length.

use crate::error::{need, CodecError, CodecResult};

pub mod opcode {
    pub const PUT: u8 = 0x02;
    pub const GET: u8 = 0x03;
    pub const CONNECT: u8 = 0x80;
    pub const DISCONNECT: u8 = 0x81;
    pub const PUT_FINAL: u8 = 0x82;
    pub const GET_FINAL: u8 = 0x83;
    pub const ABORT: u8 = 0xFF;
}

pub mod response {
    pub const CONTINUE: u8 = 0x90;
    pub const SUCCESS: u8 = 0xA0;
    pub const BAD_REQUEST: u8 = 0xC0;
    pub const UNAUTHORIZED: u8 = 0xC1;
    pub const FORBIDDEN: u8 = 0xC3;
    pub const NOT_FOUND: u8 = 0xC4;
}

pub mod header_id {
    pub const NAME: u8 = 0x01;
    pub const TYPE: u8 = 0x42;
    pub const TARGET: u8 = 0x46;
    pub const BODY: u8 = 0x48;
    pub const END_OF_BODY: u8 = 0x49;
    pub const LENGTH: u8 = 0xC3;
    pub const CONNECTION_ID: u8 = 0xCB;
}

pub const VERSION: u8 = 0x10;
pub const DEFAULT_MAX_PACKET: u16 = 0x1000;

/// Object types requested from phone-book and folder services.
pub const TYPE_FOLDER_LISTING: &str = "x-obex/folder-listing";
pub const TYPE_VCARD: &str = "text/x-vcard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    /// Null-terminated UTF-16BE text.
    Unicode(u8, String),
    Bytes(u8, Vec<u8>),
    Byte(u8, u8),
    U32(u8, u32),
}

impl Header {
    #[inline]
    pub fn name(name: &str) -> Self {
        Header::Unicode(header_id::NAME, name.to_string())
    }

    /// Type headers are null-terminated ASCII byte sequences.
    pub fn mime_type(mime: &str) -> Self {
        let mut bytes = mime.as_bytes().to_vec();
        bytes.push(0);
        Header::Bytes(header_id::TYPE, bytes)
    }

    #[inline]
    pub fn target(target: &[u8]) -> Self {
        Header::Bytes(header_id::TARGET, target.to_vec())
    }

    #[inline]
    pub fn body(data: &[u8]) -> Self {
        Header::Bytes(header_id::BODY, data.to_vec())
    }

    #[inline]
    pub fn end_of_body(data: &[u8]) -> Self {
        Header::Bytes(header_id::END_OF_BODY, data.to_vec())
    }

    #[inline]
    pub fn length(len: u32) -> Self {
        Header::U32(header_id::LENGTH, len)
    }

    pub const fn id(&self) -> u8 {
        match self {
            Header::Unicode(id, _)
            | Header::Bytes(id, _)
            | Header::Byte(id, _)
            | Header::U32(id, _) => *id,
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Header::Unicode(id, text) => {
                let mut units: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
                units.extend_from_slice(&[0, 0]);
                push_prefixed(buf, *id, &units);
            }
            Header::Bytes(id, bytes) => push_prefixed(buf, *id, bytes),
            Header::Byte(id, v) => {
                buf.push(*id);
                buf.push(*v);
            }
            Header::U32(id, v) => {
                buf.push(*id);
                buf.extend_from_slice(&v.to_be_bytes());
            }
        }
    }
}

fn push_prefixed(buf: &mut Vec<u8>, id: u8, value: &[u8]) {
    buf.push(id);
    buf.extend_from_slice(&((value.len() + 3) as u16).to_be_bytes());
    buf.extend_from_slice(value);
}

/// Parse one header at the start of `buf`, returning it and its encoded size.
pub fn decode_header(buf: &[u8]) -> CodecResult<(Header, usize)> {
    need(buf, 1)?;
    let id = buf[0];
    match id >> 6 {
        0b00 | 0b01 => {
            need(buf, 3)?;
            let len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
            if len < 3 {
                return Err(CodecError::MalformedHeader(id));
            }
            need(buf, len)?;
            let value = &buf[3..len];
            let header = if id >> 6 == 0 {
                let units: Vec<u16> = value
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .take_while(|&u| u != 0)
                    .collect();
                Header::Unicode(id, String::from_utf16_lossy(&units))
            } else {
                Header::Bytes(id, value.to_vec())
            };
            Ok((header, len))
        }
        0b10 => {
            need(buf, 2)?;
            Ok((Header::Byte(id, buf[1]), 2))
        }
        _ => {
            need(buf, 5)?;
            Ok((
                Header::U32(id, u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]])),
                5,
            ))
        }
    }
}

pub fn decode_headers(mut buf: &[u8]) -> CodecResult<Vec<Header>> {
    let mut headers = Vec::new();
    while !buf.is_empty() {
        let (header, used) = decode_header(buf)?;
        headers.push(header);
        buf = &buf[used..];
    }
    Ok(headers)
}

/// Assemble a packet; the total length field is filled in last.
pub fn encode_packet(opcode: u8, fields: &[u8], headers: &[Header]) -> Vec<u8> {
    let mut buf = vec![opcode, 0, 0];
    buf.extend_from_slice(fields);
    for h in headers {
        h.encode_into(&mut buf);
    }
    let total = buf.len() as u16;
    buf[1..3].copy_from_slice(&total.to_be_bytes());
    buf
}

/// CONNECT with version 1.0, no flags, and the given maximum packet length.
pub fn connect(max_packet: u16, headers: &[Header]) -> Vec<u8> {
    let mut fields = vec![VERSION, 0x00];
    fields.extend_from_slice(&max_packet.to_be_bytes());
    encode_packet(opcode::CONNECT, &fields, headers)
}

pub fn disconnect() -> Vec<u8> {
    encode_packet(opcode::DISCONNECT, &[], &[])
}

/// Final GET for `name`, optionally typed.
pub fn get(name: &str, mime: Option<&str>) -> Vec<u8> {
    let mut headers = Vec::with_capacity(2);
    if !name.is_empty() {
        headers.push(Header::name(name));
    }
    if let Some(mime) = mime {
        headers.push(Header::mime_type(mime));
    }
    encode_packet(opcode::GET_FINAL, &[], &headers)
}

/// Single-packet final PUT of `body` under `name`.
pub fn put(name: &str, body: &[u8]) -> Vec<u8> {
    encode_packet(
        opcode::PUT_FINAL,
        &[],
        &[
            Header::name(name),
            Header::length(body.len() as u32),
            Header::end_of_body(body),
        ],
    )
}

/// Parsed response packet. Body and end-of-body headers are concatenated
/// into `body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u8,
    pub length: u16,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Response {
    /// Success or continue, ignoring the final bit.
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self.code | 0x80, response::SUCCESS | response::CONTINUE)
    }
}

/// Parse a response. `to_connect` skips the version/flags/max-length
/// fields that only a CONNECT response carries.
pub fn decode_response(buf: &[u8], to_connect: bool) -> CodecResult<Response> {
    need(buf, 3)?;
    let code = buf[0];
    let length = u16::from_be_bytes([buf[1], buf[2]]);
    let end = (length as usize).clamp(3, buf.len());
    let mut rest = &buf[3..end];
    if to_connect {
        need(rest, 4)?;
        rest = &rest[4..];
    }
    let headers = decode_headers(rest)?;
    let body = headers
        .iter()
        .filter_map(|h| match h {
            Header::Bytes(header_id::BODY | header_id::END_OF_BODY, data) => Some(data.as_slice()),
            _ => None,
        })
        .flatten()
        .copied()
        .collect();
    Ok(Response {
        code,
        length,
        headers,
        body,
    })
}
