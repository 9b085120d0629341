use bluefang_common::BlueError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame too short: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("unexpected opcode 0x{0:02x}")]
    UnexpectedOpcode(u8),

    #[error("malformed header 0x{0:02x}")]
    MalformedHeader(u8),
}

impl From<CodecError> for BlueError {
    fn from(err: CodecError) -> Self {
        BlueError::Protocol(err.to_string())
    }
}

pub type CodecResult<T> = Result<T, CodecError>;

#[inline]
pub(crate) fn need(buf: &[u8], n: usize) -> CodecResult<()> {
    if buf.len() < n {
        Err(CodecError::Truncated {
            need: n,
            have: buf.len(),
        })
    } else {
        Ok(())
    }
}
