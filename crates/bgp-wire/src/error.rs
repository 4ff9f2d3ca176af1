use thiserror::Error;

/// Message header check failure (RFC 4271 section 6.1).
///
/// Each variant maps onto a Message Header Error subcode, and carries the
/// data octets a NOTIFICATION for that subcode is required to echo back.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    #[error("connection not synchronised: bad marker")]
    NotSynced,

    #[error("bad message length: {0}")]
    BadLength(u16),

    #[error("bad message type: {0}")]
    BadType(u8),
}

impl HeaderError {
    pub fn sub_code(&self) -> u8 {
        use HeaderError::*;
        match self {
            NotSynced => 1,
            BadLength(_) => 2,
            BadType(_) => 3,
        }
    }

    pub fn data(&self) -> Vec<u8> {
        use HeaderError::*;
        match self {
            NotSynced => Vec::new(),
            BadLength(length) => length.to_be_bytes().to_vec(),
            BadType(typ) => vec![*typ],
        }
    }
}
