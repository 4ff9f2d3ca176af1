use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::Parser;
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::{be_u8, be_u16};

use crate::HeaderError;

/// Largest BGP message, header included (RFC 4271).
pub const BGP_PACKET_LEN: usize = 4096;
pub const BGP_HEADER_LEN: u16 = 19;
pub const BGP_MARKER: [u8; 16] = [0xffu8; 16];

#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BgpType {
    Open = 1,
    Update = 2,
    Notification = 3,
    Keepalive = 4,
    RouteRefresh = 5,
}

impl From<BgpType> for u8 {
    fn from(typ: BgpType) -> Self {
        use BgpType::*;
        match typ {
            Open => 1,
            Update => 2,
            Notification => 3,
            Keepalive => 4,
            RouteRefresh => 5,
        }
    }
}

impl TryFrom<u8> for BgpType {
    type Error = u8;

    fn try_from(typ: u8) -> Result<Self, u8> {
        use BgpType::*;
        match typ {
            1 => Ok(Open),
            2 => Ok(Update),
            3 => Ok(Notification),
            4 => Ok(Keepalive),
            5 => Ok(RouteRefresh),
            v => Err(v),
        }
    }
}

impl std::fmt::Display for BgpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use BgpType::*;
        match self {
            Open => write!(f, "OPEN"),
            Update => write!(f, "UPDATE"),
            Notification => write!(f, "NOTIFICATION"),
            Keepalive => write!(f, "KEEPALIVE"),
            RouteRefresh => write!(f, "ROUTE-REFRESH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BgpHeader {
    pub marker: [u8; 16],
    pub length: u16,
    pub typ: BgpType,
}

impl BgpHeader {
    pub fn new(typ: BgpType, length: u16) -> Self {
        Self {
            marker: BGP_MARKER,
            length,
            typ,
        }
    }

    pub fn keepalive() -> Self {
        Self::new(BgpType::Keepalive, BGP_HEADER_LEN)
    }

    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, marker) = take(16usize).parse(input)?;
        let (input, length) = be_u16(input)?;
        let (input, typ) = be_u8(input)?;
        let Ok(typ) = BgpType::try_from(typ) else {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Tag)));
        };
        let mut header = Self::new(typ, length);
        header.marker.copy_from_slice(marker);
        Ok((input, header))
    }

    /// Check a raw 19 octet header: marker, length bounds, message type.
    ///
    /// Returns the message type and the number of body octets still to be
    /// read (may be zero, e.g. KEEPALIVE).
    pub fn validate(buf: &[u8]) -> Result<(BgpType, usize), HeaderError> {
        debug_assert!(buf.len() >= BGP_HEADER_LEN as usize);

        if buf[..16] != BGP_MARKER {
            return Err(HeaderError::NotSynced);
        }
        let length = u16::from_be_bytes([buf[16], buf[17]]);
        if length < BGP_HEADER_LEN || usize::from(length) > BGP_PACKET_LEN {
            return Err(HeaderError::BadLength(length));
        }
        let typ = BgpType::try_from(buf[18]).map_err(HeaderError::BadType)?;

        Ok((typ, usize::from(length - BGP_HEADER_LEN)))
    }
}

impl From<BgpHeader> for BytesMut {
    fn from(header: BgpHeader) -> Self {
        let mut buf = BytesMut::new();
        buf.put(&header.marker[..]);
        buf.put_u16(header.length);
        let typ: u8 = header.typ.into();
        buf.put_u8(typ);
        buf
    }
}

/// Total message length from the header's length field, without consuming
/// anything. Returns 0 when fewer than 18 octets are available.
pub fn peek_bgp_length(input: &[u8]) -> usize {
    if let Some(len) = input.get(16..18) {
        u16::from_be_bytes(len.try_into().unwrap()) as usize
    } else {
        0
    }
}
