use std::fmt;
use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::Parser;
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::{be_u8, be_u16};

use crate::{BGP_HEADER_LEN, BgpHeader, BgpType};

pub const BGP_VERSION: u8 = 4;

/// OPEN message, with the optional parameters kept as raw octets.
///
/// Capability negotiation is the business of the layer above; the connection
/// core only needs the fixed fields for hold time negotiation and collision
/// resolution, plus the raw parameter block to hand upward.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPacket {
    pub version: u8,
    pub asn: u16,
    pub hold_time: u16,
    pub bgp_id: [u8; 4],
    pub opt_params: Vec<u8>,
}

impl OpenPacket {
    pub fn new(asn: u16, hold_time: u16, router_id: &Ipv4Addr) -> Self {
        Self {
            version: BGP_VERSION,
            asn,
            hold_time,
            bgp_id: router_id.octets(),
            opt_params: Vec::new(),
        }
    }

    pub fn router_id(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.bgp_id[0], self.bgp_id[1], self.bgp_id[2], self.bgp_id[3])
    }

    /// Parse a complete OPEN message, header included.
    pub fn parse_packet(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = BgpHeader::parse_be(input)?;
        if header.typ != BgpType::Open {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Verify)));
        }
        let (input, version) = be_u8(input)?;
        let (input, asn) = be_u16(input)?;
        let (input, hold_time) = be_u16(input)?;
        let (input, bgp_id) = take(4usize).parse(input)?;
        let (input, opt_param_len) = be_u8(input)?;
        let (input, opt_params) = take(opt_param_len as usize).parse(input)?;

        let mut packet = Self {
            version,
            asn,
            hold_time,
            bgp_id: [0u8; 4],
            opt_params: opt_params.to_vec(),
        };
        packet.bgp_id.copy_from_slice(bgp_id);
        Ok((input, packet))
    }
}

impl fmt::Display for OpenPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OPEN asn {} hold {} id {}",
            self.asn,
            self.hold_time,
            self.router_id()
        )
    }
}

impl From<OpenPacket> for BytesMut {
    fn from(open: OpenPacket) -> Self {
        let mut buf = BytesMut::new();
        let header: BytesMut = BgpHeader::new(BgpType::Open, BGP_HEADER_LEN).into();
        buf.put(&header[..]);
        buf.put_u8(open.version);
        buf.put_u16(open.asn);
        buf.put_u16(open.hold_time);
        buf.put(&open.bgp_id[..]);
        buf.put_u8(open.opt_params.len() as u8);
        buf.put(&open.opt_params[..]);

        const LENGTH_POS: std::ops::Range<usize> = 16..18;
        let length: u16 = buf.len() as u16;
        buf[LENGTH_POS].copy_from_slice(&length.to_be_bytes());

        buf
    }
}
