use std::fmt::Display;

use bytes::{BufMut, BytesMut};
use nom::Parser;
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::be_u8;
use nom::IResult;

use crate::{BGP_HEADER_LEN, BgpHeader, BgpType};

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NotifyCode {
    MsgHeaderError = 1,
    OpenMsgError = 2,
    UpdateMsgError = 3,
    HoldTimerExpired = 4,
    FsmError = 5,
    Cease = 6,
    RouteRefreshError = 7,
    Unknown(u8),
}

impl From<NotifyCode> for u8 {
    fn from(code: NotifyCode) -> Self {
        use NotifyCode::*;
        match code {
            MsgHeaderError => 1,
            OpenMsgError => 2,
            UpdateMsgError => 3,
            HoldTimerExpired => 4,
            FsmError => 5,
            Cease => 6,
            RouteRefreshError => 7,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for NotifyCode {
    fn from(code: u8) -> Self {
        use NotifyCode::*;
        match code {
            1 => MsgHeaderError,
            2 => OpenMsgError,
            3 => UpdateMsgError,
            4 => HoldTimerExpired,
            5 => FsmError,
            6 => Cease,
            7 => RouteRefreshError,
            v => Unknown(v),
        }
    }
}

impl Display for NotifyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use NotifyCode::*;
        match self {
            MsgHeaderError => write!(f, "MsgHeaderError"),
            OpenMsgError => write!(f, "OpenMsgError"),
            UpdateMsgError => write!(f, "UpdateMsgError"),
            HoldTimerExpired => write!(f, "HoldTimerExpired"),
            FsmError => write!(f, "FsmError"),
            Cease => write!(f, "Cease"),
            RouteRefreshError => write!(f, "RouteRefreshError"),
            Unknown(v) => write!(f, "Unknown {}", v),
        }
    }
}

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CeaseSubcode {
    MaximumNumberOfPrefixReached = 1,  // RFC4486
    AdministrativeShutdown = 2,        // RFC4486|RFC9003
    PeerDeConfigured = 3,              // RFC4486
    AdministrativeReset = 4,           // RFC4486|RFC9003
    ConnectionRejected = 5,            // RFC4486
    OtherConfigChange = 6,             // RFC4486
    ConnectionCollisionResolution = 7, // RFC4486
    OutOfResources = 8,                // RFC4486
    Unknown(u8),
}

impl From<CeaseSubcode> for u8 {
    fn from(sub_code: CeaseSubcode) -> Self {
        use CeaseSubcode::*;
        match sub_code {
            MaximumNumberOfPrefixReached => 1,
            AdministrativeShutdown => 2,
            PeerDeConfigured => 3,
            AdministrativeReset => 4,
            ConnectionRejected => 5,
            OtherConfigChange => 6,
            ConnectionCollisionResolution => 7,
            OutOfResources => 8,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for CeaseSubcode {
    fn from(sub_code: u8) -> Self {
        use CeaseSubcode::*;
        match sub_code {
            1 => MaximumNumberOfPrefixReached,
            2 => AdministrativeShutdown,
            3 => PeerDeConfigured,
            4 => AdministrativeReset,
            5 => ConnectionRejected,
            6 => OtherConfigChange,
            7 => ConnectionCollisionResolution,
            8 => OutOfResources,
            v => Unknown(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPacket {
    pub code: NotifyCode,
    pub sub_code: u8,
    pub data: Vec<u8>,
}

impl NotificationPacket {
    pub fn new(code: NotifyCode, sub_code: u8, data: Vec<u8>) -> Self {
        Self {
            code,
            sub_code,
            data,
        }
    }

    pub fn cease(sub_code: CeaseSubcode) -> Self {
        Self::new(NotifyCode::Cease, sub_code.into(), Vec::new())
    }

    /// Parse a complete NOTIFICATION message, header included.
    pub fn parse_packet(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = BgpHeader::parse_be(input)?;
        if header.typ != BgpType::Notification || header.length < BGP_HEADER_LEN + 2 {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Verify)));
        }
        let (input, code) = be_u8(input)?;
        let (input, sub_code) = be_u8(input)?;
        let len = header.length - BGP_HEADER_LEN - 2;
        let (input, data) = take(len as usize).parse(input)?;
        Ok((
            input,
            Self {
                code: code.into(),
                sub_code,
                data: data.to_vec(),
            },
        ))
    }
}

impl Display for NotificationPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.code, self.sub_code)
    }
}

impl From<NotificationPacket> for BytesMut {
    fn from(notification: NotificationPacket) -> Self {
        let mut buf = BytesMut::new();
        let header: BytesMut = BgpHeader::new(BgpType::Notification, BGP_HEADER_LEN).into();
        buf.put(&header[..]);
        buf.put_u8(notification.code.into());
        buf.put_u8(notification.sub_code);
        buf.put(&notification.data[..]);

        const LENGTH_POS: std::ops::Range<usize> = 16..18;
        let length: u16 = buf.len() as u16;
        buf[LENGTH_POS].copy_from_slice(&length.to_be_bytes());

        buf
    }
}
