use std::net::Ipv4Addr;

use bytes::BytesMut;
use hex_literal::hex;

use bgp_wire::*;

const KEEPALIVE: &[u8] = &hex!(
    "
ff ff ff ff ff ff ff ff ff ff ff ff ff ff ff ff
00 13 04
"
);

#[test]
fn validate_keepalive() {
    let (typ, body) = BgpHeader::validate(KEEPALIVE).unwrap();
    assert_eq!(typ, BgpType::Keepalive);
    assert_eq!(body, 0);
}

#[test]
fn keepalive_encode() {
    let buf: BytesMut = BgpHeader::keepalive().into();
    assert_eq!(&buf[..], KEEPALIVE);
}

#[test]
fn validate_bad_marker() {
    let mut buf = KEEPALIVE.to_vec();
    buf[3] = 0x00;
    let err = BgpHeader::validate(&buf).unwrap_err();
    assert_eq!(err, HeaderError::NotSynced);
    assert_eq!(err.sub_code(), 1);
    assert!(err.data().is_empty());
}

#[test]
fn validate_bad_length() {
    let mut buf = KEEPALIVE.to_vec();
    buf[16] = 0xff;
    buf[17] = 0xff;
    let err = BgpHeader::validate(&buf).unwrap_err();
    assert_eq!(err, HeaderError::BadLength(0xffff));
    assert_eq!(err.sub_code(), 2);
    assert_eq!(err.data(), vec![0xff, 0xff]);

    // Shorter than a bare header is just as bad.
    buf[16] = 0x00;
    buf[17] = 0x12;
    let err = BgpHeader::validate(&buf).unwrap_err();
    assert_eq!(err, HeaderError::BadLength(0x12));
}

#[test]
fn validate_bad_type() {
    let mut buf = KEEPALIVE.to_vec();
    buf[18] = 9;
    let err = BgpHeader::validate(&buf).unwrap_err();
    assert_eq!(err, HeaderError::BadType(9));
    assert_eq!(err.sub_code(), 3);
    assert_eq!(err.data(), vec![9]);
}

#[test]
fn peek_length_reads_header_field() {
    assert_eq!(peek_bgp_length(KEEPALIVE), 19);
    assert_eq!(peek_bgp_length(&KEEPALIVE[..10]), 0);
}

#[test]
fn open_round_trip() {
    let open = OpenPacket::new(65001, 90, &Ipv4Addr::new(10, 0, 0, 1));
    let buf: BytesMut = open.clone().into();

    let (typ, body) = BgpHeader::validate(&buf).unwrap();
    assert_eq!(typ, BgpType::Open);
    assert_eq!(body, 10);

    let (rest, parsed) = OpenPacket::parse_packet(&buf).unwrap();
    assert!(rest.is_empty());
    assert_eq!(parsed, open);
    assert_eq!(parsed.router_id(), Ipv4Addr::new(10, 0, 0, 1));
}

#[test]
fn notification_round_trip() {
    let notification = NotificationPacket::new(NotifyCode::MsgHeaderError, 2, vec![0xff, 0xff]);
    let buf: BytesMut = notification.clone().into();

    assert_eq!(peek_bgp_length(&buf), buf.len());
    let (typ, body) = BgpHeader::validate(&buf).unwrap();
    assert_eq!(typ, BgpType::Notification);
    assert_eq!(body, 4);

    let (rest, parsed) = NotificationPacket::parse_packet(&buf).unwrap();
    assert!(rest.is_empty());
    assert_eq!(parsed, notification);
}

#[test]
fn notification_cease_collision() {
    let notification = NotificationPacket::cease(CeaseSubcode::ConnectionCollisionResolution);
    assert_eq!(notification.code, NotifyCode::Cease);
    assert_eq!(notification.sub_code, 7);

    let buf: BytesMut = notification.into();
    const PACKET: &[u8] = &hex!(
        "
ff ff ff ff ff ff ff ff ff ff ff ff ff ff ff ff
00 15 03 06 07
"
    );
    assert_eq!(&buf[..], PACKET);
}
