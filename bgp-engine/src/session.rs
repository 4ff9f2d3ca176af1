use std::net::SocketAddr;

use bgp_wire::OpenPacket;

use crate::engine::ConnId;
use crate::timer::Config;

/// The two connection roles a session may hold while an outbound connect
/// and an inbound accept race. Primary is the survivor's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordinal {
    Primary = 0,
    Secondary = 1,
}

impl Ordinal {
    pub fn sibling(self) -> Self {
        match self {
            Ordinal::Primary => Ordinal::Secondary,
            Ordinal::Secondary => Ordinal::Primary,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn tag(self) -> &'static str {
        match self {
            Ordinal::Primary => "(primary)",
            Ordinal::Secondary => "(secondary)",
        }
    }
}

/// Peer session state shared between the control engine and the I/O engine.
/// Always accessed under its mutex; the connection side holds a non-owning
/// back-reference and the session holds connection ids, not the objects.
#[derive(Debug)]
pub struct Session {
    pub connections: [Option<ConnId>; 2],
    pub host: String,
    pub hold_timer_interval: u16,
    pub keepalive_timer_interval: u16,
    /// Local and remote endpoints; carried up from the surviving connection
    /// at promotion.
    pub su_local: Option<SocketAddr>,
    pub su_remote: Option<SocketAddr>,
    /// OPEN received on the surviving connection, moved here at promotion.
    pub open_recv: Option<OpenPacket>,
    /// Whether further inbound connections from this peer are welcome.
    pub accept: bool,
}

impl Session {
    pub fn new(host: &str, config: &Config) -> Self {
        Self {
            connections: [None, None],
            host: host.to_string(),
            hold_timer_interval: config.hold_time(),
            keepalive_timer_interval: config.keepalive_time(),
            su_local: None,
            su_remote: None,
            open_recv: None,
            accept: true,
        }
    }
}
