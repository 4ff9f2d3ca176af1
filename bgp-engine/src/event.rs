use bytes::BytesMut;

use bgp_wire::{BgpType, HeaderError};

use crate::engine::{ConnId, Engine};

/// Events the connection core raises toward the FSM.
#[derive(Debug, Clone, PartialEq)]
pub enum FsmEvent {
    /// Socket read or write failed; errno 0 means EOF on read.
    IoError { errno: i32 },
    /// Message header failed the marker/length/type checks.
    HeaderError(HeaderError),
    /// One complete framed message, header included.
    Message { typ: BgpType, msg: BytesMut },
    /// The staged NOTIFICATION has fully left the write buffers.
    SentNotification,
    HoldTimerExpires,
    KeepaliveTimerExpires,
}

/// Outcome of pushing a message down the write pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Written through to the socket; obuf and the ring are both empty.
    Done,
    /// Parked in the staging ring; obuf is empty again.
    Buffered,
    /// I/O error; an `IoError` event has been raised.
    Failed,
}

/// The consumer-side FSM. `Engine::dispatch` and the ready queue deliver
/// events here; the FSM calls back into the engine (`send`, `close`,
/// `part_close`, `make_primary`, ...) to drive the connection.
pub trait BgpFsm {
    fn event(&mut self, engine: &mut Engine, id: ConnId, event: FsmEvent);
}
