use std::collections::VecDeque;
use std::net::{Shutdown, SocketAddr};
use std::os::fd::RawFd;
use std::sync::{Arc, Mutex};

use bgp_wire::{BGP_PACKET_LEN, NotificationPacket, OpenPacket};

use crate::buf::{MsgBuf, ReadBuf};
use crate::engine::{ConnId, Ctx};
use crate::event::FsmEvent;
use crate::select::{Mode, Qfile};
use crate::session::{Ordinal, Session};
use crate::sock::SockOps;
use crate::timer::{Qtimer, TimerKind};
use crate::wbuff::WriteBuffer;

/// FSM state as the connection core tracks it. `Initial` precedes the FSM
/// proper; `Stopping` is terminal and makes the connection eligible for
/// reaping by the ready queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmState {
    Initial,
    Idle,
    Connect,
    Active,
    OpenSent,
    OpenConfirm,
    Established,
    Stopping,
}

impl FsmState {
    pub fn to_str(&self) -> &str {
        match self {
            Self::Initial => "Initial",
            Self::Idle => "Idle",
            Self::Connect => "Connect",
            Self::Active => "Active",
            Self::OpenSent => "OpenSent",
            Self::OpenConfirm => "OpenConfirm",
            Self::Established => "Established",
            Self::Stopping => "Stopping",
        }
    }

    pub fn is_stopping(&self) -> bool {
        *self == Self::Stopping
    }
}

/// Why the connection was stopped, once it has been.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stopped {
    Not,
    Admin,
    Collision,
    Error,
}

impl Stopped {
    pub fn is_stopped(&self) -> bool {
        *self != Stopped::Not
    }
}

/// One TCP connection of a peer session.
///
/// Private to the I/O engine: nothing here takes a lock except the
/// operations that reach across to the shared session (open, promotion,
/// sibling lookup). A session owns up to two of these during a collision;
/// exactly one survives.
#[derive(Debug)]
pub struct Connection {
    pub(crate) session: Option<Arc<Mutex<Session>>>,
    pub(crate) ordinal: Ordinal,
    pub(crate) accepted: bool,
    pub(crate) state: FsmState,
    pub(crate) post: Option<FsmEvent>,
    pub(crate) fsm_active: bool,
    pub(crate) stopped: Stopped,
    pub(crate) qfile: Qfile,
    pub(crate) sock: Option<Box<dyn SockOps>>,
    pub(crate) hold_timer: Qtimer,
    pub(crate) keepalive_timer: Qtimer,
    pub(crate) hold_timer_interval: u16,
    pub(crate) keepalive_timer_interval: u16,
    pub(crate) ibuf: ReadBuf,
    pub(crate) obuf: MsgBuf,
    pub(crate) wbuff: WriteBuffer,
    pub(crate) notification: Option<NotificationPacket>,
    pub(crate) notification_pending: bool,
    pub(crate) open_recv: Option<OpenPacket>,
    pub(crate) su_local: Option<SocketAddr>,
    pub(crate) su_remote: Option<SocketAddr>,
    /// Owned copy of the session host plus ordinal tag, so log lines keep
    /// identifying the connection after the session is gone.
    pub(crate) host: String,
    pub(crate) err: Option<i32>,
    pub(crate) pending_queue: VecDeque<FsmEvent>,
    pub(crate) next: Option<ConnId>,
    pub(crate) prev: Option<ConnId>,
}

impl Connection {
    pub(crate) fn new(session: Arc<Mutex<Session>>, ordinal: Ordinal, host: String) -> Self {
        Self {
            session: Some(session),
            ordinal,
            accepted: ordinal == Ordinal::Secondary,
            state: FsmState::Initial,
            post: None,
            fsm_active: false,
            stopped: Stopped::Not,
            qfile: Qfile::default(),
            sock: None,
            hold_timer: Qtimer::default(),
            keepalive_timer: Qtimer::default(),
            hold_timer_interval: 0,
            keepalive_timer_interval: 0,
            ibuf: ReadBuf::new(),
            obuf: MsgBuf::new(BGP_PACKET_LEN),
            wbuff: WriteBuffer::default(),
            notification: None,
            notification_pending: false,
            open_recv: None,
            su_local: None,
            su_remote: None,
            host,
            err: None,
            pending_queue: VecDeque::new(),
            next: None,
            prev: None,
        }
    }

    /// Start I/O on a freshly initialised or previously closed connection.
    ///
    /// Buffers must be empty and timers unarmed. Snapshots the timer
    /// intervals from the session; an open on the secondary stops the
    /// session accepting further inbound connections from this peer.
    pub(crate) fn open(&mut self, ctx: &mut Ctx, sock: Box<dyn SockOps>, fd: RawFd) {
        if let Some(session) = &self.session {
            let mut sess = session.lock().unwrap();
            if self.ordinal == Ordinal::Secondary {
                sess.accept = false;
            }
            self.hold_timer_interval = sess.hold_timer_interval;
            self.keepalive_timer_interval = sess.keepalive_timer_interval;
        }

        self.qfile.set_fd(fd);
        ctx.selector.add_file(ctx.id, fd);

        self.post = None;
        self.err = None;
        self.stopped = Stopped::Not;
        self.open_recv = None;
        self.notification = None;
        self.notification_pending = false;

        self.su_local = sock.local_addr();
        self.su_remote = sock.peer_addr();
        self.sock = Some(sock);

        tracing::debug!(host = %self.host, fd, "connection open");
    }

    /// Stop all I/O. Idempotent; the connection may be re-opened with a new
    /// fd, or freed. Keeps the state, session links, timers (unarmed),
    /// buffers (reset), host, any received OPEN, any NOTIFICATION and the
    /// stop cause.
    pub(crate) fn close(&mut self, ctx: &mut Ctx) {
        if let Some(fd) = self.qfile.unset_fd() {
            ctx.selector.remove_file(ctx.id, fd);
        }
        if let Some(mut sock) = self.sock.take() {
            let _ = sock.shutdown(Shutdown::Both);
        }

        self.su_local = None;
        self.su_remote = None;

        ctx.timers.unset(ctx.id, TimerKind::Hold);
        self.hold_timer.disarm();
        ctx.timers.unset(ctx.id, TimerKind::Keepalive);
        self.keepalive_timer.disarm();

        self.ibuf.reset();
        self.obuf.reset();
        self.notification_pending = false;
        self.wbuff.reset();
        self.pending_queue.clear();

        tracing::debug!(host = %self.host, "connection closed");
    }

    /// Close for reading while keeping a bounded write window, so a final
    /// NOTIFICATION can still go out. The write ring is purged back to the
    /// boundary of the in-flight message, which guarantees room.
    pub(crate) fn part_close(&mut self, ctx: &mut Ctx) {
        if let (Some(fd), Some(sock)) = (self.qfile.fd(), self.sock.as_mut()) {
            let _ = sock.shutdown(Shutdown::Read);
            self.qfile.disable(Mode::READ);
            ctx.selector.disable_modes(ctx.id, fd, Mode::READ);
        }

        self.ibuf.reset();
        self.obuf.reset();
        self.notification_pending = false;
        self.wbuff.purge();
        self.pending_queue.clear();

        tracing::debug!(host = %self.host, "connection part closed");
    }

    // Accessors; the FSM and the embedding loop read connection state
    // through these, never through the fields.

    pub fn state(&self) -> FsmState {
        self.state
    }

    pub fn ordinal(&self) -> Ordinal {
        self.ordinal
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn stopped(&self) -> Stopped {
        self.stopped
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn err(&self) -> Option<i32> {
        self.err
    }

    pub fn qfile(&self) -> &Qfile {
        &self.qfile
    }

    pub fn hold_timer(&self) -> &Qtimer {
        &self.hold_timer
    }

    pub fn keepalive_timer(&self) -> &Qtimer {
        &self.keepalive_timer
    }

    pub fn hold_timer_interval(&self) -> u16 {
        self.hold_timer_interval
    }

    pub fn keepalive_timer_interval(&self) -> u16 {
        self.keepalive_timer_interval
    }

    pub fn ibuf(&self) -> &ReadBuf {
        &self.ibuf
    }

    pub fn obuf(&self) -> &MsgBuf {
        &self.obuf
    }

    pub fn wbuff(&self) -> &WriteBuffer {
        &self.wbuff
    }

    pub fn notification(&self) -> Option<&NotificationPacket> {
        self.notification.as_ref()
    }

    pub fn is_notification_pending(&self) -> bool {
        self.notification_pending
    }

    pub fn open_recv(&self) -> Option<&OpenPacket> {
        self.open_recv.as_ref()
    }

    pub fn su_local(&self) -> Option<SocketAddr> {
        self.su_local
    }

    pub fn su_remote(&self) -> Option<SocketAddr> {
        self.su_remote
    }

    pub fn pending_len(&self) -> usize {
        self.pending_queue.len()
    }

    /// On the ready queue right now?
    pub fn is_queued(&self) -> bool {
        debug_assert_eq!(self.next.is_some(), self.prev.is_some());
        self.next.is_some()
    }
}
