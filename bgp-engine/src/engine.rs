use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;

use bgp_wire::{NotificationPacket, OpenPacket};

use crate::conn::{Connection, FsmState, Stopped};
use crate::event::{BgpFsm, FsmEvent, WriteStatus};
use crate::select::{Mode, Selector};
use crate::session::{Ordinal, Session};
use crate::sock::SockOps;
use crate::timer::{TimerKind, TimerPile};
use crate::write::DrainStatus;

/// Index of a connection in the engine's arena; stable for the lifetime of
/// the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub(crate) usize);

/// Engine-side services a connection action may need: the place to raise
/// FSM events plus the selector and timer services.
pub(crate) struct Ctx<'a> {
    pub(crate) id: ConnId,
    pub(crate) events: &'a mut VecDeque<(ConnId, FsmEvent)>,
    pub(crate) selector: &'a mut dyn Selector,
    pub(crate) timers: &'a mut dyn TimerPile,
}

impl Ctx<'_> {
    pub(crate) fn raise(&mut self, event: FsmEvent) {
        self.events.push_back((self.id, event));
    }
}

/// The I/O engine's connection table and event plumbing.
///
/// Single-threaded and cooperative: readiness and timer callbacks run to
/// completion, errors surface as FSM events rather than propagating, and
/// the ready queue is serviced ahead of new I/O. The embedding event loop
/// owns the selector/timer implementations and feeds readiness back in
/// through `read_ready`, `write_ready` and `timer_expired`.
pub struct Engine {
    conns: Vec<Option<Connection>>,
    free: Vec<usize>,
    pub(crate) queue: Option<ConnId>,
    events: VecDeque<(ConnId, FsmEvent)>,
    selector: Box<dyn Selector>,
    timers: Box<dyn TimerPile>,
}

impl Engine {
    pub fn new(selector: Box<dyn Selector>, timers: Box<dyn TimerPile>) -> Self {
        Self {
            conns: Vec::new(),
            free: Vec::new(),
            queue: None,
            events: VecDeque::new(),
            selector,
            timers,
        }
    }

    pub fn conn(&self, id: ConnId) -> Option<&Connection> {
        self.conns.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn conn_mut(&mut self, id: ConnId) -> Option<&mut Connection> {
        self.conns.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    fn ctx_conn(&mut self, id: ConnId) -> Option<(&mut Connection, Ctx<'_>)> {
        let conn = self.conns.get_mut(id.0)?.as_mut()?;
        let ctx = Ctx {
            id,
            events: &mut self.events,
            selector: self.selector.as_mut(),
            timers: self.timers.as_mut(),
        };
        Some((conn, ctx))
    }

    /// Create a connection for `session` at `ordinal`. The slot must be
    /// empty. Everything starts in its zero state: `Initial`, no post
    /// event, not stopped, queues empty, timers initialised but unarmed.
    pub fn conn_new(&mut self, session: &Arc<Mutex<Session>>, ordinal: Ordinal) -> ConnId {
        let host;
        {
            let sess = session.lock().unwrap();
            assert!(
                sess.connections[ordinal.index()].is_none(),
                "connection slot already in use"
            );
            host = format!("{}{}", sess.host, ordinal.tag());
        }

        let conn = Connection::new(session.clone(), ordinal, host.clone());
        let idx = match self.free.pop() {
            Some(idx) => {
                self.conns[idx] = Some(conn);
                idx
            }
            None => {
                self.conns.push(Some(conn));
                self.conns.len() - 1
            }
        };
        let id = ConnId(idx);

        session.lock().unwrap().connections[ordinal.index()] = Some(id);

        tracing::debug!(host = %host, "connection created");
        id
    }

    /// Install the socket and start I/O. The connection must be freshly
    /// created or closed, with empty buffers and unarmed timers.
    pub fn open(&mut self, id: ConnId, sock: Box<dyn SockOps>, fd: RawFd) {
        if let Some((conn, mut ctx)) = self.ctx_conn(id) {
            conn.open(&mut ctx, sock, fd);
        }
    }

    /// Stop all I/O; see `Connection::close` for what survives. Idempotent,
    /// and a later `open` with a fresh fd is allowed.
    pub fn close(&mut self, id: ConnId) {
        if let Some((conn, mut ctx)) = self.ctx_conn(id) {
            conn.close(&mut ctx);
        }
    }

    /// Half-close for read, keeping a bounded write window for a final
    /// NOTIFICATION.
    pub fn part_close(&mut self, id: ConnId) {
        if let Some((conn, mut ctx)) = self.ctx_conn(id) {
            conn.part_close(&mut ctx);
        }
    }

    /// Sever the session link (and the session's slot, if it still points
    /// here). Required before `free`.
    pub fn detach(&mut self, id: ConnId) {
        let Some(conn) = self.conn_mut(id) else {
            return;
        };
        let Some(session) = conn.session.take() else {
            return;
        };
        let mut sess = session.lock().unwrap();
        if sess.connections[conn.ordinal.index()] == Some(id) {
            sess.connections[conn.ordinal.index()] = None;
        }
    }

    /// Final teardown: release the connection and everything it owns. The
    /// connection must be `Stopping`, detached from its session and off the
    /// ready queue.
    pub fn free(&mut self, id: ConnId) {
        let Some(conn) = self.conn(id) else {
            return;
        };
        debug_assert!(conn.state.is_stopping());
        debug_assert!(conn.session.is_none());
        debug_assert!(conn.next.is_none() && conn.prev.is_none());

        self.conns[id.0] = None;
        self.free.push(id.0);
    }

    /// The other connection of the same session, if both are still alive.
    pub fn sibling(&self, id: ConnId) -> Option<ConnId> {
        let conn = self.conn(id)?;
        let session = conn.session.as_ref()?;
        let sess = session.lock().unwrap();
        sess.connections[conn.ordinal.sibling().index()]
    }

    /// Collision resolved in this connection's favour: make it the primary
    /// and move the negotiated OPEN state, the endpoints and both timer
    /// intervals up to the session. The host drops its ordinal tag.
    pub fn make_primary(&mut self, id: ConnId) {
        let Some(conn) = self.conn_mut(id) else {
            return;
        };
        let Some(session) = conn.session.clone() else {
            return;
        };
        let mut sess = session.lock().unwrap();

        if conn.ordinal != Ordinal::Primary {
            conn.ordinal = Ordinal::Primary;
            sess.connections[Ordinal::Primary.index()] = Some(id);
        }
        sess.connections[Ordinal::Secondary.index()] = None;

        sess.open_recv = conn.open_recv.take();
        sess.su_local = conn.su_local.take();
        sess.su_remote = conn.su_remote.take();
        sess.hold_timer_interval = conn.hold_timer_interval;
        sess.keepalive_timer_interval = conn.keepalive_timer_interval;

        conn.host = sess.host.clone();
        tracing::debug!(host = %conn.host, "promoted to primary");
    }

    /// Stage one complete message in the obuf and push it down the write
    /// pipeline. The producer checks `!wbuff.is_full()` first; a full ring
    /// means no new message may be composed until the ring drains.
    pub fn send(&mut self, id: ConnId, msg: &[u8]) -> WriteStatus {
        let Some((conn, mut ctx)) = self.ctx_conn(id) else {
            return WriteStatus::Failed;
        };
        debug_assert!(!conn.wbuff.is_full());
        if conn.obuf.put(msg).is_err() {
            tracing::error!(host = %conn.host, len = msg.len(), "message exceeds obuf capacity");
            return WriteStatus::Failed;
        }
        conn.write(&mut ctx)
    }

    /// Stage the teardown NOTIFICATION. Records it on the connection, marks
    /// it pending, and raises `SentNotification` once it has fully left the
    /// buffers (immediately on a direct flush, otherwise from the drain).
    /// Normally preceded by `part_close`, which guarantees ring room.
    pub fn notification_send(
        &mut self,
        id: ConnId,
        notification: NotificationPacket,
    ) -> WriteStatus {
        let Some((conn, mut ctx)) = self.ctx_conn(id) else {
            return WriteStatus::Failed;
        };
        conn.notification = Some(notification.clone());
        conn.notification_pending = true;

        let bytes: BytesMut = notification.into();
        if conn.obuf.put(&bytes).is_err() {
            tracing::error!(host = %conn.host, "NOTIFICATION exceeds obuf capacity");
            return WriteStatus::Failed;
        }

        let status = conn.write(&mut ctx);
        if status == WriteStatus::Done {
            ctx.raise(FsmEvent::SentNotification);
        }
        status
    }

    /// Selector callback: the fd is readable.
    pub fn read_ready(&mut self, id: ConnId) {
        if let Some((conn, mut ctx)) = self.ctx_conn(id) {
            if conn.qfile.is_enabled(Mode::READ) {
                conn.read_action(&mut ctx);
            }
        }
    }

    /// Selector callback: the fd is writable.
    pub fn write_ready(&mut self, id: ConnId) {
        let status = match self.ctx_conn(id) {
            Some((conn, mut ctx)) => conn.write_action(&mut ctx),
            None => return,
        };
        if status == DrainStatus::Drained {
            self.queue_add(id);
        }
    }

    /// Enable read readiness; the FSM turns this on once the connection is
    /// up and it can consume messages.
    pub fn read_enable(&mut self, id: ConnId) {
        if let Some((conn, ctx)) = self.ctx_conn(id) {
            if let Some(fd) = conn.qfile.fd() {
                conn.qfile.enable(Mode::READ);
                ctx.selector.enable_mode(ctx.id, fd, Mode::READ);
            }
        }
    }

    pub fn hold_timer_set(&mut self, id: ConnId) {
        if let Some((conn, ctx)) = self.ctx_conn(id) {
            let interval = Duration::from_secs(u64::from(conn.hold_timer_interval));
            conn.hold_timer.arm();
            ctx.timers.set(ctx.id, TimerKind::Hold, interval);
        }
    }

    pub fn hold_timer_unset(&mut self, id: ConnId) {
        if let Some((conn, ctx)) = self.ctx_conn(id) {
            conn.hold_timer.disarm();
            ctx.timers.unset(ctx.id, TimerKind::Hold);
        }
    }

    pub fn keepalive_timer_set(&mut self, id: ConnId) {
        if let Some((conn, ctx)) = self.ctx_conn(id) {
            let interval = Duration::from_secs(u64::from(conn.keepalive_timer_interval));
            conn.keepalive_timer.arm();
            ctx.timers.set(ctx.id, TimerKind::Keepalive, interval);
        }
    }

    pub fn keepalive_timer_unset(&mut self, id: ConnId) {
        if let Some((conn, ctx)) = self.ctx_conn(id) {
            conn.keepalive_timer.disarm();
            ctx.timers.unset(ctx.id, TimerKind::Keepalive);
        }
    }

    /// Timer service callback. Expiry reaches the FSM as an event even
    /// under full write backpressure, which is what lets the hold timer cut
    /// a wedged connection loose.
    pub fn timer_expired(&mut self, id: ConnId, kind: TimerKind) {
        let event = match kind {
            TimerKind::Hold => FsmEvent::HoldTimerExpires,
            TimerKind::Keepalive => FsmEvent::KeepaliveTimerExpires,
        };
        if let Some(conn) = self.conn_mut(id) {
            match kind {
                TimerKind::Hold => conn.hold_timer.disarm(),
                TimerKind::Keepalive => conn.keepalive_timer.disarm(),
            }
            self.events.push_back((id, event));
        }
    }

    /// Queue an FSM-bound input for in-order delivery via the ready queue.
    /// Joins the queue while the write ring has room; a full ring defers
    /// until the drain re-adds the connection.
    pub fn pending_push(&mut self, id: ConnId, event: FsmEvent) {
        let Some(conn) = self.conn_mut(id) else {
            return;
        };
        conn.pending_queue.push_back(event);
        if !conn.wbuff.is_full() {
            self.queue_add(id);
        }
    }

    /// Deliver every raised event to the FSM.
    pub fn dispatch(&mut self, fsm: &mut dyn BgpFsm) {
        while let Some((id, event)) = self.events.pop_front() {
            self.deliver(fsm, id, event);
        }
    }

    /// How many events are waiting for `dispatch`.
    pub fn events_pending(&self) -> usize {
        self.events.len()
    }

    /// FSM entry with the reentrancy guard: an event arriving while the FSM
    /// is already processing this connection is stashed as the single post
    /// event and delivered when the current action completes.
    pub(crate) fn deliver(&mut self, fsm: &mut dyn BgpFsm, id: ConnId, event: FsmEvent) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            {
                let Some(conn) = self.conn_mut(id) else {
                    return;
                };
                if conn.fsm_active {
                    conn.post = Some(event);
                    return;
                }
                conn.fsm_active = true;
            }

            fsm.event(self, id, event);

            if let Some(conn) = self.conn_mut(id) {
                conn.fsm_active = false;
                next = conn.post.take();
            }
        }
    }

    // FSM-owned connection state lives on the connection; the FSM writes it
    // through these.

    pub fn state(&self, id: ConnId) -> Option<FsmState> {
        self.conn(id).map(|conn| conn.state)
    }

    pub fn set_state(&mut self, id: ConnId, state: FsmState) {
        if let Some(conn) = self.conn_mut(id) {
            conn.state = state;
        }
    }

    pub fn set_stopped(&mut self, id: ConnId, stopped: Stopped) {
        if let Some(conn) = self.conn_mut(id) {
            conn.stopped = stopped;
        }
    }

    /// Record the OPEN received on this connection; promotion moves it to
    /// the session.
    pub fn set_open_recv(&mut self, id: ConnId, open: OpenPacket) {
        if let Some(conn) = self.conn_mut(id) {
            conn.open_recv = Some(open);
        }
    }

    pub fn session(&self, id: ConnId) -> Option<Arc<Mutex<Session>>> {
        self.conn(id).and_then(|conn| conn.session.clone())
    }

    /// Next connection the ready queue will look at.
    pub fn queue_head(&self) -> Option<ConnId> {
        self.queue
    }
}
