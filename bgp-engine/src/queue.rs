//! The ready queue: a circular list of connections with pending work,
//! threaded through the connections themselves (`next`/`prev` ids). The
//! engine's cursor names the next connection to be serviced, and the queue
//! runs at the highest priority in the event loop: everything ready is
//! processed before the selector is polled again.

use crate::conn::FsmState;
use crate::engine::{ConnId, Engine};
use crate::event::BgpFsm;

impl Engine {
    /// Join the ready queue, behind the cursor, so the connection is
    /// processed last in the current round. No-op if already on it.
    pub fn queue_add(&mut self, id: ConnId) {
        let Some(conn) = self.conn(id) else {
            return;
        };
        if conn.next.is_some() {
            return;
        }

        match self.queue {
            None => {
                self.queue = Some(id);
                if let Some(conn) = self.conn_mut(id) {
                    conn.next = Some(id);
                    conn.prev = Some(id);
                }
            }
            Some(head) => {
                let Some(prev) = self.conn(head).and_then(|head| head.prev) else {
                    return;
                };
                if let Some(conn) = self.conn_mut(id) {
                    conn.next = Some(head);
                    conn.prev = Some(prev);
                }
                if let Some(conn) = self.conn_mut(prev) {
                    conn.next = Some(id);
                }
                if let Some(conn) = self.conn_mut(head) {
                    conn.prev = Some(id);
                }
            }
        }
    }

    /// Leave the ready queue, if on it. The cursor steps past a departing
    /// head.
    pub fn queue_del(&mut self, id: ConnId) {
        let Some(conn) = self.conn(id) else {
            return;
        };
        let (Some(next), Some(prev)) = (conn.next, conn.prev) else {
            return;
        };

        if next == id {
            // The only entry.
            self.queue = None;
        } else {
            if self.queue == Some(id) {
                self.queue = Some(next);
            }
            if let Some(conn) = self.conn_mut(next) {
                conn.prev = Some(prev);
            }
            if let Some(conn) = self.conn_mut(prev) {
                conn.next = Some(next);
            }
        }

        if let Some(conn) = self.conn_mut(id) {
            conn.next = None;
            conn.prev = None;
        }
    }

    /// Service the ready queue until it empties.
    ///
    /// A `Stopping` head is reaped. Anything else has its pending queue
    /// drained into the FSM until the queue empties, the write ring fills,
    /// or the connection stops; in each case the connection then leaves the
    /// ready queue (re-joining when the ring drains or new work arrives).
    pub fn queue_process(&mut self, fsm: &mut dyn BgpFsm) {
        while let Some(head) = self.queue {
            // Step the cursor first, so progress continues even while the
            // head leaves the queue.
            match self.conn(head) {
                Some(conn) => {
                    if let Some(next) = conn.next {
                        self.queue = Some(next);
                    }
                }
                None => {
                    debug_assert!(false, "queued connection is gone");
                    self.queue = None;
                    return;
                }
            }

            if self.conn(head).map(|conn| conn.state) == Some(FsmState::Stopping) {
                self.reset(head);
                continue;
            }

            loop {
                let event = {
                    let Some(conn) = self.conn_mut(head) else {
                        break;
                    };
                    if conn.wbuff.is_full() || conn.state == FsmState::Stopping {
                        break;
                    }
                    conn.pending_queue.pop_front()
                };
                let Some(event) = event else {
                    break;
                };
                self.deliver(fsm, head, event);
            }

            // A connection that stopped mid-drain stays queued and is
            // reaped on the next visit; everything else leaves the queue.
            let stopping = self
                .conn(head)
                .is_some_and(|conn| conn.state == FsmState::Stopping);
            if !stopping {
                self.queue_del(head);
            }
        }
    }

    /// Reap a stopped connection: off the queue, socket and timers
    /// released. The FSM detaches and frees it afterwards.
    fn reset(&mut self, id: ConnId) {
        self.queue_del(id);
        self.close(id);
    }
}
