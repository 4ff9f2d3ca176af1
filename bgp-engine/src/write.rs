use std::io::ErrorKind;

use crate::conn::Connection;
use crate::engine::Ctx;
use crate::event::{FsmEvent, WriteStatus};
use crate::select::Mode;

/// Outcome of a write-readiness drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainStatus {
    /// Socket would block again; stay enabled for write.
    Busy,
    /// I/O error; an `IoError` event has been raised.
    Failed,
    /// Ring fully drained; the connection can take pending work again.
    Drained,
    /// Ring fully drained and it carried the teardown NOTIFICATION.
    SentNotification,
}

impl Connection {
    /// Push the message staged in obuf down the pipeline. The producer must
    /// not call this while the ring is full.
    pub(crate) fn write(&mut self, ctx: &mut Ctx) -> WriteStatus {
        if self.wbuff.is_empty() {
            return self.write_direct(ctx);
        }

        // Ring already busy: stage the whole message behind it.
        debug_assert!(!self.wbuff.is_full());
        self.wbuff.put(self.obuf.as_slice());
        self.obuf.reset();
        WriteStatus::Buffered
    }

    /// The ring is empty, so try the socket directly. A partial write
    /// allocates the ring (first time) and stages the whole message, with
    /// output resuming at the unsent tail.
    fn write_direct(&mut self, ctx: &mut Ctx) -> WriteStatus {
        let Some(sock) = self.sock.as_mut() else {
            return WriteStatus::Failed;
        };

        let msg = self.obuf.as_slice();
        let written = loop {
            match sock.write(msg) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break 0,
                Err(err) => {
                    let errno = err.raw_os_error().unwrap_or(0);
                    self.err = Some(errno);
                    ctx.raise(FsmEvent::IoError { errno });
                    return WriteStatus::Failed;
                }
            }
        };

        if written == msg.len() {
            self.obuf.reset();
            return WriteStatus::Done;
        }

        self.wbuff.put(msg);
        self.wbuff.set_out(written);
        self.obuf.reset();

        if let Some(fd) = self.qfile.fd() {
            self.qfile.enable(Mode::WRITE);
            ctx.selector.enable_mode(ctx.id, fd, Mode::WRITE);
        }
        WriteStatus::Buffered
    }

    /// Write readiness: drain `[p_out, p_in)`. On a full drain the ring is
    /// reset, write mode comes off, and the caller either reports the
    /// NOTIFICATION sent or puts the connection back on the ready queue.
    pub(crate) fn write_action(&mut self, ctx: &mut Ctx) -> DrainStatus {
        let Some(sock) = self.sock.as_mut() else {
            return DrainStatus::Failed;
        };

        while !self.wbuff.is_empty() {
            match sock.write(self.wbuff.pending()) {
                Ok(0) => return DrainStatus::Busy,
                Ok(n) => self.wbuff.advance(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return DrainStatus::Busy,
                Err(err) => {
                    let errno = err.raw_os_error().unwrap_or(0);
                    self.err = Some(errno);
                    ctx.raise(FsmEvent::IoError { errno });
                    return DrainStatus::Failed;
                }
            }
        }

        self.wbuff.reset();
        if let Some(fd) = self.qfile.fd() {
            self.qfile.disable(Mode::WRITE);
            ctx.selector.disable_modes(ctx.id, fd, Mode::WRITE);
        }

        if self.notification_pending {
            ctx.raise(FsmEvent::SentNotification);
            DrainStatus::SentNotification
        } else {
            DrainStatus::Drained
        }
    }
}
