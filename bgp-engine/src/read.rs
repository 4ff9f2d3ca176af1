use std::io::ErrorKind;

use bgp_wire::BgpHeader;

use crate::conn::Connection;
use crate::engine::Ctx;
use crate::event::FsmEvent;

impl Connection {
    /// Read readiness: reassemble one BGP message, header then body, and
    /// dispatch it. Never blocks; a short read parks the framing state in
    /// the ibuf until the socket is readable again.
    pub(crate) fn read_action(&mut self, ctx: &mut Ctx) {
        if self.ibuf.read_pending == 0 {
            self.ibuf.begin_message();
        }

        let Some(sock) = self.sock.as_mut() else {
            return;
        };

        loop {
            while self.ibuf.read_pending > 0 {
                match sock.read(self.ibuf.space()) {
                    Ok(0) => {
                        // EOF from the peer.
                        self.err = Some(0);
                        ctx.raise(FsmEvent::IoError { errno: 0 });
                        return;
                    }
                    Ok(n) => self.ibuf.advance(n),
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) if err.kind() == ErrorKind::WouldBlock => {
                        // Must wait for the rest.
                        return;
                    }
                    Err(err) => {
                        let errno = err.raw_os_error().unwrap_or(0);
                        self.err = Some(errno);
                        ctx.raise(FsmEvent::IoError { errno });
                        return;
                    }
                }
            }

            if self.ibuf.read_header {
                self.ibuf.read_header = false;
                match BgpHeader::validate(self.ibuf.header()) {
                    Ok((typ, body_len)) => {
                        self.ibuf.set_type(typ);
                        self.ibuf.read_pending = body_len;
                    }
                    Err(err) => {
                        tracing::warn!(host = %self.host, %err, "bad message header");
                        ctx.raise(FsmEvent::HeaderError(err));
                        return;
                    }
                }
            } else {
                // Complete message.
                break;
            }
        }

        // Dispatch: the framed octets leave the ibuf here, so it is ready
        // for the next message as soon as this returns.
        if let Some((typ, msg)) = self.ibuf.take_message() {
            ctx.raise(FsmEvent::Message { typ, msg });
        }
    }
}
