use bgp_wire::{BGP_PACKET_LEN, peek_bgp_length};

/// Staging ring capacity: ten maximum-size messages.
pub const BGP_WBUFF_LEN: usize = BGP_PACKET_LEN * 10;

/// Staging buffer for outbound messages, allocated on first backpressure so
/// idle connections only pay for the obuf.
///
/// Holds whole BGP messages between the start of the message containing
/// `p_out` and `p_in`; `p_out` itself may sit inside the first, partially
/// written message. `full` means there is no longer room for a
/// maximum-size message behind `p_in`.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    buf: Option<Box<[u8]>>,
    p_in: usize,
    p_out: usize,
    full: bool,
}

impl WriteBuffer {
    pub fn is_allocated(&self) -> bool {
        self.buf.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.p_out == self.p_in
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Octets staged and not yet written.
    pub fn len(&self) -> usize {
        self.p_in - self.p_out
    }

    pub fn capacity(&self) -> usize {
        self.buf.as_ref().map_or(0, |buf| buf.len())
    }

    fn recalc_full(&mut self) {
        self.full = match &self.buf {
            Some(buf) => buf.len() - self.p_in < BGP_PACKET_LEN,
            None => false,
        };
    }

    /// Append one whole message at `p_in`. The producer checks `!is_full()`
    /// before composing, which guarantees the room.
    pub(crate) fn put(&mut self, msg: &[u8]) {
        let buf = self
            .buf
            .get_or_insert_with(|| vec![0u8; BGP_WBUFF_LEN].into_boxed_slice());
        debug_assert!(msg.len() <= buf.len() - self.p_in);
        buf[self.p_in..self.p_in + msg.len()].copy_from_slice(msg);
        self.p_in += msg.len();
        self.recalc_full();
    }

    /// The unwritten tail, `[p_out, p_in)`.
    pub(crate) fn pending(&self) -> &[u8] {
        match &self.buf {
            Some(buf) => &buf[self.p_out..self.p_in],
            None => &[],
        }
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.p_out += n;
    }

    /// After a partial direct flush: output resumes at the unsent tail of
    /// the single staged message.
    pub(crate) fn set_out(&mut self, written: usize) {
        self.p_out = written;
    }

    /// Drained or closed: both pointers back to base. Keeps the allocation.
    pub(crate) fn reset(&mut self) {
        self.p_in = 0;
        self.p_out = 0;
        self.full = false;
    }

    /// Part-close purge: discard everything except the message currently in
    /// flight, moved down to base. Walks message lengths from base until the
    /// message containing `p_out`; a `p_out` sitting exactly on a boundary
    /// discards the lot. Leaves the buffer not-full, which reserves room
    /// for a final NOTIFICATION.
    pub(crate) fn purge(&mut self) {
        match self.buf.as_mut() {
            Some(buf) if self.p_in != self.p_out => {
                let mut p = 0;
                let mut mlen = 0;
                loop {
                    p += mlen;
                    mlen = peek_bgp_length(&buf[p..]);
                    if p + mlen > self.p_out {
                        break;
                    }
                }
                if p == self.p_out {
                    mlen = 0;
                } else {
                    buf.copy_within(p..p + mlen, 0);
                }
                self.p_out -= p;
                self.p_in = mlen;
            }
            _ => {
                self.p_in = 0;
                self.p_out = 0;
            }
        }
        self.recalc_full();
        debug_assert!(!self.full);
    }

    #[cfg(test)]
    fn check_invariant(&self) {
        assert!(self.p_out <= self.p_in);
        assert!(self.p_in <= self.capacity() || !self.is_allocated());
        let expect_full = self
            .buf
            .as_ref()
            .is_some_and(|buf| buf.len() - self.p_in < BGP_PACKET_LEN);
        assert_eq!(self.full, expect_full);
    }
}
