use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, BytesMut};
use thiserror::Error;

use bgp_wire::{BGP_HEADER_LEN, BGP_PACKET_LEN, BgpType};

#[derive(Debug, Error)]
pub enum BufError {
    #[error("exceeds fixed capacity: need {need} bytes but only {remaining} remaining")]
    Overflow { need: usize, remaining: usize },
    #[error("out of bounds: pos {pos} + 2 exceeds length {len}")]
    OutOfBounds { pos: usize, len: usize },
}

/// Fixed-capacity staging buffer for one outbound message (the obuf).
///
/// The FSM composes exactly one BGP message here, back-patching the header
/// length with `put_u16_at`, then hands it to the write pipeline.
#[derive(Debug)]
pub struct MsgBuf {
    inner: BytesMut,
    capacity: usize,
}

impl MsgBuf {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.inner[..]
    }

    pub fn reset(&mut self) {
        self.inner.clear();
    }

    pub fn put(&mut self, src: &[u8]) -> Result<(), BufError> {
        if src.len() > self.remaining() {
            return Err(BufError::Overflow {
                need: src.len(),
                remaining: self.remaining(),
            });
        }
        self.inner.put_slice(src);
        Ok(())
    }

    pub fn put_u8(&mut self, val: u8) -> Result<(), BufError> {
        if self.remaining() < 1 {
            return Err(BufError::Overflow {
                need: 1,
                remaining: self.remaining(),
            });
        }
        self.inner.put_u8(val);
        Ok(())
    }

    pub fn put_u16(&mut self, val: u16) -> Result<(), BufError> {
        if self.remaining() < 2 {
            return Err(BufError::Overflow {
                need: 2,
                remaining: self.remaining(),
            });
        }
        self.inner.put_u16(val);
        Ok(())
    }

    pub fn put_u16_at(&mut self, pos: usize, val: u16) -> Result<(), BufError> {
        if pos + 2 > self.inner.len() {
            return Err(BufError::OutOfBounds {
                pos,
                len: self.inner.len(),
            });
        }
        BigEndian::write_u16(&mut self.inner[pos..], val);
        Ok(())
    }
}

/// Read-side reassembly buffer (the ibuf), together with the framing state:
/// how many octets the current header or body still needs, and whether the
/// header is the piece being assembled.
#[derive(Debug)]
pub struct ReadBuf {
    data: Vec<u8>,
    filled: usize,
    typ: Option<BgpType>,
    pub(crate) read_pending: usize,
    pub(crate) read_header: bool,
}

impl ReadBuf {
    pub fn new() -> Self {
        Self {
            data: vec![0u8; BGP_PACKET_LEN],
            filled: 0,
            typ: None,
            read_pending: 0,
            read_header: false,
        }
    }

    pub fn read_pending(&self) -> usize {
        self.read_pending
    }

    pub fn is_reading_header(&self) -> bool {
        self.read_header
    }

    pub fn reset(&mut self) {
        self.filled = 0;
        self.typ = None;
        self.read_pending = 0;
        self.read_header = false;
    }

    /// Start on a fresh message: next 19 octets are the header.
    pub(crate) fn begin_message(&mut self) {
        self.filled = 0;
        self.typ = None;
        self.read_pending = usize::from(BGP_HEADER_LEN);
        self.read_header = true;
    }

    /// The unfilled slice the pending octets should land in.
    pub(crate) fn space(&mut self) -> &mut [u8] {
        let end = self.filled + self.read_pending;
        &mut self.data[self.filled..end]
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.filled += n;
        self.read_pending -= n;
    }

    pub(crate) fn header(&self) -> &[u8] {
        &self.data[..usize::from(BGP_HEADER_LEN)]
    }

    pub(crate) fn set_type(&mut self, typ: BgpType) {
        self.typ = Some(typ);
    }

    /// Hand the assembled message out and make the buffer ready for the
    /// next one.
    pub(crate) fn take_message(&mut self) -> Option<(BgpType, BytesMut)> {
        let typ = self.typ.take()?;
        let msg = BytesMut::from(&self.data[..self.filled]);
        self.reset();
        Some((typ, msg))
    }
}

impl Default for ReadBuf {
    fn default() -> Self {
        Self::new()
    }
}
