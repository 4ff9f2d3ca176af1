//! The connection core of a BGP-4 speaker: per-peer I/O, buffering and
//! connection lifecycle, sitting between the FSM above and the non-blocking
//! stream sockets below.
//!
//! The engine is single-threaded and cooperative. The embedding event loop
//! owns the fd selector and the timer wheel (consumed here as the
//! [`Selector`] and [`TimerPile`] services), polls them, and feeds
//! readiness and expiry back in:
//!
//! ```text
//! loop {
//!     engine.queue_process(&mut fsm);        // ready connections first
//!     engine.dispatch(&mut fsm);
//!     // poll the selector / timer wheel, then per firing:
//!     //   engine.read_ready(id) / engine.write_ready(id)
//!     //   engine.timer_expired(id, kind)
//!     engine.dispatch(&mut fsm);
//! }
//! ```
//!
//! Egress runs `FSM -> obuf -> staging ring -> socket`, with the ring
//! allocated on first backpressure and `wbuff full` gating the producer.
//! Ingress runs `socket -> ibuf -> framed message -> FSM`. A session may
//! briefly hold two racing connections; [`Engine::make_primary`] promotes
//! the survivor and hands its negotiated state up to the session.

pub mod engine;
pub use engine::{ConnId, Engine};

pub mod conn;
pub use conn::{Connection, FsmState, Stopped};

pub mod session;
pub use session::{Ordinal, Session};

pub mod event;
pub use event::{BgpFsm, FsmEvent, WriteStatus};

pub mod buf;
pub use buf::{BufError, MsgBuf, ReadBuf};

pub mod wbuff;
pub use wbuff::{BGP_WBUFF_LEN, WriteBuffer};

pub mod select;
pub use select::{Mode, Qfile, Selector};

pub mod timer;
pub use timer::{Config, Qtimer, TimerKind, TimerPile};

pub mod sock;
pub use sock::SockOps;

mod queue;
mod read;
mod write;
