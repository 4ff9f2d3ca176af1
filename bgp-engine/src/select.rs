use std::os::fd::RawFd;

use bitflags::bitflags;

use crate::engine::ConnId;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mode: u8 {
        const READ = 0b0000_0001;
        const WRITE = 0b0000_0010;
    }
}

/// File descriptor readiness service the engine consumes.
///
/// The implementation (poll, epoll, whatever the embedding event loop runs
/// on) reports readiness back through `Engine::read_ready` and
/// `Engine::write_ready` using the registered `ConnId`.
pub trait Selector {
    fn add_file(&mut self, id: ConnId, fd: RawFd);
    fn remove_file(&mut self, id: ConnId, fd: RawFd);
    fn enable_mode(&mut self, id: ConnId, fd: RawFd, mode: Mode);
    fn disable_modes(&mut self, id: ConnId, fd: RawFd, modes: Mode);
}

/// Per-connection selector registration state: the fd and which readiness
/// modes are currently enabled.
#[derive(Debug, Default)]
pub struct Qfile {
    fd: Option<RawFd>,
    modes: Mode,
}

impl Qfile {
    pub fn fd(&self) -> Option<RawFd> {
        self.fd
    }

    pub fn is_enabled(&self, mode: Mode) -> bool {
        self.modes.contains(mode)
    }

    pub(crate) fn set_fd(&mut self, fd: RawFd) {
        self.fd = Some(fd);
        self.modes = Mode::empty();
    }

    pub(crate) fn unset_fd(&mut self) -> Option<RawFd> {
        self.modes = Mode::empty();
        self.fd.take()
    }

    pub(crate) fn enable(&mut self, mode: Mode) {
        self.modes |= mode;
    }

    pub(crate) fn disable(&mut self, modes: Mode) {
        self.modes &= !modes;
    }
}
