//! Module providing some convenience functions for using termios
use nix::sys::termios::{
    tcflush, tcgetattr, tcsetattr, FlushArg, SetArg, SpecialCharacterIndices, Termios,
};
use std::os::unix::io::RawFd;

pub fn get_termios(fd: RawFd) -> nix::Result<Termios> {
    tcgetattr(fd)
}

/// Commit `termios` right away, without waiting for output to drain.
pub fn set_termios(fd: RawFd, termios: &Termios) -> nix::Result<()> {
    tcsetattr(fd, SetArg::TCSANOW, termios)
}

/// Discard everything queued in both directions.
pub fn flush_queues(fd: RawFd) -> nix::Result<()> {
    tcflush(fd, FlushArg::TCIOFLUSH)
}

/// (VMIN, VTIME)
pub fn read_timing(termios: &Termios) -> (u8, u8) {
    (
        termios.control_chars[SpecialCharacterIndices::VMIN as usize],
        termios.control_chars[SpecialCharacterIndices::VTIME as usize],
    )
}

pub fn set_read_timing(termios: &mut Termios, vmin: u8, vtime: u8) {
    termios.control_chars[SpecialCharacterIndices::VTIME as usize] = vtime;
    termios.control_chars[SpecialCharacterIndices::VMIN as usize] = vmin;
}
