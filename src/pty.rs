//! Pseudo-terminal pairs standing in for a real line in tests.
use nix::pty::openpty;
use nix::unistd::{close, ttyname};
use std::os::unix::io::RawFd;
use std::path::PathBuf;

pub struct Loopback {
    master: Option<RawFd>,
    slave: RawFd,
    path: PathBuf,
}

impl Loopback {
    pub fn new() -> Loopback {
        let pty = openpty(None, None).expect("Unable to open pty pair");
        let path = ttyname(pty.slave).expect("pty slave has no name");
        Loopback {
            master: Some(pty.master),
            slave: pty.slave,
            path,
        }
    }

    /// Path of the slave side, the end handed to `acquire`.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Descriptor of the controlling side.
    pub fn master(&self) -> RawFd {
        self.master.expect("master already closed")
    }

    /// Close the controlling side, which hangs up every open slave descriptor.
    pub fn hang_up(&mut self) {
        if let Some(fd) = self.master.take() {
            close(fd).expect("Unable to close pty master");
        }
    }
}

impl Drop for Loopback {
    fn drop(&mut self) {
        if let Some(fd) = self.master.take() {
            let _ = close(fd);
        }
        let _ = close(self.slave);
    }
}
