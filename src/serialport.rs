//! Acquisition and release of the descriptor behind a line device.
//!
//! A [`LineHandle`] owns exactly one descriptor. It can be moved but not
//! cloned, and the descriptor is closed exactly once: by [`release`] or,
//! failing that, when the handle is dropped.
use log::{debug, trace, warn};
use nix::errno::Errno;
use nix::fcntl::{self, fcntl, FcntlArg, OFlag};
use nix::sys::stat::Mode;
use nix::unistd;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("device not found: {0}")]
    NotFound(Errno),
    #[error("permission denied: {0}")]
    PermissionDenied(Errno),
    #[error("not a tty device")]
    NotALineDevice,
    #[error("open device failed: {0}")]
    Other(Errno),
}

impl From<Errno> for OpenError {
    fn from(e: Errno) -> OpenError {
        match e {
            Errno::ENOENT | Errno::ENXIO | Errno::ENODEV => OpenError::NotFound(e),
            Errno::EACCES | Errno::EPERM => OpenError::PermissionDenied(e),
            _ => OpenError::Other(e),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CloseError {
    #[error("close device failed: {0}")]
    Other(Errno),
}

#[derive(Debug)]
pub struct LineHandle {
    fd: Option<RawFd>,
    path: PathBuf,
}

/// Open `path` as a line device.
///
/// The device is opened non-blocking so a missing carrier cannot hang the
/// open itself, then switched back to blocking before it is handed out.
pub fn acquire<P: AsRef<Path>>(path: P) -> Result<LineHandle, OpenError> {
    let path = path.as_ref();
    let fd = match fcntl::open(
        path,
        OFlag::O_RDWR | OFlag::O_NOCTTY | OFlag::O_NONBLOCK,
        Mode::empty(),
    ) {
        Ok(fd) => fd,
        Err(e) => {
            debug!("{}: open device failed: {}", path.display(), e);
            return Err(e.into());
        }
    };
    // Owned from here on, so any early return below closes it.
    let handle = LineHandle {
        fd: Some(fd),
        path: path.to_path_buf(),
    };

    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(OpenError::Other)?;
    let flags = OFlag::from_bits_truncate(flags) & !OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(OpenError::Other)?;

    match unistd::isatty(fd) {
        Ok(true) => {}
        Ok(false) | Err(Errno::ENOTTY) | Err(Errno::EINVAL) => {
            warn!("{}: not tty device", path.display());
            return Err(OpenError::NotALineDevice);
        }
        Err(e) => return Err(OpenError::Other(e)),
    }

    debug!("{}: tty device test ok", path.display());
    Ok(handle)
}

/// Close the handle's descriptor. The handle is consumed either way.
pub fn release(handle: LineHandle) -> Result<(), CloseError> {
    handle.release()
}

impl LineHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn fd(&self) -> nix::Result<RawFd> {
        self.fd.ok_or(Errno::EBADF)
    }

    pub fn release(mut self) -> Result<(), CloseError> {
        match self.fd.take() {
            Some(fd) => {
                unistd::close(fd).map_err(CloseError::Other)?;
                debug!("{}: released", self.path.display());
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl AsRawFd for LineHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.unwrap_or(-1)
    }
}

impl Drop for LineHandle {
    fn drop(&mut self) {
        if let Some(fd) = self.fd.take() {
            match unistd::close(fd) {
                Ok(()) => debug!("{}: released on drop", self.path.display()),
                Err(e) => warn!("{}: close device failed: {}", self.path.display(), e),
            }
        }
    }
}

fn to_io(e: Errno) -> io::Error {
    io::Error::from_raw_os_error(e as i32)
}

/// One `read(2)`; how long it waits is decided by the line's read policy.
impl io::Read for LineHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let fd = self.fd().map_err(to_io)?;
        let n = unistd::read(fd, buf).map_err(to_io)?;
        trace!("{}: read {} bytes", self.path.display(), n);
        Ok(n)
    }
}

impl io::Write for LineHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let fd = self.fd().map_err(to_io)?;
        let n = unistd::write(fd, buf).map_err(to_io)?;
        trace!("{}: wrote {} bytes", self.path.display(), n);
        Ok(n)
    }

    /// Wait until everything written has been transmitted.
    fn flush(&mut self) -> io::Result<()> {
        let fd = self.fd().map_err(to_io)?;
        nix::sys::termios::tcdrain(fd).map_err(to_io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::Loopback;
    use std::fs::{self, File};
    use std::io::{Read, Write};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ttyline-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_nonexistent_path() {
        let res = acquire("/dev/ttyline-does-not-exist");
        assert!(matches!(res, Err(OpenError::NotFound(Errno::ENOENT))));
    }

    // A regular file opens fine but must be refused
    #[test]
    fn test_regular_file() {
        let path = temp_path("regular");
        File::create(&path).expect("Error creating test file");
        let res = acquire(&path);
        assert!(matches!(res, Err(OpenError::NotALineDevice)));
        fs::remove_file(&path).expect("Unable to remove test file");
    }

    #[test]
    fn test_errno_classification() {
        assert!(matches!(
            OpenError::from(Errno::ENXIO),
            OpenError::NotFound(_)
        ));
        assert!(matches!(
            OpenError::from(Errno::EACCES),
            OpenError::PermissionDenied(_)
        ));
        assert!(matches!(
            OpenError::from(Errno::EPERM),
            OpenError::PermissionDenied(_)
        ));
        assert!(matches!(
            OpenError::from(Errno::EBUSY),
            OpenError::Other(Errno::EBUSY)
        ));
    }

    // The non-blocking flag used for the open is cleared again
    #[test]
    fn test_acquire_pty_is_blocking() {
        let pty = Loopback::new();
        let handle = acquire(pty.path()).unwrap();
        assert_eq!(pty.path().as_path(), handle.path());
        let flags = fcntl(handle.as_raw_fd(), FcntlArg::F_GETFL).unwrap();
        let flags = OFlag::from_bits_truncate(flags);
        assert!(!flags.contains(OFlag::O_NONBLOCK));
        assert!(flags.contains(OFlag::O_RDWR));
        release(handle).unwrap();
    }

    #[test]
    fn test_acquire_release_cycle() {
        let pty = Loopback::new();
        for _ in 0..3 {
            let handle = acquire(pty.path()).unwrap();
            assert!(handle.fd().is_ok());
            release(handle).unwrap();
        }
    }

    #[test]
    fn test_write_reaches_master() {
        let pty = Loopback::new();
        let mut handle = acquire(pty.path()).unwrap();
        crate::configurator::apply(&mut handle, &crate::LineConfig::default()).unwrap();
        assert_eq!(4, handle.write(b"ping").unwrap());
        let mut buf = [0u8; 4];
        let n = unistd::read(pty.master(), &mut buf).unwrap();
        assert_eq!(&b"ping"[..n], &buf[..n]);
        assert!(n > 0);

        // immediate policy: nothing queued, nothing read
        let mut buf = [0u8; 8];
        assert_eq!(0, handle.read(&mut buf).unwrap());
        release(handle).unwrap();
    }
}
