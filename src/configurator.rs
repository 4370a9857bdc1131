//! Translation of a [`LineConfig`] into line discipline attributes.
//!
//! [`apply`] reads the current attributes, builds a replacement set with
//! [`build`], discards anything queued under the old framing and commits the
//! new set immediately. If the commit fails the line is left in an unknown
//! state and the handle should be released, not configured again.
use crate::line::{Baud, DataBits, LineConfig, Parity, ReadPolicy, StopBits};
use crate::serialport::LineHandle;
use crate::termios::{flush_queues, get_termios, read_timing, set_read_timing, set_termios};
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::termios::{
    cfgetispeed, cfgetospeed, cfsetispeed, cfsetospeed, ControlFlags, InputFlags, LocalFlags,
    OutputFlags, Termios,
};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("tcgetattr failed: {0}")]
    QueryFailed(Errno),
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(Baud),
    #[error("tcsetattr failed: {0}")]
    CommitFailed(Errno),
}

/// Configure the line behind `handle` to match `config`.
///
/// `tcsetattr` succeeds when any part of the change was taken, so a driver
/// may quietly adjust the frame (a pty always runs 8 data bits, no parity).
/// Use [`verify`] when the exact shape matters.
pub fn apply(handle: &mut LineHandle, config: &LineConfig) -> Result<(), ConfigError> {
    let fd = handle.fd().map_err(ConfigError::QueryFailed)?;
    let base = get_termios(fd).map_err(|e| {
        warn!("{}: tcgetattr: {}", handle.path().display(), e);
        ConfigError::QueryFailed(e)
    })?;
    let settings = build(base, config)?;
    commit(handle, &settings)?;

    debug!("{}: configured {}", handle.path().display(), config);
    Ok(())
}

/// Drop anything queued under the old framing, then set `settings` at once.
/// On failure the line state is unknown and the handle should be released.
pub fn commit(handle: &LineHandle, settings: &Termios) -> Result<(), ConfigError> {
    let fd = handle.fd().map_err(ConfigError::CommitFailed)?;
    flush_queues(fd).map_err(|e| {
        warn!("{}: tcflush: {}", handle.path().display(), e);
        ConfigError::CommitFailed(e)
    })?;
    set_termios(fd, settings).map_err(|e| {
        warn!("{}: tcsetattr: {}", handle.path().display(), e);
        ConfigError::CommitFailed(e)
    })
}

/// Read the line back and check it runs exactly as `config` asks.
pub fn verify(handle: &LineHandle, config: &LineConfig) -> Result<bool, ConfigError> {
    let active = query(handle)?;
    if !active.matches(config) {
        warn!(
            "{}: asked for {}, line runs {}",
            handle.path().display(),
            config,
            active
        );
        return Ok(false);
    }
    Ok(true)
}

/// Build the attribute set for `config`.
///
/// Every mode flag of `base` is discarded; only the fields this crate does
/// not manage (the remaining control characters) carry over.
pub fn build(base: Termios, config: &LineConfig) -> Result<Termios, ConfigError> {
    let mut settings = base;

    settings.input_flags = InputFlags::empty();
    settings.output_flags = OutputFlags::empty();
    settings.control_flags = ControlFlags::empty();
    settings.local_flags = LocalFlags::empty();

    settings.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
    settings.control_flags &= !ControlFlags::CSIZE;
    // raw bytes, no line editing or signals
    settings.local_flags &= !(LocalFlags::ICANON
        | LocalFlags::ECHO
        | LocalFlags::ECHOE
        | LocalFlags::ECHONL
        | LocalFlags::ISIG);
    settings.output_flags &= !OutputFlags::OPOST;
    // no flow control
    settings.input_flags &= !(InputFlags::IXON | InputFlags::IXOFF | InputFlags::IXANY);
    settings.control_flags &= !ControlFlags::CRTSCTS;

    let baud = config.baud();
    let rate = baud
        .hardware_rate()
        .ok_or(ConfigError::UnsupportedBaud(baud))?;
    cfsetispeed(&mut settings, rate).map_err(|_| ConfigError::UnsupportedBaud(baud))?;
    cfsetospeed(&mut settings, rate).map_err(|_| ConfigError::UnsupportedBaud(baud))?;

    settings.control_flags |= match config.data_bits() {
        DataBits::Five => ControlFlags::CS5,
        DataBits::Six => ControlFlags::CS6,
        DataBits::Seven => ControlFlags::CS7,
        DataBits::Eight => ControlFlags::CS8,
    };

    match config.parity() {
        Parity::None => {
            settings.control_flags &= !(ControlFlags::PARENB | ControlFlags::PARODD);
            settings.input_flags &= !InputFlags::INPCK;
        }
        Parity::Odd => {
            settings.control_flags |= ControlFlags::PARENB | ControlFlags::PARODD;
            settings.input_flags |= InputFlags::INPCK;
        }
        Parity::Even => {
            settings.control_flags |= ControlFlags::PARENB;
            settings.control_flags &= !ControlFlags::PARODD;
            settings.input_flags |= InputFlags::INPCK;
        }
    }

    match config.stop_bits() {
        StopBits::One => settings.control_flags &= !ControlFlags::CSTOPB,
        StopBits::Two => settings.control_flags |= ControlFlags::CSTOPB,
    }

    let policy = config.read_policy();
    set_read_timing(&mut settings, policy.min_bytes(), policy.vtime());

    Ok(settings)
}

/// Rate, frame shape and read timing currently active on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveLine {
    /// `None` when the line runs at a rate outside the supported set.
    pub input_baud: Option<Baud>,
    pub output_baud: Option<Baud>,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub read_policy: ReadPolicy,
}

impl ActiveLine {
    /// True when the line runs exactly as `config` asks.
    pub fn matches(&self, config: &LineConfig) -> bool {
        self.input_baud == Some(config.baud())
            && self.output_baud == Some(config.baud())
            && self.data_bits == config.data_bits()
            && self.parity == config.parity()
            && self.stop_bits == config.stop_bits()
            && self.read_policy == config.read_policy()
    }
}

impl fmt::Display for ActiveLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.input_baud, self.output_baud) {
            (Some(i), Some(o)) if i == o => write!(f, "{}", i)?,
            (i, o) => write!(f, "in {} out {}", rate_name(i), rate_name(o))?,
        }
        write!(
            f,
            " {}{}{} (vmin {}, vtime {})",
            self.data_bits.bits(),
            self.parity.letter(),
            self.stop_bits.bits(),
            self.read_policy.min_bytes(),
            self.read_policy.vtime()
        )
    }
}

fn rate_name(baud: Option<Baud>) -> String {
    baud.map(|b| b.to_string())
        .unwrap_or_else(|| "unsupported".to_string())
}

/// Read back what the line is currently set to.
pub fn query(handle: &LineHandle) -> Result<ActiveLine, ConfigError> {
    let fd = handle.fd().map_err(ConfigError::QueryFailed)?;
    let settings = get_termios(fd).map_err(ConfigError::QueryFailed)?;
    Ok(decode(&settings))
}

pub fn decode(settings: &Termios) -> ActiveLine {
    let flags = settings.control_flags;
    let size = flags & ControlFlags::CSIZE;
    let data_bits = if size == ControlFlags::CS8 {
        DataBits::Eight
    } else if size == ControlFlags::CS7 {
        DataBits::Seven
    } else if size == ControlFlags::CS6 {
        DataBits::Six
    } else {
        DataBits::Five
    };
    let parity = if !flags.contains(ControlFlags::PARENB) {
        Parity::None
    } else if flags.contains(ControlFlags::PARODD) {
        Parity::Odd
    } else {
        Parity::Even
    };
    let stop_bits = if flags.contains(ControlFlags::CSTOPB) {
        StopBits::Two
    } else {
        StopBits::One
    };
    let (vmin, vtime) = read_timing(settings);

    ActiveLine {
        input_baud: Baud::from_hardware_rate(cfgetispeed(settings)),
        output_baud: Baud::from_hardware_rate(cfgetospeed(settings)),
        data_bits,
        parity,
        stop_bits,
        read_policy: ReadPolicy::from_raw(vmin, vtime),
    }
}
