//! Configure, exercise and release a serial line.
//!
//! ```no_run
//! use ttyline::{acquire, apply, release, LineConfig, Parity};
//!
//! let mut handle = acquire("/dev/ttyUSB0")?;
//! apply(&mut handle, &LineConfig::new(9600, 8, Parity::None, 1)?)?;
//! release(handle)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod config;
pub mod configurator;
pub mod exchange;
pub mod line;
pub mod logger;
pub mod serialport;
mod termios;

#[cfg(test)]
mod pty;

pub use configurator::{apply, commit, query, verify, ActiveLine, ConfigError};
pub use line::{Baud, DataBits, LineConfig, LineConfigError, Parity, ReadPolicy, StopBits};
pub use serialport::{acquire, release, CloseError, LineHandle, OpenError};
