//! Write/read test loop run against a configured line.
//!
//! Each round writes one frame of identical bytes, then reads back whatever
//! the line has for us. How long the read waits is down to the line's
//! read policy, so with the default policy a round never blocks on input.
use log::{debug, info};
use std::fmt::Write as _;
use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

pub const DEFAULT_FRAME_LEN: usize = 100;
pub const DEFAULT_FILL: u8 = 0x32;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    frame_len: usize,
    fill: u8,
    interval: Duration,
    rounds: Option<u64>,
}

/// Outcome of a single round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub index: u64,
    pub written: usize,
    pub received: Vec<u8>,
}

impl Default for Exchange {
    fn default() -> Self {
        Exchange {
            frame_len: DEFAULT_FRAME_LEN,
            fill: DEFAULT_FILL,
            interval: DEFAULT_INTERVAL,
            rounds: None,
        }
    }
}

impl Exchange {
    pub fn new() -> Exchange {
        Exchange::default()
    }

    pub fn frame_len(mut self, frame_len: usize) -> Exchange {
        self.frame_len = frame_len;
        self
    }

    pub fn fill(mut self, fill: u8) -> Exchange {
        self.fill = fill;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Exchange {
        self.interval = interval;
        self
    }

    /// Stop after `rounds` rounds. `None` runs until an I/O error.
    pub fn rounds(mut self, rounds: Option<u64>) -> Exchange {
        self.rounds = rounds;
        self
    }

    pub fn frame(&self) -> Vec<u8> {
        vec![self.fill; self.frame_len]
    }

    /// Write one frame and read at most one frame's worth back.
    pub fn round<P: Read + Write>(&self, port: &mut P, index: u64) -> io::Result<Round> {
        let written = port.write(&self.frame())?;
        debug!("wrote {} bytes already.", written);

        let mut buf = vec![0u8; self.frame_len];
        let n = port.read(&mut buf)?;
        buf.truncate(n);
        debug!("read {} bytes already.", n);

        Ok(Round {
            index,
            written,
            received: buf,
        })
    }

    /// Run rounds, handing each to `report`, sleeping between rounds.
    /// Returns the number of completed rounds.
    pub fn run<P, F>(&self, port: &mut P, mut report: F) -> io::Result<u64>
    where
        P: Read + Write,
        F: FnMut(&Round),
    {
        info!(
            "exchanging {} x {:#04x} every {:?}",
            self.frame_len, self.fill, self.interval
        );
        let mut index = 0;
        loop {
            if let Some(limit) = self.rounds {
                if index >= limit {
                    break;
                }
            }
            let round = self.round(port, index)?;
            report(&round);
            index += 1;

            let more = self.rounds.map_or(true, |limit| index < limit);
            if more && !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }
        Ok(index)
    }
}

/// Render bytes as ` 0x32 0x32 ...`
pub fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 5);
    for b in bytes {
        let _ = write!(s, " 0x{:02x}", b);
    }
    s
}
