//! Transmission parameters for a line: rate, frame shape and read timing.
//!
//! A [`LineConfig`] is only ever built from values that are individually
//! valid, so applying one can never leave a field half set.
use nix::sys::termios::BaudRate;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineConfigError {
    #[error("unsupported baud rate: {0}")]
    Baud(u32),
    #[error("unsupported data size: {0}")]
    DataBits(u8),
    #[error("unsupported parity: {0:?}")]
    Parity(String),
    #[error("unsupported stop bits: {0}")]
    StopBits(u8),
    #[error("invalid number: {0:?}")]
    Number(String),
}

/// Supported line rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Baud {
    B300,
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

/// Rate codes handed to the line discipline, one entry per [`Baud`].
static BAUD_TABLE: [(Baud, BaudRate); 9] = [
    (Baud::B115200, BaudRate::B115200),
    (Baud::B57600, BaudRate::B57600),
    (Baud::B38400, BaudRate::B38400),
    (Baud::B19200, BaudRate::B19200),
    (Baud::B9600, BaudRate::B9600),
    (Baud::B4800, BaudRate::B4800),
    (Baud::B2400, BaudRate::B2400),
    (Baud::B1200, BaudRate::B1200),
    (Baud::B300, BaudRate::B300),
];

impl Baud {
    pub const ALL: [Baud; 9] = [
        Baud::B300,
        Baud::B1200,
        Baud::B2400,
        Baud::B4800,
        Baud::B9600,
        Baud::B19200,
        Baud::B38400,
        Baud::B57600,
        Baud::B115200,
    ];

    /// Bits per second
    pub fn rate(self) -> u32 {
        match self {
            Baud::B300 => 300,
            Baud::B1200 => 1200,
            Baud::B2400 => 2400,
            Baud::B4800 => 4800,
            Baud::B9600 => 9600,
            Baud::B19200 => 19200,
            Baud::B38400 => 38400,
            Baud::B57600 => 57600,
            Baud::B115200 => 115200,
        }
    }

    /// Look up the hardware rate code for this rate.
    pub(crate) fn hardware_rate(self) -> Option<BaudRate> {
        BAUD_TABLE
            .iter()
            .find(|(baud, _)| *baud == self)
            .map(|(_, code)| *code)
    }

    /// Reverse lookup. Rates outside the supported set give `None`.
    pub(crate) fn from_hardware_rate(code: BaudRate) -> Option<Baud> {
        BAUD_TABLE
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(baud, _)| *baud)
    }
}

impl TryFrom<u32> for Baud {
    type Error = LineConfigError;

    fn try_from(rate: u32) -> Result<Self, Self::Error> {
        Baud::ALL
            .iter()
            .copied()
            .find(|b| b.rate() == rate)
            .ok_or(LineConfigError::Baud(rate))
    }
}

impl FromStr for Baud {
    type Err = LineConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rate = s
            .trim()
            .parse::<u32>()
            .map_err(|_| LineConfigError::Number(s.to_string()))?;
        Baud::try_from(rate)
    }
}

impl fmt::Display for Baud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rate())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub fn bits(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = LineConfigError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            n => Err(LineConfigError::DataBits(n)),
        }
    }
}

impl FromStr for DataBits {
    type Err = LineConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .trim()
            .parse::<u8>()
            .map_err(|_| LineConfigError::Number(s.to_string()))?;
        DataBits::try_from(bits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl Parity {
    /// Single letter used in the usual "8N1" shorthand
    pub fn letter(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

/// Accepts `n`, `o`, `e` or the full names, in any case.
impl FromStr for Parity {
    type Err = LineConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "none" => Ok(Parity::None),
            "o" | "odd" => Ok(Parity::Odd),
            "e" | "even" => Ok(Parity::Even),
            _ => Err(LineConfigError::Parity(s.to_string())),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Parity::None => "none",
            Parity::Odd => "odd",
            Parity::Even => "even",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    pub fn bits(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = LineConfigError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            n => Err(LineConfigError::StopBits(n)),
        }
    }
}

impl FromStr for StopBits {
    type Err = LineConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .trim()
            .parse::<u8>()
            .map_err(|_| LineConfigError::Number(s.to_string()))?;
        StopBits::try_from(bits)
    }
}

/// Non-canonical read timing (VMIN / VTIME).
///
/// NOTE: VTIME's units are deciseconds and it is a single byte, so the
/// longest timeout that can be expressed is 25.5 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadPolicy {
    vmin: u8,
    vtime: u8,
}

impl ReadPolicy {
    /// Return at once with whatever is buffered, possibly nothing.
    pub const IMMEDIATE: ReadPolicy = ReadPolicy { vmin: 0, vtime: 0 };

    pub fn new(min_bytes: u8, timeout: Duration) -> ReadPolicy {
        let vtime = {
            let sec = timeout.as_secs_f32();
            if sec > 25.5 {
                255
            } else {
                (sec * 10.0).round() as u8
            }
        };
        ReadPolicy {
            vmin: min_bytes,
            vtime,
        }
    }

    /// Build from raw VMIN and VTIME (deciseconds) values.
    pub fn from_raw(vmin: u8, vtime: u8) -> ReadPolicy {
        ReadPolicy { vmin, vtime }
    }

    pub fn min_bytes(&self) -> u8 {
        self.vmin
    }

    pub fn vtime(&self) -> u8 {
        self.vtime
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.vtime) * 100)
    }
}

impl Default for ReadPolicy {
    fn default() -> Self {
        ReadPolicy::IMMEDIATE
    }
}

/// Rate, frame shape and read timing for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineConfig {
    baud: Baud,
    data_bits: DataBits,
    parity: Parity,
    stop_bits: StopBits,
    read_policy: ReadPolicy,
}

impl LineConfig {
    /// Validate numeric parameters, e.g. `LineConfig::new(9600, 8, Parity::None, 1)`.
    pub fn new(
        baud: u32,
        data_bits: u8,
        parity: Parity,
        stop_bits: u8,
    ) -> Result<LineConfig, LineConfigError> {
        Ok(LineConfig::from_parts(
            Baud::try_from(baud)?,
            DataBits::try_from(data_bits)?,
            parity,
            StopBits::try_from(stop_bits)?,
        ))
    }

    pub fn from_parts(
        baud: Baud,
        data_bits: DataBits,
        parity: Parity,
        stop_bits: StopBits,
    ) -> LineConfig {
        LineConfig {
            baud,
            data_bits,
            parity,
            stop_bits,
            read_policy: ReadPolicy::IMMEDIATE,
        }
    }

    pub fn with_read_policy(mut self, read_policy: ReadPolicy) -> LineConfig {
        self.read_policy = read_policy;
        self
    }

    pub fn baud(&self) -> Baud {
        self.baud
    }

    pub fn data_bits(&self) -> DataBits {
        self.data_bits
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    pub fn stop_bits(&self) -> StopBits {
        self.stop_bits
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }
}

/// 9600 8N1, immediate reads.
impl Default for LineConfig {
    fn default() -> Self {
        LineConfig::from_parts(Baud::B9600, DataBits::Eight, Parity::None, StopBits::One)
    }
}

impl fmt::Display for LineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.baud,
            self.data_bits.bits(),
            self.parity.letter(),
            self.stop_bits.bits()
        )
    }
}
