use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;
use std::time::Duration;
use ttyline::config::Settings;
use ttyline::exchange;
use ttyline::{Baud, DataBits, Parity, StopBits};

#[derive(Parser, Debug)]
#[command(version, about = "Serial line configuration and test tool")]
pub struct Args {
    /// Settings file with `key=value` lines; flags take precedence.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Line device, "/dev/ttyUSB0" when not set anywhere.
    #[arg(short, long, global = true)]
    pub device: Option<String>,

    /// Supported values: 300, 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200.
    #[arg(short, long, global = true)]
    pub baud: Option<Baud>,

    /// 5, 6, 7 or 8
    #[arg(long, global = true)]
    pub data_bits: Option<DataBits>,

    /// n, o or e (any case)
    #[arg(short, long, global = true)]
    pub parity: Option<Parity>,

    /// 1 or 2
    #[arg(short, long, global = true)]
    pub stop_bits: Option<StopBits>,

    /// Minimum number of bytes a read waits for.
    #[arg(long, global = true)]
    pub vmin: Option<u8>,

    /// Read timeout in deciseconds.
    #[arg(long, global = true)]
    pub vtime: Option<u8>,

    /// Append log output to this file instead of printing it.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Open the device and check that it is a tty.
    Check,
    /// Print the settings currently active on the line.
    Show,
    /// Apply the line settings and print the result.
    Configure,
    /// Apply the line settings, then repeatedly write a frame and read back.
    Test {
        /// Stop after this many rounds; runs until interrupted otherwise.
        #[arg(short, long)]
        rounds: Option<u64>,

        /// Pause between rounds.
        #[arg(short, long, default_value = "5s", value_parser = humantime::parse_duration)]
        interval: Duration,

        /// Bytes per frame.
        #[arg(short, long, default_value_t = exchange::DEFAULT_FRAME_LEN)]
        length: usize,

        /// Byte value the frame is filled with, decimal or 0x hex.
        #[arg(short, long, default_value = "0x32", value_parser = clap_num::maybe_hex::<u8>)]
        fill: u8,
    },
}

impl Args {
    /// Line settings given on the command line.
    pub fn settings(&self) -> Settings {
        Settings {
            device: self.device.clone(),
            baud: self.baud,
            data_bits: self.data_bits,
            parity: self.parity,
            stop_bits: self.stop_bits,
            vmin: self.vmin,
            vtime: self.vtime,
        }
    }
}
