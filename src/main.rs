use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::process;
use ttyline::config::Settings;
use ttyline::exchange::{self, Exchange};
use ttyline::{acquire, apply, query, release, verify, LineHandle};

mod commandline;

use commandline::{Args, Command};

const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

fn settings(args: &Args) -> Result<Settings> {
    let file = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Error processing config file {}", path.display()))?,
        None => Settings::default(),
    };
    Ok(args.settings().or(file))
}

fn run(args: Args) -> Result<()> {
    let settings = settings(&args)?;
    let device = settings
        .device
        .clone()
        .unwrap_or_else(|| DEFAULT_DEVICE.to_string());
    let config = settings.line_config();

    let mut handle =
        acquire(&device).with_context(|| format!("Cannot open line device {}", device))?;

    match args.command {
        Command::Check => println!("{}: tty device test ok.", device),
        Command::Show => show(&handle)?,
        Command::Configure => {
            apply(&mut handle, &config).with_context(|| format!("Cannot configure {}", device))?;
            if !verify(&handle, &config).context("Cannot read line settings")? {
                warn!("{}: driver did not take {} as given", device, config);
            }
            show(&handle)?;
        }
        Command::Test {
            rounds,
            interval,
            length,
            fill,
        } => {
            apply(&mut handle, &config).with_context(|| format!("Cannot configure {}", device))?;
            info!("{}: {}", device, config);
            let exchange = Exchange::new()
                .frame_len(length)
                .fill(fill)
                .interval(interval)
                .rounds(rounds);
            exchange
                .run(&mut handle, |round| {
                    println!("wrote {} bytes already.", round.written);
                    println!("read {} bytes already.", round.received.len());
                    println!("*************************");
                    println!("{}", exchange::hex(&round.received));
                    println!("*************************");
                })
                .with_context(|| format!("Exchange on {} failed", device))?;
        }
    }

    release(handle).with_context(|| format!("Cannot close {}", device))?;
    Ok(())
}

fn show(handle: &LineHandle) -> Result<()> {
    let active = query(handle).context("Cannot read line settings")?;
    println!("{}: {}", handle.path().display(), active);
    Ok(())
}

fn main() {
    let args = Args::parse();
    let _log_handle =
        match ttyline::logger::init(args.verbose.log_level_filter(), args.log_file.as_deref()) {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("Error starting logger: {}", e);
                process::exit(1);
            }
        };

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
