//! This module provides logging to a file or to std out
//!
//! Records are written as `[<rfc3339 time>] [<LEVEL>] <message>`.
use chrono::Local;
use flexi_logger::{DeferredNow, FileSpec, FlexiLoggerError, Logger, LoggerHandle};
use log::{LevelFilter, Record};
use std::io::{self, Write};
use std::path::Path;

/// Line format shared by both sinks.
pub fn line_format(w: &mut dyn Write, _now: &mut DeferredNow, record: &Record) -> io::Result<()> {
    let dt = Local::now().to_rfc3339();
    write!(w, "[{}] [{}] {}", dt, record.level(), record.args())
}

/// Start logging at `level`, appending to `path` when given, otherwise to
/// std out. Keep the returned handle alive for as long as logs are wanted.
pub fn init(level: LevelFilter, path: Option<&Path>) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_str(level.as_str())?.format(line_format);
    let logger = match path {
        Some(p) => logger
            .log_to_file(FileSpec::try_from(p)?.suppress_timestamp())
            .append(),
        None => logger.log_to_stdout(),
    };
    logger.start()
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn render(level: Level, args: std::fmt::Arguments) -> String {
        let mut out = Vec::new();
        line_format(
            &mut out,
            &mut DeferredNow::new(),
            &Record::builder().level(level).args(args).build(),
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_line_format() {
        let line = render(Level::Warn, format_args!("line {} hung up", 0));
        assert!(line.ends_with("] [WARN] line 0 hung up"), "{}", line);
        let stamp = &line[1..line.find(']').unwrap()];
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "{}", stamp);
    }

    #[test]
    fn test_level_names() {
        assert!(render(Level::Error, format_args!("x")).contains("] [ERROR] x"));
        assert!(render(Level::Info, format_args!("y")).contains("] [INFO] y"));
    }
}
