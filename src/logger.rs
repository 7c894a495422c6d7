// Copyright 2024 Google LLC.
// This project is dual-licensed under Apache 2.0 and MIT terms.
// See LICENSE-APACHE and LICENSE-MIT for details.

use crate::console::SharedConsole;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

impl<T: Send + Write> Log for SharedConsole<T> {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let console = &mut *self.console.lock();
        // Ignore errors writing to the console, there is nowhere to report them.
        let _ = writeln!(console, "[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {
        let _ = self.console.lock().flush();
    }
}

/// Initialises the logger with the given shared console.
pub fn init(console: &'static impl Log, max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(console)?;
    log::set_max_level(max_level);
    Ok(())
}

/// Maps the `-v`/`-q` counts to a level, starting from `Info`.
pub fn level_filter(verbose: u8, quiet: u8) -> LevelFilter {
    const LEVELS: [LevelFilter; 6] = [
        LevelFilter::Off,
        LevelFilter::Error,
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ];
    let level = (3 + i16::from(verbose) - i16::from(quiet)).clamp(0, 5);
    LEVELS[usize::try_from(level).unwrap_or(3)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn verbosity_flags() {
        assert_eq!(level_filter(0, 0), LevelFilter::Info);
        assert_eq!(level_filter(1, 0), LevelFilter::Debug);
        assert_eq!(level_filter(5, 0), LevelFilter::Trace);
        assert_eq!(level_filter(0, 1), LevelFilter::Warn);
        assert_eq!(level_filter(0, 9), LevelFilter::Off);
        assert_eq!(level_filter(2, 2), LevelFilter::Info);
    }

    #[test]
    fn formats_records() {
        let console = SharedConsole::new(Vec::new());
        console.log(
            &Record::builder()
                .level(Level::Error)
                .args(format_args!("dtc failed"))
                .build(),
        );
        assert_eq!(*console.console.lock(), b"[ERROR] dtc failed\n");
    }
}
