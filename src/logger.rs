//! Console logger for the brain terminal.
//!
//! Implements the [`log`] facade. Each record is printed as
//!
//! ```text
//! INFO [12.345s] linebreakers::line_follow - line_follow: Primary sensor, midpoint 50.00, target 360 deg
//! ```

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use vexide::{io::println, time::user_uptime};

pub struct BrainLogger;

impl log::Log for BrainLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let uptime = user_uptime();
            println!(
                "{} [{}.{:03}s] {} - {}",
                record.level(),
                uptime.as_secs(),
                uptime.subsec_millis(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: BrainLogger = BrainLogger;

/// Installs the logger. Call once, before the first log macro.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
