// This module defines a super simple logger that works with the `log` crate.
// All we need is a level prefix and stderr output for our own crates, so no
// logging framework is pulled in for it.

use log::{self, Log};

/// Initialize a simple logger.
pub fn init() -> anyhow::Result<()> {
    log::set_logger(LOGGER)?;
    Ok(())
}

/// The simplest possible logger that logs to stderr.
///
/// Levels are filtered by the `log` crate's global max level. This logger
/// only filters by target, so that messages from dependencies are dropped.
#[derive(Debug)]
struct Logger(());

const LOGGER: &Logger = &Logger(());

impl Log for Logger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_log(record) {
            return;
        }
        eprintln!("{}: {}", record.level(), record.args());
    }

    fn flush(&self) {
        // eprintln! is unbuffered.
    }
}

fn should_log(record: &log::Record) -> bool {
    let t = record.target();
    t.starts_with("tmdb_analyze") || t.starts_with("tmdb_analysis")
}
