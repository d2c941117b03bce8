//! `log` backend for the browser console.

use leptos::leptos_dom::logging::{console_error, console_log, console_warn};
use log::{Level, LevelFilter, Log, Metadata, Record};

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        match record.level() {
            Level::Error => console_error(&line),
            Level::Warn => console_warn(&line),
            _ => console_log(&line),
        }
    }

    fn flush(&self) {}
}

/// Installs the console logger. Later calls are ignored.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::*;

    #[test]
    fn init_installs_console_logger_at_level() {
        init(LevelFilter::Warn);
        assert!(log::log_enabled!(Level::Warn));
        assert!(!log::log_enabled!(Level::Info));
        log::warn!("console logger installed");

        // a second logger cannot replace it, and the level stays put
        init(LevelFilter::Trace);
        assert!(!log::log_enabled!(Level::Info));
    }
}
