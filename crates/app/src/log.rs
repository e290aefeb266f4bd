use std::{
    collections::VecDeque,
    io::Write,
    sync::{Arc, Mutex},
};

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use serde::{Deserialize, Serialize};

pub static LOG: Mutex<Option<Arc<dyn Repository>>> = Mutex::new(None);

/// Number of entries kept in memory.
pub const CAPACITY: usize = 100;

#[allow(clippy::missing_errors_doc)]
pub trait Repository: Send + Sync + 'static {
    fn read_entries(&self) -> Result<VecDeque<Entry>, Error>;
    fn write_entry(&self, entry: Entry) -> Result<(), Error>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub time: String,
    #[serde(with = "LevelDef")]
    pub level: Level,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "Level")]
pub enum LevelDef {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Most recent entries first.
#[derive(Default)]
pub struct Buffer {
    entries: Mutex<VecDeque<Entry>>,
}

impl Repository for Buffer {
    fn read_entries(&self) -> Result<VecDeque<Entry>, Error> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .map_err(|err| Error::Unknown(err.to_string()))
    }

    fn write_entry(&self, entry: Entry) -> Result<(), Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| Error::Unknown(err.to_string()))?;
        entries.push_front(entry);
        entries.truncate(CAPACITY);
        Ok(())
    }
}

static LOGGER: Logger = Logger;

/// # Errors
///
/// Returns an error if the logger has already been initialized.
pub fn init(storage: Arc<dyn Repository>, level: LevelFilter) -> Result<(), SetLoggerError> {
    if let Ok(mut log) = LOG.lock() {
        *log = Some(storage);
    }
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

struct Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = Entry {
            time: Local::now().format("%b %d %H:%M:%S").to_string(),
            level: record.level(),
            message: record.args().to_string(),
        };
        let _ = writeln!(
            std::io::stderr(),
            "{} {:<5} {}",
            entry.time,
            entry.level,
            entry.message
        );

        if let Ok(log) = LOG.lock() {
            if let Some(ref log) = *log {
                let _ = log.write_entry(entry);
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(message: &str) -> Entry {
        Entry {
            time: String::from("Mar 02 18:00:00"),
            level: Level::Info,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_buffer_most_recent_first() {
        let buffer = Buffer::default();
        buffer.write_entry(entry("a")).unwrap();
        buffer.write_entry(entry("b")).unwrap();

        assert_eq!(
            buffer.read_entries().unwrap(),
            VecDeque::from([entry("b"), entry("a")])
        );
    }

    #[test]
    fn test_buffer_capacity() {
        let buffer = Buffer::default();
        for i in 0..=CAPACITY {
            buffer.write_entry(entry(&i.to_string())).unwrap();
        }

        let entries = buffer.read_entries().unwrap();
        assert_eq!(entries.len(), CAPACITY);
        assert_eq!(entries[0], entry(&CAPACITY.to_string()));
        assert_eq!(entries[CAPACITY - 1], entry("1"));
    }

    #[test]
    fn test_entry_serialization() {
        assert_eq!(
            serde_json::to_string(&entry("x")).unwrap(),
            r#"{"time":"Mar 02 18:00:00","level":"Info","message":"x"}"#
        );
    }
}
