use std::{num::NonZeroUsize, thread};

use crate::{Error, Result};

pub const DEFAULT_DELIMITER: u8 = b';';
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Settings for a single aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Byte separating the station name from the temperature
    pub delimiter: u8,
    /// Number of worker threads used for file input. One means the
    /// sequential single-pass path.
    pub threads: NonZeroUsize,
    /// Records consumed between two progress notifications
    pub progress_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            threads: NonZeroUsize::MIN,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl Config {
    /// One worker per available core.
    pub fn parallel() -> Self {
        Self {
            threads: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            ..Self::default()
        }
    }

    pub fn with_delimiter(self, delimiter: char) -> Result<Self> {
        if !delimiter.is_ascii() || delimiter == '\n' || delimiter == '\r' {
            return Err(Error::InvalidDelimiter(delimiter));
        }
        Ok(Self {
            delimiter: delimiter as u8,
            ..self
        })
    }

    pub fn with_threads(self, threads: NonZeroUsize) -> Self {
        Self { threads, ..self }
    }

    pub fn with_progress_interval(self, progress_interval: u64) -> Self {
        Self {
            progress_interval: progress_interval.max(1),
            ..self
        }
    }
}
