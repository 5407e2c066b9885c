use std::{io, path::Path};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be opened or failed mid-read.
    #[error("cannot read {origin}: {source}")]
    StreamUnreadable {
        origin: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid delimiter {0:?}: expected a single ASCII character other than a line break")]
    InvalidDelimiter(char),

    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl Error {
    pub(crate) fn unreadable_path(path: &Path, source: io::Error) -> Self {
        Self::StreamUnreadable {
            origin: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn unreadable_stream(source: io::Error) -> Self {
        Self::StreamUnreadable {
            origin: "input stream".to_owned(),
            source,
        }
    }

    pub fn is_stream_unreadable(&self) -> bool {
        matches!(self, Self::StreamUnreadable { .. })
    }
}
