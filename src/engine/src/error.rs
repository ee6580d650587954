use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while evaluating or executing an entry.
///
/// None of these are fatal to the process; callers log them at the point of
/// occurrence and move on to the next file or entry.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid size '{input}'")]
    InvalidSize { input: String },

    #[error("Invalid age '{input}': {reason}")]
    InvalidAge { input: String, reason: &'static str },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported compression format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to compress {}: {source}", path.display())]
    CompressionIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Retention failure on {}: {source}", path.display())]
    RetentionIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to schedule entry {entry} with '{schedule}': {reason}")]
    Scheduling {
        entry: String,
        schedule: String,
        reason: String,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn compression(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::CompressionIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn retention(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::RetentionIo {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a malformed-input error rather than a filesystem one.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidSize { .. } | Error::InvalidAge { .. } | Error::Glob { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
