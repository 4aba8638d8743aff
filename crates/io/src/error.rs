//! IO errors.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tree table {path}: {reason}")]
    MalformedTable { path: PathBuf, reason: String },

    #[error("malformed snapshot list {path}: {reason}")]
    MalformedSnapList { path: PathBuf, reason: String },

    #[error("decode failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
