use std::path::PathBuf;

use crate::fsutil::FileError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read registry document: {0}")]
    Read(#[source] FileError),
    #[error("failed to decode registry document `{path}`: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode registry document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write registry document: {0}")]
    Write(#[source] FileError),
}

pub type Result<T> = std::result::Result<T, Error>;
