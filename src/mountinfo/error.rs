use std::path::PathBuf;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    File(#[from] fsutil::FileError),
    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse line in file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: super::parser::ParseError,
    },
    #[error("no cgroup v1 mount of subsystem `{subsystem}` found in file `{path}`")]
    MissingCgroupMount { subsystem: String, path: PathBuf },
    #[error("cgroup mount point `{mount_point}` has no parent directory")]
    NoHierarchyRoot { mount_point: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
