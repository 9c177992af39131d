use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cgroup subsystem `{0}` is not mounted")]
    SubsystemNotMounted(String),
    #[error("failed to read control file: {0}")]
    ControlFile(#[source] fsutil::FileError),
    #[error("container `{container_id}` has no cgroup under `{subsystem}`")]
    ContainerNotFound {
        subsystem: String,
        container_id: String,
    },
}

impl Error {
    /// Returns `true` if the error means the requested cgroup (or its file) does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::SubsystemNotMounted(_) | Error::ContainerNotFound { .. } => true,
            Error::ControlFile(err) => err.kind() == std::io::ErrorKind::NotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
