#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid container id `{0}`: must not be empty")]
    EmptyContainerID(String),
    #[error("invalid container id `{0}`: longer than {max} bytes", max = super::CONTAINER_ID_MAX_LEN)]
    ContainerIDTooLong(String),
    #[error("invalid container id `{0}`: not usable as a cgroup directory name")]
    InvalidContainerID(String),
}
pub type Result<T> = std::result::Result<T, Error>;
