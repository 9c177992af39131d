use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod error;
mod record;

pub use error::{Error, Result};
pub use record::{CgroupCpu, CgroupCpuSet, CgroupInfo, Container};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// A validated container identifier.
///
/// Container ids are opaque to the warden, but they are used as cgroup directory
/// names, so they must be a single, non-empty path segment.
///
/// # Examples
///
/// ```
/// # use cpu_warden::container::ContainerID;
/// let container_id = ContainerID::new("3f1c9a0e7b2d").unwrap();
/// assert_eq!(container_id.as_ref(), "3f1c9a0e7b2d");
/// assert!(ContainerID::new("../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyContainerID`] if the input is empty.
    /// - [`Error::ContainerIDTooLong`] if the input exceeds [`CONTAINER_ID_MAX_LEN`] bytes.
    /// - [`Error::InvalidContainerID`] if the input contains `/`, a NUL byte, or is `.`/`..`.
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() {
            return Err(Error::EmptyContainerID(src.to_owned()));
        }
        if src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::ContainerIDTooLong(src.to_owned()));
        }
        if src == "." || src == ".." || src.contains(['/', '\0']) {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContainerID {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for ContainerID {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ContainerID {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
