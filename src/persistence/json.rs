use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::fsutil;

use super::{ContainerMap, Error, RegistryPersister, Result};

/// Stores the registry as one tab-indented JSON object mapping ids to containers.
///
/// Writes go to a sibling temporary file that is then renamed over the document, so a
/// crash never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct JsonFilePersister {
    path: PathBuf,
}

impl JsonFilePersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryPersister for JsonFilePersister {
    fn load(&self) -> Result<Option<ContainerMap>> {
        let content = match fsutil::read_trimmed(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No registry document at `{}`", self.path.display());
                return Ok(None);
            }
            Err(err) => return Err(Error::Read(err)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| Error::Decode {
                path: self.path.clone(),
                source,
            })
    }

    fn store(&self, containers: &ContainerMap) -> Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut buf = Vec::with_capacity(512 * containers.len().max(1));
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        containers
            .serialize(&mut serializer)
            .map_err(Error::Encode)?;

        fsutil::replace_file(&self.path, &buf).map_err(Error::Write)
    }
}
