use std::collections::BTreeMap;

use crate::container::{Container, ContainerID};

use super::Result;

/// Registered containers keyed by id, in id order.
pub type ContainerMap = BTreeMap<ContainerID, Container>;

/// Durable storage of the registered container set.
pub trait RegistryPersister: Send + Sync {
    /// Loads the stored set, or `None` if nothing has been stored yet.
    fn load(&self) -> Result<Option<ContainerMap>>;

    /// Replaces the stored set with `containers`.
    fn store(&self, containers: &ContainerMap) -> Result<()>;
}
