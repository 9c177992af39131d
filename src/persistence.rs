mod error;
mod json;
mod persister;

pub use error::{Error, Result};
pub use json::JsonFilePersister;
pub use persister::{ContainerMap, RegistryPersister};
