//! The authoritative set of containers under management.

use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

use crate::container::{Container, ContainerID};
use crate::persistence::{self, ContainerMap, RegistryPersister};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load registered containers: {0}")]
    Load(#[source] persistence::Error),
    #[error("failed to persist registered containers: {0}")]
    Persist(#[source] persistence::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Registered containers, shared between the control API and the monitoring loop.
///
/// Every add and remove is written through to the persister before it returns. Mutations
/// that persist are serialized by a writer lock, so the map and the stored document never
/// diverge; a failed write rolls the mutation back.
pub struct ContainerRegistry {
    containers: DashMap<ContainerID, Container>,
    persister: Box<dyn RegistryPersister>,
    write_lock: Mutex<()>,
}

impl ContainerRegistry {
    /// Opens the registry stored by `persister`. A persister without a stored set yields an
    /// empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the stored set exists but cannot be loaded.
    pub fn open(persister: impl RegistryPersister + 'static) -> Result<Self> {
        let containers = persister
            .load()
            .map_err(Error::Load)?
            .unwrap_or_default()
            .into_iter()
            .collect();

        Ok(Self {
            containers,
            persister: Box::new(persister),
            write_lock: Mutex::new(()),
        })
    }

    /// Adds `container` unless its id is already registered.
    ///
    /// Returns `Ok(false)` if the id was already registered; the registry is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persist`] if the new set can't be stored; the insert is undone.
    pub fn add(&self, container: Container) -> Result<bool> {
        let _guard = self.lock_writer();
        if self.containers.contains_key(&container.id) {
            return Ok(false);
        }

        let id = container.id.clone();
        self.containers.insert(id.clone(), container);
        if let Err(err) = self.persist() {
            self.containers.remove(&id);
            return Err(err);
        }
        log::info!("Registered container {}", id);
        Ok(true)
    }

    /// Removes the container with `id`.
    ///
    /// Returns `Ok(false)` if it was not registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persist`] if the new set can't be stored; the removal is undone.
    pub fn remove(&self, id: &ContainerID) -> Result<bool> {
        let _guard = self.lock_writer();
        let Some((id, container)) = self.containers.remove(id) else {
            return Ok(false);
        };

        if let Err(err) = self.persist() {
            self.containers.insert(id, container);
            return Err(err);
        }
        log::info!("Unregistered container {}", id);
        Ok(true)
    }

    pub fn get(&self, id: &ContainerID) -> Option<Container> {
        self.containers.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &ContainerID) -> bool {
        self.containers.contains_key(id)
    }

    /// All registered containers in id order.
    pub fn all(&self) -> Vec<Container> {
        self.snapshot().into_values().collect()
    }

    /// All registered ids in ascending order.
    pub fn ids(&self) -> Vec<ContainerID> {
        let mut ids: Vec<_> = self
            .containers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Applies `f` to the registered container with `id` in place.
    ///
    /// Observed state such as usage ratios is not persisted. Returns `false` if `id` is not
    /// registered.
    pub fn update<F>(&self, id: &ContainerID, f: F) -> bool
    where
        F: FnOnce(&mut Container),
    {
        match self.containers.get_mut(id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> ContainerMap {
        self.containers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn persist(&self) -> Result<()> {
        self.persister
            .store(&self.snapshot())
            .map_err(Error::Persist)
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        // the lock guards no data, so a poisoned lock is still usable
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsutil::FileError;
    use crate::persistence::JsonFilePersister;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn container(id: &str) -> Container {
        Container::new(ContainerID::new(id).unwrap(), "docker", format!("/docker/{id}"))
    }

    fn id(raw: &str) -> ContainerID {
        ContainerID::new(raw).unwrap()
    }

    /// Persister whose writes fail while `fail` is set.
    #[derive(Default)]
    struct FlakyPersister {
        fail: Arc<AtomicBool>,
    }

    impl RegistryPersister for FlakyPersister {
        fn load(&self) -> persistence::Result<Option<ContainerMap>> {
            Ok(None)
        }

        fn store(&self, _containers: &ContainerMap) -> persistence::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(persistence::Error::Write(FileError::Write {
                    path: "registered".into(),
                    source: std::io::Error::other("disk full"),
                }));
            }
            Ok(())
        }
    }

    #[test]
    fn test_open_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ContainerRegistry::open(JsonFilePersister::new(dir.path().join("r"))).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_open_corrupt_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registered");
        std::fs::write(&path, "not json").unwrap();

        let err = ContainerRegistry::open(JsonFilePersister::new(&path)).err().unwrap();
        assert!(matches!(err, Error::Load(_)));
    }

    #[test]
    fn test_add_remove_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registered");
        let registry = ContainerRegistry::open(JsonFilePersister::new(&path)).unwrap();

        assert!(registry.add(container("abc")).unwrap());
        assert!(!registry.add(container("abc")).unwrap());
        assert!(registry.add(container("def")).unwrap());
        assert_eq!(registry.ids(), vec![id("abc"), id("def")]);

        let reopened = ContainerRegistry::open(JsonFilePersister::new(&path)).unwrap();
        assert_eq!(reopened.all(), registry.all());

        assert!(registry.remove(&id("abc")).unwrap());
        assert!(!registry.remove(&id("abc")).unwrap());

        let reopened = ContainerRegistry::open(JsonFilePersister::new(&path)).unwrap();
        assert_eq!(reopened.ids(), vec![id("def")]);
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let persister = FlakyPersister::default();
        let fail = Arc::clone(&persister.fail);
        let registry = ContainerRegistry::open(persister).unwrap();

        assert!(registry.add(container("keep")).unwrap());

        fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            registry.add(container("new")),
            Err(Error::Persist(_))
        ));
        assert!(!registry.contains(&id("new")));

        assert!(matches!(
            registry.remove(&id("keep")),
            Err(Error::Persist(_))
        ));
        assert!(registry.contains(&id("keep")));

        fail.store(false, Ordering::SeqCst);
        assert!(registry.remove(&id("keep")).unwrap());
    }

    #[test]
    fn test_update_in_place() {
        let registry = ContainerRegistry::open(FlakyPersister::default()).unwrap();
        registry.add(container("abc")).unwrap();

        assert!(registry.update(&id("abc"), |c| c.cpu_usage_long = 42.0));
        assert!(!registry.update(&id("missing"), |c| c.cpu_usage_long = 1.0));
        assert_eq!(registry.get(&id("abc")).unwrap().cpu_usage_long, 42.0);
    }

    #[test]
    fn test_concurrent_add_same_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registered");
        let registry =
            Arc::new(ContainerRegistry::open(JsonFilePersister::new(&path)).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.add(container("abc")).unwrap())
            })
            .collect();
        let added = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|added| *added)
            .count();

        assert_eq!(added, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_mutations_match_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registered");
        let registry =
            Arc::new(ContainerRegistry::open(JsonFilePersister::new(&path)).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..20 {
                        let raw = format!("c{}", i % 5);
                        if (i + t) % 2 == 0 {
                            registry.add(container(&raw)).unwrap();
                        } else {
                            registry.remove(&id(&raw)).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = ContainerRegistry::open(JsonFilePersister::new(&path)).unwrap();
        assert_eq!(reopened.ids(), registry.ids());
    }
}
