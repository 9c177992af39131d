use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::fsutil;

use super::subsystem::{CPUSET, SubsystemManager};
use super::{Error, Result};

/// Where a container's cgroup lives inside a subsystem hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Name of the directory holding the container's cgroup, e.g. `docker`.
    /// Empty if the cgroup sits directly under the subsystem root.
    pub kind: String,
    /// Path of the container's cgroup relative to the subsystem root, e.g. `/docker/<id>`.
    pub path: String,
}

/// Maps container ids to cgroup directories by walking subsystem hierarchies.
#[derive(Debug, Clone)]
pub struct CgroupResolver {
    subsystems: SubsystemManager,
}

impl CgroupResolver {
    pub fn new(subsystems: SubsystemManager) -> Self {
        Self { subsystems }
    }

    /// Returns the mount path of `subsystem`, if it is mounted.
    pub fn subsystem_path(&self, subsystem: &str) -> Option<&Path> {
        self.subsystems.subsystem_path(subsystem)
    }

    /// Collects every directory in the `subsystem` hierarchy that has a child directory named
    /// `container_id`.
    ///
    /// The walk does not descend into matching directories but does not stop at the first
    /// match either, so ids present at several nesting levels are all reported. Order is
    /// unspecified. Unreadable directories are skipped.
    pub fn find_container_parents(&self, subsystem: &str, container_id: &str) -> Vec<PathBuf> {
        let mut parents = Vec::new();
        let Some(root) = self.subsystems.subsystem_path(subsystem) else {
            return parents;
        };

        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    log::trace!("skipping unreadable cgroup `{}`: {}", dir.display(), err);
                    continue;
                }
            };
            for entry in entries.flatten() {
                if !entry.file_type().is_ok_and(|ft| ft.is_dir()) {
                    continue;
                }
                if entry.file_name() == container_id {
                    parents.push(dir.clone());
                } else {
                    stack.push(entry.path());
                }
            }
        }

        parents
    }

    /// Returns the full cgroup directory paths of `container_id` in `subsystem`.
    pub fn container_full_paths(&self, subsystem: &str, container_id: &str) -> Vec<PathBuf> {
        self.find_container_parents(subsystem, container_id)
            .into_iter()
            .map(|parent| parent.join(container_id))
            .collect()
    }

    /// Returns `true` if the container has a cgroup in the cpuset hierarchy.
    pub fn container_exists(&self, container_id: &str) -> bool {
        !self.find_container_parents(CPUSET, container_id).is_empty()
    }

    /// Returns the runtime namespace of the container, i.e. the name of the directory its
    /// cgroup lives in. Empty if the container is unknown or placed under the root.
    pub fn container_type(&self, container_id: &str) -> String {
        self.locate(container_id)
            .map(|placement| placement.kind)
            .unwrap_or_default()
    }

    /// Returns the cgroup-relative path of the container, e.g. `/docker/<id>`.
    pub fn container_path(&self, container_id: &str) -> Option<String> {
        self.locate(container_id).map(|placement| placement.path)
    }

    /// Resolves namespace and relative path of the container's first cpuset cgroup.
    pub fn locate(&self, container_id: &str) -> Option<Placement> {
        let root = self.subsystems.subsystem_path(CPUSET)?;
        let parent = self
            .find_container_parents(CPUSET, container_id)
            .into_iter()
            .next()?;
        let relative = parent.strip_prefix(root).ok()?;

        let kind = relative
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut path = String::new();
        for component in relative.iter().chain([OsStr::new(container_id)]) {
            path.push('/');
            path.push_str(&component.to_string_lossy());
        }

        Some(Placement { kind, path })
    }

    /// Reads a cpuset control file (e.g. `cpuset.cpus`) of the container
    /// `<cpuset root>/<kind>/<container_id>`.
    ///
    /// # Errors
    ///
    /// - [`Error::SubsystemNotMounted`] if the cpuset subsystem is not mounted.
    /// - [`Error::ControlFile`] if the file cannot be read.
    pub fn read_core_assignment(&self, kind: &str, container_id: &str, file: &str) -> Result<String> {
        let root = self
            .subsystems
            .subsystem_path(CPUSET)
            .ok_or_else(|| Error::SubsystemNotMounted(CPUSET.to_owned()))?;
        let mut path = root.to_path_buf();
        if !kind.is_empty() {
            path.push(kind);
        }
        path.push(container_id);
        path.push(file);

        fsutil::read_trimmed(path).map_err(Error::ControlFile)
    }

    /// Restores the default resource settings of the container in every mounted subsystem.
    ///
    /// No subsystem defines a reset yet, so this only verifies that the container exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerNotFound`] if no mounted subsystem has a cgroup for the container.
    pub fn reset_cgroup(&self, container_id: &str) -> Result<()> {
        let mut found = false;
        for subsystem in self.subsystems.subsystems() {
            for path in self.container_full_paths(subsystem, container_id) {
                found = true;
                reset_subsystem(subsystem, &path);
            }
        }

        if found {
            Ok(())
        } else {
            Err(Error::ContainerNotFound {
                subsystem: CPUSET.to_owned(),
                container_id: container_id.to_owned(),
            })
        }
    }
}

fn reset_subsystem(subsystem: &str, path: &Path) {
    match subsystem {
        CPUSET => log::debug!("no cpuset reset defined for `{}`", path.display()),
        _ => log::debug!("unsupported subsystem `{}`", subsystem),
    }
}
