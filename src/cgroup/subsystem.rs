use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the cpuset subsystem.
pub const CPUSET: &str = "cpuset";

/// Subsystems the warden knows how to work with.
pub const SUPPORTED_SUBSYSTEMS: &[&str] = &[CPUSET];

/// Records which supported cgroup v1 subsystems are mounted and where.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SubsystemManager {
    paths: BTreeMap<String, PathBuf>,
}

impl SubsystemManager {
    /// Scans `cgroup_root` for directories named after supported subsystems.
    ///
    /// Symlinks (e.g. `cpu -> cpu,cpuacct`) are not followed. A missing or unreadable root
    /// yields a manager without subsystems, so that all later lookups report not-found.
    pub fn discover(cgroup_root: impl AsRef<Path>) -> Self {
        let cgroup_root = cgroup_root.as_ref();
        let mut paths = BTreeMap::new();

        let entries = match std::fs::read_dir(cgroup_root) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!(
                    "Cannot list cgroup root `{}`: {}",
                    cgroup_root.display(),
                    err
                );
                return Self { paths };
            }
        };

        for entry in entries.flatten() {
            let is_dir = entry.file_type().is_ok_and(|ft| ft.is_dir());
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_dir && SUPPORTED_SUBSYSTEMS.contains(&name) {
                paths.insert(name.to_owned(), entry.path());
            }
        }

        Self { paths }
    }

    pub fn subsystem_path(&self, subsystem: &str) -> Option<&Path> {
        self.paths.get(subsystem).map(PathBuf::as_path)
    }

    /// Names of all mounted, supported subsystems in lexical order.
    pub fn subsystems(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }
}
