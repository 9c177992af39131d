use crate::fsutil;

use super::parser::parse_mount_entry;
use super::{Error, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Detects the root of the cgroup v1 hierarchy, i.e. the directory holding one
/// directory per mounted subsystem (usually `/sys/fs/cgroup`).
///
/// The root is taken to be the parent of the mount point of `subsystem`.
///
/// # Errors
///
/// Returns errors from [`detect_subsystem_mount_point`] and
/// [`Error::NoHierarchyRoot`] if the mount point is `/`.
///
/// # Example
///
/// ```no_run
/// use cpu_warden::mountinfo::detect_cgroup_root;
///
/// let root = detect_cgroup_root("/proc/self/mountinfo", "cpuset").unwrap();
/// println!("cgroup root: {}", root.display());
/// ```
pub fn detect_cgroup_root(path: impl AsRef<Path>, subsystem: &str) -> Result<PathBuf> {
    let mount_point = detect_subsystem_mount_point(path, subsystem)?;
    match mount_point.parent() {
        Some(parent) => Ok(parent.to_path_buf()),
        None => Err(Error::NoHierarchyRoot { mount_point }),
    }
}

/// Finds the mount point of a cgroup v1 `subsystem` by parsing a Linux `mountinfo` file.
///
/// If the subsystem is mounted several times, the first mount wins.
///
/// # Errors
///
/// - [`Error::File`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
/// - [`Error::MissingCgroupMount`] if the subsystem is not mounted.
pub fn detect_subsystem_mount_point(path: impl AsRef<Path>, subsystem: &str) -> Result<PathBuf> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    detect_subsystem_mount_point_from_reader(buf, path, subsystem)
}

fn detect_subsystem_mount_point_from_reader<R: BufRead>(
    mut reader: R,
    origin: &Path,
    subsystem: &str,
) -> Result<PathBuf> {
    let mut line = String::with_capacity(256);

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        let entry = parse_mount_entry(line.as_str()).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        if entry.has_cgroup_subsystem(subsystem) {
            log::debug!(
                "Found cgroup v1 mount point of `{}`: {}",
                subsystem,
                entry.mount_point
            );
            return Ok(PathBuf::from(entry.mount_point));
        }

        line.clear();
    }

    Err(Error::MissingCgroupMount {
        subsystem: subsystem.to_owned(),
        path: origin.to_path_buf(),
    })
}
