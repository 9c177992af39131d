//! Mountinfo line parser for Linux systems.
//!
//! Parses lines in `/proc/[pid]/mountinfo` format. See
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)
//! for details on the structure. Only the fields needed to locate cgroup hierarchies are kept.

/// The parts of a mountinfo line used for cgroup detection.
#[derive(Debug, PartialEq, Eq)]
pub struct MountEntry<'a> {
    /// Mount point relative to the process's root.
    pub mount_point: &'a str,
    /// Filesystem type (`cgroup` for v1 hierarchies, `cgroup2` for the unified one).
    pub fs_type: &'a str,
    /// Superblock options; for cgroup v1 these name the attached subsystems.
    pub super_options: &'a str,
}

impl MountEntry<'_> {
    /// Returns `true` if this is a cgroup v1 mount with `subsystem` attached.
    pub fn has_cgroup_subsystem(&self, subsystem: &str) -> bool {
        self.fs_type == "cgroup" && self.super_options.split(',').any(|opt| opt == subsystem)
    }
}

/// Errors that may occur when parsing a mountinfo line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing separator ` - ` in line: `{0}`")]
    MissingSeparator(String),

    #[error("expected at least 5 fields before the separator in line: `{0}`")]
    TruncatedMountFields(String),

    #[error("expected 3 fields after the separator in line: `{0}`")]
    TruncatedFilesystemFields(String),
}

/// Parses a single line of mountinfo data.
///
/// # Errors
///
/// Returns [`ParseError`] if the separator or any of the required fields is missing.
pub fn parse_mount_entry(line: &str) -> Result<MountEntry<'_>, ParseError> {
    let (pre, post) = line
        .split_once(" - ")
        .ok_or_else(|| ParseError::MissingSeparator(line.trim_end().to_owned()))?;

    // mount id, parent id, major:minor, root, mount point
    let mount_point = pre
        .split_whitespace()
        .nth(4)
        .ok_or_else(|| ParseError::TruncatedMountFields(line.trim_end().to_owned()))?;

    let mut post_fields = post.split_whitespace();
    let (Some(fs_type), Some(_source), Some(super_options)) =
        (post_fields.next(), post_fields.next(), post_fields.next())
    else {
        return Err(ParseError::TruncatedFilesystemFields(
            line.trim_end().to_owned(),
        ));
    };

    Ok(MountEntry {
        mount_point,
        fs_type,
        super_options,
    })
}
