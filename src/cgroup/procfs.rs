use std::path::Path;

use crate::fsutil;

use super::subsystem::CPUSET;

#[derive(Debug, thiserror::Error)]
pub enum ProcfsError {
    #[error("process {pid} does not exist")]
    ProcessNotFound { pid: u32 },
    #[error("failed to read cgroup membership of process {pid}: {source}")]
    Read {
        pid: u32,
        #[source]
        source: fsutil::FileError,
    },
    #[error("process {pid} has no cgroup membership")]
    NoCgroup { pid: u32 },
    #[error("invalid cgroup line of process {pid}: {source}")]
    Parse {
        pid: u32,
        #[source]
        source: CgroupLineError,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CgroupLineError {
    #[error("invalid cgroup line format: {0}")]
    InvalidFormat(String),
    #[error("invalid hierarchy id in cgroup line: {0}")]
    InvalidHierarchyID(String),
    #[error("too many separators: {0}")]
    TooManySeparators(String),
}

/// The container a process runs in, as seen from its cpuset cgroup.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProcessPlacement {
    /// Container id; empty for processes in the host's default cgroup.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

impl ProcessPlacement {
    /// Placement of a process that is not in any container.
    pub fn host_default() -> Self {
        Self {
            id: String::new(),
            kind: String::new(),
            path: "/".to_owned(),
        }
    }

    fn from_cgroup_path(cgroup_path: &str) -> Self {
        let mut segments = cgroup_path.split('/').filter(|s| !s.is_empty()).rev();
        let Some(id) = segments.next() else {
            return Self::host_default();
        };
        Self {
            id: id.to_owned(),
            kind: segments.next().unwrap_or_default().to_owned(),
            path: cgroup_path.to_owned(),
        }
    }
}

/// Determines the container of process `pid` from `<proc_root>/<pid>/cgroup`.
///
/// The cpuset hierarchy line decides; if no line names cpuset, the first line is used.
///
/// # Errors
///
/// - [`ProcfsError::ProcessNotFound`] if there is no such process.
/// - [`ProcfsError::Read`] if the membership file can't be read.
/// - [`ProcfsError::NoCgroup`] if the file is empty.
/// - [`ProcfsError::Parse`] if the selected line is malformed.
pub fn locate_process(
    proc_root: impl AsRef<Path>,
    pid: u32,
) -> Result<ProcessPlacement, ProcfsError> {
    let path = proc_root.as_ref().join(pid.to_string()).join("cgroup");
    let content = match fsutil::read_trimmed(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProcfsError::ProcessNotFound { pid });
        }
        Err(source) => return Err(ProcfsError::Read { pid, source }),
    };

    let mut first = None;
    for line in content.lines().filter(|line| !line.trim().is_empty()) {
        let parsed = parse_cgroup_line(line).map_err(|source| ProcfsError::Parse { pid, source })?;
        if parsed.controller_list.contains(&CPUSET) {
            return Ok(ProcessPlacement::from_cgroup_path(parsed.cgroup_path));
        }
        first.get_or_insert(parsed);
    }

    match first {
        Some(line) => {
            log::debug!(
                "process {} has no cpuset cgroup, using hierarchy {}",
                pid,
                line.hierarchy_id
            );
            Ok(ProcessPlacement::from_cgroup_path(line.cgroup_path))
        }
        None => Err(ProcfsError::NoCgroup { pid }),
    }
}

struct CgroupLine<'a> {
    hierarchy_id: u32,
    controller_list: Vec<&'a str>,
    cgroup_path: &'a str,
}

fn parse_cgroup_line(line: &str) -> Result<CgroupLine<'_>, CgroupLineError> {
    let mut it = line.split(':');
    let hierarchy_id = it
        .next()
        .ok_or_else(|| CgroupLineError::InvalidFormat(line.to_owned()))?
        .trim()
        .parse::<u32>()
        .map_err(|_| CgroupLineError::InvalidHierarchyID(line.to_owned()))?;
    let controller_list = it
        .next()
        .ok_or_else(|| CgroupLineError::InvalidFormat(line.to_owned()))?;
    let controller_list: Vec<&str> = if controller_list.is_empty() {
        Vec::default()
    } else {
        controller_list.split(',').collect()
    };
    let cgroup_path = it
        .next()
        .ok_or_else(|| CgroupLineError::InvalidFormat(line.to_owned()))?;
    it.next().map_or(Ok(()), |_| {
        Err(CgroupLineError::TooManySeparators(line.to_owned()))
    })?;

    Ok(CgroupLine {
        hierarchy_id,
        controller_list,
        cgroup_path: cgroup_path.trim(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_proc(root: &Path, pid: u32, content: &str) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("cgroup"), content).unwrap();
    }

    #[test]
    fn test_parse_cgroup_line() {
        let line = parse_cgroup_line("4:cpu,cpuacct:/docker/abc\n").unwrap();
        assert_eq!(line.hierarchy_id, 4);
        assert_eq!(line.controller_list, vec!["cpu", "cpuacct"]);
        assert_eq!(line.cgroup_path, "/docker/abc");

        let line = parse_cgroup_line("0::/").unwrap();
        assert!(line.controller_list.is_empty());
        assert_eq!(line.cgroup_path, "/");
    }

    #[test]
    fn test_parse_cgroup_line_errors() {
        assert!(matches!(
            parse_cgroup_line("x:cpuset:/"),
            Err(CgroupLineError::InvalidHierarchyID(_))
        ));
        assert!(matches!(
            parse_cgroup_line("3:cpuset"),
            Err(CgroupLineError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_cgroup_line("3:cpuset:/a:b"),
            Err(CgroupLineError::TooManySeparators(_))
        ));
    }

    #[test]
    fn test_locate_docker_process() {
        let root = tempfile::tempdir().unwrap();
        write_proc(
            root.path(),
            42,
            "11:memory:/docker/abc\n5:cpuset:/docker/abc\n1:name=systemd:/docker/abc\n",
        );

        let placement = locate_process(root.path(), 42).unwrap();
        assert_eq!(
            placement,
            ProcessPlacement {
                id: "abc".to_owned(),
                kind: "docker".to_owned(),
                path: "/docker/abc".to_owned(),
            }
        );
    }

    #[test]
    fn test_locate_prefers_cpuset_line() {
        let root = tempfile::tempdir().unwrap();
        write_proc(root.path(), 7, "2:memory:/other/x\n3:cpu,cpuset:/lxc/web\n");

        let placement = locate_process(root.path(), 7).unwrap();
        assert_eq!(placement.id, "web");
        assert_eq!(placement.kind, "lxc");
    }

    #[test]
    fn test_locate_falls_back_to_first_line() {
        let root = tempfile::tempdir().unwrap();
        write_proc(root.path(), 8, "0::/standalone\n");

        let placement = locate_process(root.path(), 8).unwrap();
        assert_eq!(placement.id, "standalone");
        assert_eq!(placement.kind, "");
        assert_eq!(placement.path, "/standalone");
    }

    #[test]
    fn test_locate_host_process() {
        let root = tempfile::tempdir().unwrap();
        write_proc(root.path(), 1, "5:cpuset:/\n");

        assert_eq!(
            locate_process(root.path(), 1).unwrap(),
            ProcessPlacement::host_default()
        );
    }

    #[test]
    fn test_locate_errors() {
        let root = tempfile::tempdir().unwrap();
        write_proc(root.path(), 9, "\n");
        write_proc(root.path(), 10, "garbage\n");

        assert!(matches!(
            locate_process(root.path(), 3),
            Err(ProcfsError::ProcessNotFound { pid: 3 })
        ));
        assert!(matches!(
            locate_process(root.path(), 9),
            Err(ProcfsError::NoCgroup { pid: 9 })
        ));
        assert!(matches!(
            locate_process(root.path(), 10),
            Err(ProcfsError::Parse { pid: 10, .. })
        ));
    }

    #[test]
    fn test_placement_json_keys() {
        let value = serde_json::to_value(ProcessPlacement::host_default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"id": "", "type": "", "path": "/"})
        );
    }
}
