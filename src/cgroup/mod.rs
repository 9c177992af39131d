//! Container lookup in the cgroup v1 filesystem.
//!
//! This module maps container ids to their cgroup directories, reads the CPU cores
//! assigned to a container, and maps processes back to the container they run in.
//!
//! # Key Components
//!
//! - [`SubsystemManager`]: Records which supported subsystems are mounted and where.
//! - [`CgroupResolver`]: Walks a subsystem hierarchy to find a container's cgroup.
//! - [`coreset`]: Encodes and decodes `cpuset.cpus` expressions.
//! - [`locate_process`]: Reads `/proc/<pid>/cgroup` to find a process's container.
//!
//! # Platform Requirements
//!
//! - Linux with the cgroup v1 `cpuset` subsystem mounted.
//! - Read access to the cgroup root (usually `/sys/fs/cgroup`) and `/proc`.
pub mod coreset;
mod error;
mod procfs;
mod resolver;
mod subsystem;

pub use coreset::{CoreSet, CoreSetError};
pub use error::{Error, Result};
pub use procfs::{CgroupLineError, ProcessPlacement, ProcfsError, locate_process};
pub use resolver::{CgroupResolver, Placement};
pub use subsystem::{CPUSET, SUPPORTED_SUBSYSTEMS, SubsystemManager};
