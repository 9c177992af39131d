mod detect;
mod error;
mod parser;

pub use detect::{detect_cgroup_root, detect_subsystem_mount_point};
pub use error::{Error, Result};
