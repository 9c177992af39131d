use chrono::{DateTime, Utc};

use crate::telemetry::ContainerInfo;

use super::ContainerID;

/// CPU-shares descriptor of a container's cgroup.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CgroupCpu {
    /// Value in `cpu.shares` format.
    pub shares: String,
    pub thresh_min: i64,
    pub thresh_max: i64,
    /// Earliest time the shares may be adjusted again. Advisory only.
    pub cooltime: Option<DateTime<Utc>>,
}

/// CPU-set descriptor of a container's cgroup.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CgroupCpuSet {
    /// Core-set expression in `cpuset.cpus` format, e.g. `0-3,7`.
    pub cpus: String,
    pub thresh_min: i64,
    pub thresh_max: i64,
    pub min_cores: u32,
    pub max_cores: u32,
    /// Earliest time the core set may be adjusted again. Advisory only.
    pub cooltime: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CgroupInfo {
    pub cpuset: CgroupCpuSet,
    pub cpu: CgroupCpu,
}

/// A container under management, as kept in the registry and persisted to disk.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Container {
    pub id: ContainerID,
    /// Runtime namespace the container lives in, e.g. `docker` or `lxc`.
    /// Empty for containers placed directly under the hierarchy root.
    #[serde(rename = "type")]
    pub kind: String,
    /// Path of the container's cgroup relative to the subsystem root, e.g. `/docker/<id>`.
    pub path: String,
    #[serde(rename = "cgroup_cur", default)]
    pub cgroup_current: CgroupInfo,
    #[serde(rename = "cgroup_req", default)]
    pub cgroup_request: CgroupInfo,
    /// Metadata of the last telemetry fetch, without the stats history.
    #[serde(rename = "cAdvisor", default)]
    pub telemetry: ContainerInfo,
    #[serde(default)]
    pub cpu_usage_short: f64,
    #[serde(default)]
    pub cpu_usage_long: f64,
    /// Timestamp of the most recent accounting sample.
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Container {
    pub fn new(id: ContainerID, kind: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            path: path.into(),
            cgroup_current: CgroupInfo::default(),
            cgroup_request: CgroupInfo::default(),
            telemetry: ContainerInfo::default(),
            cpu_usage_short: 0.0,
            cpu_usage_long: 0.0,
            timestamp: None,
        }
    }
}
