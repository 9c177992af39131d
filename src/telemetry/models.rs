use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host information reported by the telemetry service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineInfo {
    pub num_cores: u32,
    pub cpu_frequency_khz: u64,
}

/// Metadata and usage history of one container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerInfo {
    /// Cgroup-relative name, e.g. `/docker/<id>`.
    pub name: String,
    pub aliases: Vec<String>,
    pub namespace: String,
    pub spec: ContainerSpec,
    /// Usage samples, oldest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stats: Vec<ContainerStats>,
}

impl ContainerInfo {
    /// Drops the usage history, keeping only the metadata.
    pub fn into_metadata(self) -> Self {
        Self {
            stats: Vec::new(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSpec {
    pub image: String,
    pub labels: BTreeMap<String, String>,
    pub cpu: CpuSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuSpec {
    /// Relative CPU weight (shares).
    pub limit: u64,
    pub max_limit: u64,
    /// Core-set expression of the cores the container may run on, e.g. `0-3`.
    pub mask: String,
}

/// One usage sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerStats {
    pub timestamp: DateTime<Utc>,
    pub cpu: CpuStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuStats {
    pub usage: CpuUsage,
}

/// Cumulative CPU time in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuUsage {
    pub total: u64,
    pub user: u64,
    pub system: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CADVISOR_CONTAINER: &str = r#"{
        "name": "/docker/abc",
        "aliases": ["web", "abc"],
        "namespace": "docker",
        "subcontainers": [],
        "spec": {
            "creation_time": "2024-05-01T10:00:00Z",
            "labels": {"app": "web"},
            "has_cpu": true,
            "cpu": {"limit": 1024, "max_limit": 0, "mask": "0-3", "period": 100000},
            "image": "nginx:latest"
        },
        "stats": [
            {
                "timestamp": "2024-05-01T10:00:00.123456789Z",
                "cpu": {
                    "usage": {"total": 1000, "per_cpu_usage": [500, 500], "user": 600, "system": 400},
                    "load_average": 0
                },
                "memory": {"usage": 1}
            }
        ]
    }"#;

    #[test]
    fn test_decode_cadvisor_container() {
        let info: ContainerInfo = serde_json::from_str(CADVISOR_CONTAINER).unwrap();

        assert_eq!(info.name, "/docker/abc");
        assert_eq!(info.aliases, vec!["web", "abc"]);
        assert_eq!(info.spec.image, "nginx:latest");
        assert_eq!(info.spec.labels.get("app").map(String::as_str), Some("web"));
        assert_eq!(info.spec.cpu.mask, "0-3");
        assert_eq!(info.stats.len(), 1);
        assert_eq!(info.stats[0].cpu.usage.total, 1000);
        assert_eq!(
            info.stats[0].timestamp.timestamp_subsec_nanos(),
            123_456_789
        );
    }

    #[test]
    fn test_metadata_omits_stats() {
        let info: ContainerInfo = serde_json::from_str(CADVISOR_CONTAINER).unwrap();
        let metadata = info.into_metadata();
        assert!(metadata.stats.is_empty());

        let value = serde_json::to_value(&metadata).unwrap();
        assert!(value.get("stats").is_none());
        assert_eq!(value["spec"]["cpu"]["mask"], "0-3");
    }

    #[test]
    fn test_decode_machine_info() {
        let info: MachineInfo =
            serde_json::from_str(r#"{"num_cores": 8, "cpu_frequency_khz": 2400000, "memory_capacity": 1}"#)
                .unwrap();
        assert_eq!(
            info,
            MachineInfo {
                num_cores: 8,
                cpu_frequency_khz: 2_400_000,
            }
        );
    }
}
