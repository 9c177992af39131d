//! Fixtures shared by the unit tests of the monitor, service and api modules.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};

use crate::cgroup::{CgroupResolver, SubsystemManager};
use crate::container::ContainerID;
use crate::persistence::JsonFilePersister;
use crate::registry::ContainerRegistry;
use crate::telemetry::{
    self, ContainerInfo, ContainerStats, CpuStats, CpuUsage, MachineInfo, TelemetryProvider,
};

/// In-memory telemetry service.
#[derive(Default)]
pub(crate) struct FakeTelemetry {
    pub machine_down: AtomicBool,
    pub machine_calls: AtomicUsize,
    pub container_calls: AtomicUsize,
    containers: Mutex<HashMap<String, ContainerInfo>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeTelemetry {
    pub fn set_container(&self, info: ContainerInfo) {
        self.containers
            .lock()
            .unwrap()
            .insert(info.name.clone(), info);
    }

    pub fn fail_container(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_owned());
    }

    pub fn machine_calls(&self) -> usize {
        self.machine_calls.load(Ordering::SeqCst)
    }

    pub fn container_calls(&self) -> usize {
        self.container_calls.load(Ordering::SeqCst)
    }
}

impl TelemetryProvider for FakeTelemetry {
    async fn machine_info(&self) -> telemetry::Result<MachineInfo> {
        self.machine_calls.fetch_add(1, Ordering::SeqCst);
        if self.machine_down.load(Ordering::SeqCst) {
            return Err(telemetry::Error::Timeout {
                url: "fake://machine".to_owned(),
            });
        }
        Ok(MachineInfo {
            num_cores: 4,
            cpu_frequency_khz: 2_000_000,
        })
    }

    async fn container_info(
        &self,
        path: &str,
        sample_count: u32,
    ) -> telemetry::Result<ContainerInfo> {
        self.container_calls.fetch_add(1, Ordering::SeqCst);
        let not_found = || telemetry::Error::Status {
            url: format!("fake://containers{path}"),
            status: hyper::StatusCode::INTERNAL_SERVER_ERROR,
            body: "unknown container".to_owned(),
        };
        if self.failing.lock().unwrap().contains(path) {
            return Err(not_found());
        }
        let mut info = self
            .containers
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(not_found)?;
        let skip = info.stats.len().saturating_sub(sample_count as usize);
        info.stats.drain(..skip);
        Ok(info)
    }
}

/// Telemetry for container `path` on cores `mask` with `(seconds, total usage ns)` samples.
pub(crate) fn container_info(path: &str, mask: &str, samples: &[(i64, u64)]) -> ContainerInfo {
    let mut info = ContainerInfo {
        name: path.to_owned(),
        namespace: "docker".to_owned(),
        stats: samples
            .iter()
            .map(|&(secs, total)| ContainerStats {
                timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
                cpu: CpuStats {
                    usage: CpuUsage {
                        total,
                        ..Default::default()
                    },
                },
            })
            .collect(),
        ..Default::default()
    };
    info.spec.cpu.mask = mask.to_owned();
    info
}

pub(crate) fn id(raw: &str) -> ContainerID {
    ContainerID::new(raw).unwrap()
}

/// A cgroup tree, a proc tree and a registry document in a temporary directory.
pub(crate) struct Fixture {
    pub dir: tempfile::TempDir,
    pub registry: Arc<ContainerRegistry>,
    pub resolver: Arc<CgroupResolver>,
    pub telemetry: Arc<FakeTelemetry>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cgroup/cpuset")).unwrap();
        std::fs::create_dir_all(dir.path().join("proc")).unwrap();

        let resolver = CgroupResolver::new(SubsystemManager::discover(dir.path().join("cgroup")));
        let registry =
            ContainerRegistry::open(JsonFilePersister::new(dir.path().join("registered")))
                .unwrap();

        Self {
            dir,
            registry: Arc::new(registry),
            resolver: Arc::new(resolver),
            telemetry: Arc::new(FakeTelemetry::default()),
        }
    }

    pub fn cpuset_root(&self) -> PathBuf {
        self.dir.path().join("cgroup/cpuset")
    }

    pub fn proc_root(&self) -> PathBuf {
        self.dir.path().join("proc")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.dir.path().join("registered")
    }

    /// Creates the cgroup of container `id` under `kind` with `cpuset.cpus` set to `cpus`.
    pub fn add_cgroup(&self, kind: &str, id: &str, cpus: &str) {
        let dir = self.cpuset_root().join(kind).join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("cpuset.cpus"), format!("{cpus}\n")).unwrap();
    }

    pub fn remove_cgroup(&self, kind: &str, id: &str) {
        std::fs::remove_dir_all(self.cpuset_root().join(kind).join(id)).unwrap();
    }

    pub fn add_process(&self, pid: u32, cgroup: &str) {
        let dir = self.proc_root().join(pid.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("cgroup"), cgroup).unwrap();
    }
}
