//! Control operations on registered containers, as exposed by the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::SimpleResult;
use crate::cgroup::{self, CgroupResolver, CoreSet, ProcessPlacement};
use crate::container::{Container, ContainerID};
use crate::error::ResultOkLogExt;
use crate::monitor::{self, MonitorController};
use crate::registry::ContainerRegistry;
use crate::telemetry::{ContainerInfo, TelemetryProvider};

const CPUSET_CPUS: &str = "cpuset.cpus";

const CONTAINER_MISSING: &str = "The container does not exist";
const ALREADY_REGISTERED: &str = "The container is already registered";
const REGISTERED: &str = "The container is registered";
const UNREGISTERED: &str = "The container is unregistered";
const NEVER_REGISTERED: &str = "Have not registered";
const NOT_REGISTERED: &str = "The container is not registered";
const DISAPPEARED: &str = "The container is registered, but disappeared... clean up";
const PERSIST_FAILED: &str = "The registry could not be saved";
const NOT_SUPPORTED: &str = "not supported";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown control message `{0}`")]
    UnknownControl(String),
    #[error("invalid process id `{0}`")]
    InvalidPid(String),
    #[error(transparent)]
    Monitor(#[from] monitor::Error),
    #[error(transparent)]
    Procfs(#[from] cgroup::ProcfsError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The container warden: registry, cgroup lookup, telemetry and the monitoring loop.
pub struct Warden<T> {
    registry: Arc<ContainerRegistry>,
    resolver: Arc<CgroupResolver>,
    telemetry: Arc<T>,
    controller: Arc<MonitorController<T>>,
    proc_root: PathBuf,
    shutdown: CancellationToken,
}

impl<T: TelemetryProvider + 'static> Warden<T> {
    pub fn new(
        registry: Arc<ContainerRegistry>,
        resolver: Arc<CgroupResolver>,
        telemetry: Arc<T>,
        controller: Arc<MonitorController<T>>,
        proc_root: impl Into<PathBuf>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            resolver,
            telemetry,
            controller,
            proc_root: proc_root.into(),
            shutdown,
        }
    }

    /// Registers the container with id `raw_id`.
    ///
    /// The container's cgroup must exist. Its current core set and telemetry metadata are
    /// recorded if available; failing to fetch them does not fail the registration.
    pub async fn register(&self, raw_id: &str) -> SimpleResult {
        let id = match ContainerID::new(raw_id) {
            Ok(id) => id,
            Err(err) => return SimpleResult::failure(err.to_string()),
        };
        let Some(placement) = self.resolver.locate(id.as_str()) else {
            return SimpleResult::failure(CONTAINER_MISSING);
        };
        if self.registry.contains(&id) {
            return SimpleResult::success(ALREADY_REGISTERED);
        }

        let mut container = Container::new(id, placement.kind, placement.path);
        container.cgroup_current.cpuset.cpus = self.current_cpus(&container);
        container.telemetry = self
            .telemetry
            .container_info(&container.path, 1)
            .await
            .ok_warn(&format!("failed to fetch metadata of container {}", container.id))
            .map(ContainerInfo::into_metadata)
            .unwrap_or_default();

        match self.registry.add(container) {
            Ok(true) => SimpleResult::success(REGISTERED),
            Ok(false) => SimpleResult::success(ALREADY_REGISTERED),
            Err(err) => {
                log::error!("{}", err);
                SimpleResult::failure(PERSIST_FAILED)
            }
        }
    }

    pub fn unregister(&self, raw_id: &str) -> SimpleResult {
        let Ok(id) = ContainerID::new(raw_id) else {
            return SimpleResult::success(NEVER_REGISTERED);
        };
        match self.registry.remove(&id) {
            Ok(true) => SimpleResult::success(UNREGISTERED),
            Ok(false) => SimpleResult::success(NEVER_REGISTERED),
            Err(err) => {
                log::error!("{}", err);
                SimpleResult::failure(PERSIST_FAILED)
            }
        }
    }

    /// Reports whether the container is registered, unregistering it if its cgroup is gone.
    pub fn is_registered(&self, raw_id: &str) -> SimpleResult {
        match self.registered(raw_id) {
            Lookup::Present(_) => SimpleResult::success(REGISTERED),
            Lookup::Vanished => SimpleResult::failure(DISAPPEARED),
            Lookup::Unknown => SimpleResult::failure(NOT_REGISTERED),
        }
    }

    /// Returns the registered container, unregistering it if its cgroup is gone.
    pub fn status(&self, raw_id: &str) -> Option<Container> {
        match self.registered(raw_id) {
            Lookup::Present(container) => Some(container),
            Lookup::Vanished | Lookup::Unknown => None,
        }
    }

    /// Restores the container's default CPU shares. Returns `false` if it isn't registered.
    pub fn reset_cpu(&self, raw_id: &str) -> bool {
        self.reset(raw_id)
    }

    /// Restores the container's default core set. Returns `false` if it isn't registered.
    pub fn reset_cpuset(&self, raw_id: &str) -> bool {
        self.reset(raw_id)
    }

    pub fn set_cpu(&self, raw_id: &str) -> SimpleResult {
        log::debug!("set cpu requested for `{}`", raw_id);
        SimpleResult::failure(NOT_SUPPORTED)
    }

    pub fn set_cpuset(&self, raw_id: &str) -> SimpleResult {
        log::debug!("set cpuset requested for `{}`", raw_id);
        SimpleResult::failure(NOT_SUPPORTED)
    }

    /// Finds the container the process `raw_pid` runs in.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPid`] if `raw_pid` is not a positive integer.
    /// - [`Error::Procfs`] if the process doesn't exist or its cgroup can't be read.
    pub fn locate_process(&self, raw_pid: &str) -> Result<ProcessPlacement> {
        let pid = raw_pid
            .parse::<u32>()
            .ok()
            .filter(|pid| *pid > 0)
            .ok_or_else(|| Error::InvalidPid(raw_pid.to_owned()))?;
        Ok(cgroup::locate_process(&self.proc_root, pid)?)
    }

    /// Handles a control message (`pause`, `resume` or `exit`, in any case) and returns the
    /// acknowledgement.
    ///
    /// `exit` stops the monitoring loop for good and triggers shutdown.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownControl`] for any other message.
    /// - [`Error::Monitor`] if the loop has already been stopped.
    pub async fn control(&self, message: &str) -> Result<&'static str> {
        log::info!("control requested: {}", message);
        match message.to_lowercase().as_str() {
            "pause" => {
                self.controller.pause().await?;
                Ok("paused")
            }
            "resume" => {
                self.controller.resume().await?;
                Ok("resumed")
            }
            "exit" => {
                self.controller.stop().await;
                self.shutdown.cancel();
                Ok("exited")
            }
            _ => Err(Error::UnknownControl(message.to_owned())),
        }
    }

    fn registered(&self, raw_id: &str) -> Lookup {
        let Ok(id) = ContainerID::new(raw_id) else {
            return Lookup::Unknown;
        };
        let Some(container) = self.registry.get(&id) else {
            return Lookup::Unknown;
        };
        if !self.resolver.container_exists(id.as_str()) {
            log::info!("Cgroup of container {} disappeared, unregistering", id);
            self.registry.remove(&id).ok_log();
            return Lookup::Vanished;
        }
        Lookup::Present(container)
    }

    fn reset(&self, raw_id: &str) -> bool {
        match self.registered(raw_id) {
            Lookup::Present(container) => {
                self.resolver
                    .reset_cgroup(container.id.as_str())
                    .ok_warn("failed to reset cgroup");
                true
            }
            Lookup::Vanished | Lookup::Unknown => false,
        }
    }

    /// Canonical core set of the container's cpuset cgroup, or empty if unreadable.
    fn current_cpus(&self, container: &Container) -> String {
        let cores = self
            .resolver
            .read_core_assignment(&container.kind, container.id.as_str(), CPUSET_CPUS)
            .ok_warn(&format!("failed to read cores of container {}", container.id))
            .and_then(|raw| {
                raw.parse::<CoreSet>()
                    .ok_warn(&format!("invalid cores of container {}", container.id))
            });
        cores.map(|cores| cores.to_string()).unwrap_or_default()
    }
}

enum Lookup {
    Present(Container),
    Vanished,
    Unknown,
}
