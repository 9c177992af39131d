use super::{ContainerInfo, MachineInfo, Result};

/// Source of host and per-container CPU telemetry.
pub trait TelemetryProvider: Send + Sync {
    fn machine_info(&self) -> impl std::future::Future<Output = Result<MachineInfo>> + Send;

    /// Fetches metadata and up to `sample_count` of the most recent usage samples of the
    /// container with cgroup-relative `path`, oldest sample first.
    fn container_info(
        &self,
        path: &str,
        sample_count: u32,
    ) -> impl std::future::Future<Output = Result<ContainerInfo>> + Send;
}
