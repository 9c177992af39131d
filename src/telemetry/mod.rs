//! Container telemetry: CPU usage history and container metadata from a telemetry service.
//!
//! [`TelemetryProvider`] abstracts the service; [`CAdvisorClient`] talks to cAdvisor's
//! v1.3 REST API.
mod cadvisor;
mod error;
mod models;
mod provider;

pub use cadvisor::CAdvisorClient;
pub use error::{Error, Result};
pub use models::{ContainerInfo, ContainerSpec, ContainerStats, CpuSpec, CpuStats, CpuUsage, MachineInfo};
pub use provider::TelemetryProvider;
