//! Periodic CPU accounting of registered containers.
//!
//! [`Monitor::tick`] performs one accounting pass; [`MonitorController`] drives ticks from a
//! background task that can be paused, resumed and stopped.
mod controller;
mod tick;

use std::time::Duration;

pub use controller::{LoopState, MonitorController};
pub use tick::Monitor;

/// Number of ticks skipped after the telemetry service failed.
pub const COOLDOWN_TICKS: u32 = 5;
/// Number of usage samples requested per container and tick.
pub const SAMPLE_COUNT: u32 = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("the monitoring loop has been stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between two ticks. The first tick fires one interval after start.
    pub interval: Duration,
    pub sample_count: u32,
    pub cooldown_ticks: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            sample_count: SAMPLE_COUNT,
            cooldown_ticks: COOLDOWN_TICKS,
        }
    }
}
