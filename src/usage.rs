//! CPU utilization from pairs of cumulative usage samples.
//!
//! The ratio of a window is the CPU time consumed between two samples divided by the CPU
//! time available on the container's assigned cores in the same span, in percent:
//!
//! ```text
//! ratio = (usage_last - usage_first) / ((t_last - t_first) * cores) * 100
//! ```
//!
//! [`Window::Long`] spans the whole retained history, [`Window::Short`] only the latest pair.

use chrono::{DateTime, Utc};

use crate::cgroup::{CoreSet, CoreSetError};
use crate::telemetry::{ContainerInfo, ContainerStats};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("at least two usage samples are required, got {0}")]
    InsufficientSamples(usize),
    #[error("container has no assigned cores")]
    NoAssignedCores,
    #[error("samples are not in chronological order ({elapsed_ns} ns elapsed)")]
    NonPositiveElapsed { elapsed_ns: i64 },
    #[error("cumulative usage decreased from {first} to {last}")]
    CounterReset { first: u64, last: u64 },
    #[error("invalid core mask: {0}")]
    CoreSet(#[from] CoreSetError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// First versus last sample.
    Long,
    /// Second-to-last versus last sample.
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageRatio {
    pub ratio_percent: f64,
    /// Span of the window in whole seconds.
    pub duration_secs: u64,
    /// Timestamp of the newer sample.
    pub timestamp: DateTime<Utc>,
}

/// Computes the utilization of `assigned_cores` over `window` of `stats` (oldest first).
///
/// # Errors
///
/// - [`Error::InsufficientSamples`] for fewer than two samples.
/// - [`Error::NoAssignedCores`] if `assigned_cores` is zero.
/// - [`Error::NonPositiveElapsed`] if the newer sample is not later than the older one.
/// - [`Error::CounterReset`] if the cumulative usage went backwards.
pub fn compute_usage_ratio(
    stats: &[ContainerStats],
    assigned_cores: usize,
    window: Window,
) -> Result<UsageRatio> {
    let len = stats.len();
    if len < 2 {
        return Err(Error::InsufficientSamples(len));
    }
    if assigned_cores == 0 {
        return Err(Error::NoAssignedCores);
    }

    let first = match window {
        Window::Long => &stats[0],
        Window::Short => &stats[len - 2],
    };
    let last = &stats[len - 1];

    let elapsed = last.timestamp - first.timestamp;
    let elapsed_ns = elapsed.num_nanoseconds().unwrap_or(i64::MAX);
    if elapsed_ns <= 0 {
        return Err(Error::NonPositiveElapsed { elapsed_ns });
    }

    let (usage_first, usage_last) = (first.cpu.usage.total, last.cpu.usage.total);
    let consumed = usage_last
        .checked_sub(usage_first)
        .ok_or(Error::CounterReset {
            first: usage_first,
            last: usage_last,
        })?;

    let available = elapsed_ns as f64 * assigned_cores as f64;
    Ok(UsageRatio {
        ratio_percent: consumed as f64 / available * 100.0,
        duration_secs: elapsed.num_seconds() as u64,
        timestamp: last.timestamp,
    })
}

impl ContainerInfo {
    /// Number of cores in the container's CPU mask.
    pub fn assigned_cores(&self) -> Result<usize> {
        let cores: CoreSet = self.spec.cpu.mask.parse()?;
        Ok(cores.len())
    }

    /// Utilization of the container over `window` of its sample history.
    pub fn usage_ratio(&self, window: Window) -> Result<UsageRatio> {
        compute_usage_ratio(&self.stats, self.assigned_cores()?, window)
    }
}
