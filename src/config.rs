use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_CADVISOR_ADDR: &str = "http://localhost:8080";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8088";
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_REGISTRY_PATH: &str = "registered";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `CGROUP_ROOT`; detected from mountinfo if unset.
    pub cgroup_root: Option<PathBuf>,
    /// `PROC_ROOT`
    pub proc_root: PathBuf,
    /// `CADVISOR_ADDR`
    pub cadvisor_addr: String,
    /// `LISTEN_ADDR`
    pub listen_addr: SocketAddr,
    /// `MONITOR_INTERVAL_SECS`, between one second and one day.
    pub interval: Duration,
    /// `REGISTRY_PATH`
    pub registry_path: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a set variable can't be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`; unset or empty keys take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let listen_addr = var("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let listen_addr = listen_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|err| Error::InvalidValue {
                key: "LISTEN_ADDR",
                value: listen_addr.clone(),
                reason: err.to_string(),
            })?;

        let interval = match var("MONITOR_INTERVAL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(Error::InvalidValue {
                        key: "MONITOR_INTERVAL_SECS",
                        value: raw,
                        reason: "must be positive".to_owned(),
                    });
                }
                Ok(secs) if secs > MAX_INTERVAL_SECS => {
                    return Err(Error::InvalidValue {
                        key: "MONITOR_INTERVAL_SECS",
                        value: raw,
                        reason: format!("must not exceed {MAX_INTERVAL_SECS}"),
                    });
                }
                Ok(secs) => secs,
                Err(err) => {
                    return Err(Error::InvalidValue {
                        key: "MONITOR_INTERVAL_SECS",
                        value: raw,
                        reason: err.to_string(),
                    });
                }
            },
            None => DEFAULT_INTERVAL_SECS,
        };

        Ok(Self {
            cgroup_root: var("CGROUP_ROOT").map(PathBuf::from),
            proc_root: PathBuf::from(var("PROC_ROOT").unwrap_or_else(|| DEFAULT_PROC_ROOT.to_owned())),
            cadvisor_addr: var("CADVISOR_ADDR").unwrap_or_else(|| DEFAULT_CADVISOR_ADDR.to_owned()),
            listen_addr,
            interval: Duration::from_secs(interval),
            registry_path: PathBuf::from(
                var("REGISTRY_PATH").unwrap_or_else(|| DEFAULT_REGISTRY_PATH.to_owned()),
            ),
        })
    }
}
