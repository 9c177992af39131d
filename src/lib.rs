//! CPU Warden: tracks the CPU allotment and usage of containers on a single host.
//!
//! Containers are located in the cgroup v1 `cpuset` hierarchy, their usage history is pulled
//! from a cAdvisor instance, and registration and status are controlled over an HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use error::ResultOkLogExt;
use telemetry::TelemetryProvider;
use tokio_util::sync::CancellationToken;

pub mod api;
pub mod cgroup;
pub mod config;
pub mod container;
pub mod error;
pub mod fsutil;
pub mod monitor;
pub mod mountinfo;
pub mod persistence;
pub mod registry;
pub mod service;
pub mod telemetry;
pub mod usage;

#[cfg(test)]
mod testing;

/// Cgroup root used when none is configured and detection fails.
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Runs the CPU Warden until it is told to exit or receives Ctrl-C.
///
/// # Errors
///
/// Possible errors include:
/// - Running without root privileges.
/// - Invalid environment configuration.
/// - An unreadable or corrupt registry document.
/// - Failure to bind the listen address.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    if !nix::unistd::geteuid().is_root() {
        return Err("cpu-warden must run as root".into());
    }

    let config = config::Config::from_env()?;
    log::debug!("Configuration: {:?}", config);

    let cgroup_root = match &config.cgroup_root {
        Some(root) => root.clone(),
        None => mountinfo::detect_cgroup_root(
            config.proc_root.join("self/mountinfo"),
            cgroup::CPUSET,
        )
        .unwrap_or_else(|err| {
            log::warn!(
                "Cannot detect cgroup root, falling back to `{}`: {}",
                DEFAULT_CGROUP_ROOT,
                err
            );
            PathBuf::from(DEFAULT_CGROUP_ROOT)
        }),
    };
    log::debug!("Final Cgroup Root: {}", cgroup_root.display());

    let resolver = Arc::new(cgroup::CgroupResolver::new(
        cgroup::SubsystemManager::discover(&cgroup_root),
    ));
    if resolver.subsystem_path(cgroup::CPUSET).is_none() {
        log::warn!(
            "No cpuset hierarchy under `{}`, containers can't be registered",
            cgroup_root.display()
        );
    }

    let registry = Arc::new(registry::ContainerRegistry::open(
        persistence::JsonFilePersister::new(&config.registry_path),
    )?);
    log::info!("Loaded {} registered containers", registry.len());
    for container in registry.all() {
        log::info!("  {} ({})", container.id, container.path);
    }

    let telemetry = Arc::new(telemetry::CAdvisorClient::new(&config.cadvisor_addr));
    if let Some(machine) = telemetry
        .machine_info()
        .await
        .ok_warn("telemetry service unavailable")
    {
        log::info!(
            "Telemetry from {}: {} cores at {} kHz",
            telemetry.base_url(),
            machine.num_cores,
            machine.cpu_frequency_khz
        );
    }

    let monitor = Arc::new(monitor::Monitor::new(
        Arc::clone(&registry),
        Arc::clone(&resolver),
        Arc::clone(&telemetry),
        monitor::MonitorConfig {
            interval: config.interval,
            ..Default::default()
        },
    ));
    let controller = Arc::new(monitor::MonitorController::new(monitor));
    let shutdown = CancellationToken::new();
    let warden = Arc::new(service::Warden::new(
        registry,
        resolver,
        telemetry,
        Arc::clone(&controller),
        config.proc_root.clone(),
        shutdown.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    log::info!("Listening on {}", config.listen_addr);
    controller.start().await?;

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::info!("Received Ctrl-C, shutting down");
                    shutdown.cancel();
                }
                Err(err) => log::error!("failed to listen for Ctrl-C: {}", err),
            }
        });
    }

    api::APIServer::new(warden).listen(listener, shutdown).await?;
    controller.stop().await;
    log::info!("Bye");
    Ok(())
}
