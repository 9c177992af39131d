use std::sync::Arc;

use crate::cgroup::CgroupResolver;
use crate::container::ContainerID;
use crate::error::ResultOkLogExt;
use crate::registry::ContainerRegistry;
use crate::telemetry::TelemetryProvider;
use crate::usage::Window;

use super::MonitorConfig;

/// Updates the usage ratios of all registered containers from telemetry.
pub struct Monitor<T> {
    registry: Arc<ContainerRegistry>,
    resolver: Arc<CgroupResolver>,
    telemetry: Arc<T>,
    config: MonitorConfig,
}

impl<T: TelemetryProvider> Monitor<T> {
    pub fn new(
        registry: Arc<ContainerRegistry>,
        resolver: Arc<CgroupResolver>,
        telemetry: Arc<T>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            registry,
            resolver,
            telemetry,
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Runs one accounting pass and returns the number of ticks to skip afterwards.
    ///
    /// While `cooldown` is positive the pass is skipped and `cooldown - 1` returned. Any
    /// telemetry failure aborts the pass and starts a new cooldown; containers later in the
    /// pass keep their previous values. Containers whose cgroup disappeared are unregistered.
    pub async fn tick(&self, cooldown: u32) -> u32 {
        if cooldown > 0 {
            log::warn!(
                target: "monitor",
                "Telemetry recently failed, skipping tick ({} left)",
                cooldown
            );
            return cooldown - 1;
        }

        let machine = match self.telemetry.machine_info().await {
            Ok(machine) => machine,
            Err(err) => {
                log::error!(target: "monitor", "failed to fetch machine info: {}", err);
                return self.config.cooldown_ticks;
            }
        };
        log::trace!(
            target: "monitor",
            "Host has {} cores at {} kHz",
            machine.num_cores,
            machine.cpu_frequency_khz
        );

        for id in self.registry.ids() {
            let Some(container) = self.registry.get(&id) else {
                continue;
            };
            if !self.resolver.container_exists(id.as_str()) {
                self.evict(&id);
                continue;
            }

            let info = match self
                .telemetry
                .container_info(&container.path, self.config.sample_count)
                .await
            {
                Ok(info) => info,
                Err(err) => {
                    log::error!(
                        target: "monitor",
                        "failed to fetch telemetry: container_id={}, error={}",
                        id,
                        err
                    );
                    return self.config.cooldown_ticks;
                }
            };

            match (info.usage_ratio(Window::Long), info.usage_ratio(Window::Short)) {
                (Ok(long), Ok(short)) => {
                    self.registry.update(&id, |container| {
                        container.cpu_usage_long = long.ratio_percent;
                        container.cpu_usage_short = short.ratio_percent;
                        container.timestamp = Some(long.timestamp);
                    });
                    log::debug!(
                        target: "monitor",
                        "container_id={}, long={:.2}% over {}s, short={:.2}% over {}s",
                        id,
                        long.ratio_percent,
                        long.duration_secs,
                        short.ratio_percent,
                        short.duration_secs
                    );
                }
                (Err(err), _) | (_, Err(err)) => {
                    log::debug!(
                        target: "monitor",
                        "skipping accounting: container_id={}, error={}",
                        id,
                        err
                    );
                }
            }
        }

        0
    }

    fn evict(&self, id: &ContainerID) {
        log::info!(
            target: "monitor",
            "Cgroup of container {} disappeared, unregistering",
            id
        );
        self.registry
            .remove(id)
            .ok_warn(&format!("failed to unregister vanished container {id}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::monitor::COOLDOWN_TICKS;
    use crate::testing::{Fixture, container_info, id};
    use std::sync::atomic::Ordering;

    fn monitor(fixture: &Fixture) -> Monitor<crate::testing::FakeTelemetry> {
        Monitor::new(
            Arc::clone(&fixture.registry),
            Arc::clone(&fixture.resolver),
            Arc::clone(&fixture.telemetry),
            MonitorConfig::default(),
        )
    }

    fn register(fixture: &Fixture, raw: &str) {
        fixture.add_cgroup("docker", raw, "0-1");
        let container = Container::new(id(raw), "docker", format!("/docker/{raw}"));
        assert!(fixture.registry.add(container).unwrap());
    }

    #[tokio::test]
    async fn test_cooldown_skips_tick() {
        let fixture = Fixture::new();
        let monitor = monitor(&fixture);

        assert_eq!(monitor.tick(3).await, 2);
        assert_eq!(monitor.tick(1).await, 0);
        assert_eq!(fixture.telemetry.machine_calls(), 0);
    }

    #[tokio::test]
    async fn test_machine_failure_starts_cooldown() {
        let fixture = Fixture::new();
        fixture.telemetry.machine_down.store(true, Ordering::SeqCst);
        let monitor = monitor(&fixture);

        assert_eq!(monitor.tick(0).await, COOLDOWN_TICKS);
        assert_eq!(fixture.telemetry.machine_calls(), 1);
    }

    #[tokio::test]
    async fn test_tick_updates_usage() {
        let fixture = Fixture::new();
        register(&fixture, "abc");
        fixture.telemetry.set_container(container_info(
            "/docker/abc",
            "0-1",
            &[(0, 0), (10, 4_000_000_000), (20, 24_000_000_000)],
        ));

        assert_eq!(monitor(&fixture).tick(0).await, 0);

        let container = fixture.registry.get(&id("abc")).unwrap();
        assert!((container.cpu_usage_long - 60.0).abs() < 1e-9);
        assert!((container.cpu_usage_short - 100.0).abs() < 1e-9);
        assert_eq!(
            container.timestamp.unwrap().timestamp(),
            1_700_000_000 + 20
        );
    }

    #[tokio::test]
    async fn test_tick_evicts_vanished_container() {
        let fixture = Fixture::new();
        register(&fixture, "abc");
        register(&fixture, "def");
        fixture.telemetry.set_container(container_info("/docker/def", "0", &[]));
        fixture.remove_cgroup("docker", "abc");

        assert_eq!(monitor(&fixture).tick(0).await, 0);

        assert!(!fixture.registry.contains(&id("abc")));
        assert!(fixture.registry.contains(&id("def")));
        let document = std::fs::read_to_string(fixture.registry_path()).unwrap();
        assert!(!document.contains("\"abc\""));
    }

    #[tokio::test]
    async fn test_telemetry_failure_aborts_pass() {
        let fixture = Fixture::new();
        register(&fixture, "a");
        register(&fixture, "b");
        fixture.telemetry.fail_container("/docker/a");
        fixture.telemetry.set_container(container_info(
            "/docker/b",
            "0",
            &[(0, 0), (1, 1_000_000_000)],
        ));

        assert_eq!(monitor(&fixture).tick(0).await, COOLDOWN_TICKS);

        assert_eq!(fixture.telemetry.container_calls(), 1);
        let untouched = fixture.registry.get(&id("b")).unwrap();
        assert_eq!(untouched.timestamp, None);
        assert_eq!(untouched.cpu_usage_long, 0.0);
    }

    #[tokio::test]
    async fn test_accounting_error_leaves_entry() {
        let fixture = Fixture::new();
        register(&fixture, "abc");
        fixture.registry.update(&id("abc"), |c| c.cpu_usage_short = 12.5);
        fixture
            .telemetry
            .set_container(container_info("/docker/abc", "0-1", &[(0, 0)]));

        assert_eq!(monitor(&fixture).tick(0).await, 0);

        let container = fixture.registry.get(&id("abc")).unwrap();
        assert_eq!(container.cpu_usage_short, 12.5);
        assert_eq!(container.timestamp, None);
    }
}
