use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::telemetry::TelemetryProvider;

use super::{Error, Monitor, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Not ticking; also the state before the first start.
    Paused,
    /// Terminal.
    Stopped,
}

struct TickTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    state: LoopState,
    task: Option<TickTask>,
}

impl Inner {
    /// Cancels the running task, if any, and waits until it finished.
    async fn halt(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.token.cancel();
        if let Err(err) = task.handle.await {
            log::error!(target: "monitor", "monitoring task failed: {}", err);
        }
    }
}

/// Owns the background task that ticks a [`Monitor`].
///
/// Transitions are serialized, and every transition that ends a task waits for it, so no
/// tick runs once `pause` or `stop` has returned.
pub struct MonitorController<T> {
    monitor: Arc<Monitor<T>>,
    inner: Mutex<Inner>,
}

impl<T: TelemetryProvider + 'static> MonitorController<T> {
    pub fn new(monitor: Arc<Monitor<T>>) -> Self {
        Self {
            monitor,
            inner: Mutex::new(Inner {
                state: LoopState::Paused,
                task: None,
            }),
        }
    }

    /// Starts a fresh ticking task, replacing any running one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] after [`stop`](Self::stop).
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == LoopState::Stopped {
            return Err(Error::Stopped);
        }
        inner.halt().await;

        let token = CancellationToken::new();
        let handle = tokio::spawn(run(Arc::clone(&self.monitor), token.clone()));
        inner.task = Some(TickTask { token, handle });
        inner.state = LoopState::Running;
        log::info!(
            target: "monitor",
            "Monitoring every {:?}",
            self.monitor.config().interval
        );
        Ok(())
    }

    /// Stops ticking until [`resume`](Self::resume).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] after [`stop`](Self::stop).
    pub async fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            LoopState::Stopped => Err(Error::Stopped),
            LoopState::Paused => Ok(()),
            LoopState::Running => {
                inner.halt().await;
                inner.state = LoopState::Paused;
                log::info!(target: "monitor", "Monitoring paused");
                Ok(())
            }
        }
    }

    /// Same as [`start`](Self::start).
    pub async fn resume(&self) -> Result<()> {
        self.start().await
    }

    /// Ends the task for good.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        inner.halt().await;
        if inner.state != LoopState::Stopped {
            inner.state = LoopState::Stopped;
            log::info!(target: "monitor", "Monitoring stopped");
        }
    }

    pub async fn state(&self) -> LoopState {
        self.inner.lock().await.state
    }
}

async fn run<T: TelemetryProvider>(monitor: Arc<Monitor<T>>, token: CancellationToken) {
    let period = monitor.config().interval;
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut cooldown = 0;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }
        cooldown = monitor.tick(cooldown).await;
    }
    log::debug!(target: "monitor", "Monitoring task finished");
}
