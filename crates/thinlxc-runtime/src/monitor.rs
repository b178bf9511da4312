//! Waiting for the runtime to report a target state.
//!
//! A watch runs as its own tokio task. It polls the runtime until the target
//! state is observed, the timeout elapses, or the caller cancels, and
//! delivers exactly one [`WaitOutcome`] over a one-shot channel.

use std::future::Future;
use std::time::Duration;

use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::types::{ContainerName, ContainerState};
use tokio::sync::oneshot;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::lxc::LxcClient;

/// Timing of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Delay between two state queries.
    pub poll_interval: Duration,
    /// Extra wait after observing `RUNNING`, before delivery.
    pub settle_delay: Duration,
    /// Bound on observation; `None` polls until cancelled.
    pub timeout: Option<Duration>,
}

impl MonitorOptions {
    /// Reads the timings from the configuration.
    #[must_use]
    pub const fn from_config(config: &ThinLxcConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
            timeout: config.wait_timeout(),
        }
    }
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self::from_config(&ThinLxcConfig::default())
    }
}

/// Result of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The runtime reported the target state.
    Reached(ContainerState),
    /// The timeout elapsed before the target state was observed.
    TimedOut,
    /// The watch was cancelled.
    Cancelled,
}

/// Caller's side of a running watch.
///
/// Dropping the handle without awaiting it cancels the watch.
#[derive(Debug)]
pub struct WaitHandle {
    cancel: CancellationToken,
    outcome: oneshot::Receiver<WaitOutcome>,
    guard: DropGuard,
}

impl WaitHandle {
    /// Stops the watch; it then resolves to [`WaitOutcome::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token cancelling this watch, e.g. for a signal handler.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the single outcome of the watch.
    pub async fn outcome(self) -> WaitOutcome {
        let Self { outcome, guard, .. } = self;
        let result = outcome.await.unwrap_or(WaitOutcome::Cancelled);
        drop(guard);
        result
    }
}

/// Observes container state through the runtime client.
#[derive(Debug, Clone)]
pub struct StateMonitor {
    client: LxcClient,
    options: MonitorOptions,
}

impl StateMonitor {
    /// Creates a monitor.
    #[must_use]
    pub const fn new(client: LxcClient, options: MonitorOptions) -> Self {
        Self { client, options }
    }

    /// Timings applied to every watch.
    #[must_use]
    pub const fn options(&self) -> MonitorOptions {
        self.options
    }

    /// Single-shot state query; failures read as `UNKNOWN`.
    #[must_use]
    pub fn query(&self, name: &ContainerName) -> ContainerState {
        self.client.state(name)
    }

    /// Starts watching `name` for `target`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn watch(&self, name: ContainerName, target: ContainerState) -> WaitHandle {
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let client = self.client.clone();
        let options = self.options;
        let token = cancel.clone();

        tracing::debug!(container = %name, %target, "watching container state");
        let _ = tokio::spawn(async move {
            let outcome = run_watch(client, name.clone(), target, options, token).await;
            tracing::debug!(container = %name, ?outcome, "watch finished");
            let _ = tx.send(outcome);
        });

        WaitHandle {
            guard: cancel.clone().drop_guard(),
            cancel,
            outcome: rx,
        }
    }
}

async fn run_watch(
    client: LxcClient,
    name: ContainerName,
    target: ContainerState,
    options: MonitorOptions,
    cancel: CancellationToken,
) -> WaitOutcome {
    let observe = async {
        loop {
            let (c, n) = (client.clone(), name.clone());
            let state = tokio::task::spawn_blocking(move || c.state(&n))
                .await
                .unwrap_or(ContainerState::Unknown);
            if state == target {
                return state;
            }
            tokio::time::sleep(options.poll_interval).await;
        }
    };

    let observed = tokio::select! {
        biased;
        () = cancel.cancelled() => return WaitOutcome::Cancelled,
        observed = bounded(options.timeout, observe) => observed,
    };
    let Some(state) = observed else {
        tracing::warn!(container = %name, %target, "timed out waiting for state");
        return WaitOutcome::TimedOut;
    };

    if state == ContainerState::Running && !options.settle_delay.is_zero() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return WaitOutcome::Cancelled,
            () = tokio::time::sleep(options.settle_delay) => {}
        }
    }
    WaitOutcome::Reached(state)
}

async fn bounded<F: Future>(timeout: Option<Duration>, fut: F) -> Option<F::Output> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}
