use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::error::WatchmanError;
use crate::periodic::run_periodic;
use crate::sweeper::Sweeper;
use crate::types::{LifecycleState, Timings, WatchTarget};
use crate::watcher::{EventContext, WatchSubscription};

#[derive(Default)]
struct Resources {
    subscriptions: Vec<WatchSubscription>,
    periodic: Option<JoinHandle<()>>,
}

/// Owns the folder subscriptions and the periodic sweeper, and tears
/// both down on `stop`.
///
/// `Created -> Running -> Stopping -> Stopped`, one step at a time.
pub struct Watchman {
    sweeper: Sweeper,
    timings: Timings,
    cancel: CancellationToken,
    tracker: TaskTracker,
    state: AtomicU8,
    resources: Mutex<Resources>,
}

impl Watchman {
    pub fn new(targets: Vec<WatchTarget>) -> Self {
        Self::with_sweeper(Sweeper::new(targets), Timings::default())
    }

    pub fn with_sweeper(sweeper: Sweeper, timings: Timings) -> Self {
        Self {
            sweeper,
            timings,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            state: AtomicU8::new(LifecycleState::Created as u8),
            resources: Mutex::new(Resources::default()),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LifecycleState) {
        debug!("Watchman: {} -> {}", self.state(), state);
        self.state.store(state as u8, Ordering::Release);
    }

    /// The shutdown signal handed to every suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn active_subscriptions(&self) -> usize {
        let resources = self.resources.lock().await;
        resources
            .subscriptions
            .iter()
            .filter(|sub| sub.is_active())
            .count()
    }

    /// Subscribe to every target, then start the periodic sweeper.
    ///
    /// A folder that cannot be watched aborts startup; subscriptions opened
    /// so far are released and the controller stays `Created`.
    pub async fn start(&self) -> Result<(), WatchmanError> {
        let mut resources = self.resources.lock().await;
        let state = self.state();
        if state != LifecycleState::Created {
            return Err(WatchmanError::InvalidState(state));
        }

        info!(
            "👀 Watchman: Starting observation of {} folder(s)",
            self.sweeper.targets().len()
        );

        let ctx = EventContext {
            sweeper: self.sweeper.clone(),
            debounce: self.timings.debounce,
            cancel: self.cancel.clone(),
            tracker: self.tracker.clone(),
        };

        for target in self.sweeper.targets() {
            match WatchSubscription::open(target.clone(), ctx.clone()) {
                Ok(subscription) => resources.subscriptions.push(subscription),
                Err(e) => {
                    error!("Watchman: Cannot watch {}: {}", target.dir().display(), e);
                    for mut subscription in std::mem::take(&mut resources.subscriptions) {
                        subscription.close().await;
                    }
                    return Err(e);
                }
            }
        }

        resources.periodic = Some(tokio::spawn(run_periodic(
            self.sweeper.clone(),
            self.timings.interval,
            self.cancel.clone(),
        )));

        self.set_state(LifecycleState::Running);
        info!("👀 Watchman: Ready and watching.");
        Ok(())
    }

    /// Signal shutdown, unsubscribe and release every watch, then wait for
    /// the periodic loop and any in-flight sweeps. Repeated calls are no-ops.
    pub async fn stop(&self) {
        let mut resources = self.resources.lock().await;
        match self.state() {
            LifecycleState::Running => {}
            LifecycleState::Created => {
                debug!("Watchman: never started, nothing to stop");
                return;
            }
            LifecycleState::Stopping | LifecycleState::Stopped => {
                debug!("Watchman: already stopped");
                return;
            }
        }

        self.set_state(LifecycleState::Stopping);
        info!("🛑 Watchman: Stopping");
        self.cancel.cancel();

        for mut subscription in std::mem::take(&mut resources.subscriptions) {
            subscription.close().await;
        }

        if let Some(periodic) = resources.periodic.take() {
            if let Err(e) = periodic.await {
                error!("Periodic sweeper ended abnormally: {}", e);
            }
        }

        self.tracker.close();
        self.tracker.wait().await;

        self.set_state(LifecycleState::Stopped);
        info!("🛑 Watchman: Stopped");
    }

    /// Start, run until `shutdown` resolves (or the token is cancelled
    /// elsewhere), then stop.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), WatchmanError>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;

        tokio::select! {
            _ = shutdown => info!("Shutdown requested"),
            _ = self.cancel.cancelled() => {}
        }

        self.stop().await;
        Ok(())
    }
}

impl Drop for Watchman {
    fn drop(&mut self) {
        // Background tasks must not outlive their owner
        self.cancel.cancel();
    }
}
