//! Filesystem notifications for one watched folder.
//!
//! `notify` calls back on its own thread; the callback only forwards into a
//! tokio channel. A pump task filters the events and, for every qualifying
//! one, schedules a debounced sweep as a detached task.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::FutureExt;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::error::WatchmanError;
use crate::sweeper::Sweeper;
use crate::types::{SweepReport, WatchTarget};

/// Everything an event needs to schedule its sweep. Shared by all
/// subscriptions of one `Watchman`.
#[derive(Clone)]
pub(crate) struct EventContext {
    pub sweeper: Sweeper,
    pub debounce: Duration,
    /// Process-wide shutdown signal.
    pub cancel: CancellationToken,
    /// Owns the detached debounced sweeps so shutdown can wait for them.
    pub tracker: TaskTracker,
}

/// A live OS watch on one target. Either fully active or fully released.
pub struct WatchSubscription {
    target: WatchTarget,
    watcher: Option<RecommendedWatcher>,
    pump: Option<JoinHandle<()>>,
    pump_shutdown: CancellationToken,
}

impl WatchSubscription {
    pub(crate) fn open(target: WatchTarget, ctx: EventContext) -> Result<Self, WatchmanError> {
        if !target.dir().is_dir() {
            return Err(WatchmanError::MissingDirectory(target.dir().to_path_buf()));
        }

        let subscribe_err = |source| WatchmanError::Subscribe {
            path: target.dir().to_path_buf(),
            source,
        };

        let (tx, rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver is gone only once the subscription is closing
            let _ = tx.send(res);
        })
        .map_err(subscribe_err)?;

        // On failure `watcher` is dropped here, so nothing half-open escapes
        watcher
            .watch(target.dir(), RecursiveMode::NonRecursive)
            .map_err(subscribe_err)?;

        let pump_shutdown = ctx.cancel.child_token();
        let pump = tokio::spawn(pump_events(
            rx,
            target.clone(),
            ctx,
            pump_shutdown.clone(),
        ));

        info!(
            "👀 Watchman: Watching {} for {:?}",
            target.dir().display(),
            target.pattern()
        );

        Ok(Self {
            target,
            watcher: Some(watcher),
            pump: Some(pump),
            pump_shutdown,
        })
    }

    pub fn is_active(&self) -> bool {
        self.watcher.is_some()
    }

    /// Unsubscribe, then release the OS handle. Safe to call more than once.
    pub(crate) async fn close(&mut self) {
        let Some(mut watcher) = self.watcher.take() else {
            return;
        };

        self.pump_shutdown.cancel();
        if let Err(e) = watcher.unwatch(self.target.dir()) {
            // The folder may have been removed under us; the handle still goes
            debug!("Unwatch {} failed: {}", self.target.dir().display(), e);
        }
        drop(watcher);

        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                error!("Event pump for {} ended abnormally: {}", self.target.dir().display(), e);
            }
        }
        debug!("Released watch on {}", self.target.dir().display());
    }
}

async fn pump_events(
    mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    target: WatchTarget,
    ctx: EventContext,
    shutdown: CancellationToken,
) {
    loop {
        let res = tokio::select! {
            _ = shutdown.cancelled() => break,
            res = rx.recv() => match res {
                Some(res) => res,
                None => break,
            },
        };

        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!("Watch error on {}: {}", target.dir().display(), e);
                continue;
            }
        };

        let Some(path) = triggering_path(&event, &target) else {
            continue;
        };
        debug!("👀 Watchman detected {:?}: {}", event.kind, path.display());

        spawn_guarded(
            &ctx.tracker,
            debounced_sweep(ctx.sweeper.clone(), ctx.debounce, ctx.cancel.clone()),
        );
    }
}

/// The path that makes `event` worth a sweep: a matching file was created,
/// or something was renamed to a matching name.
pub(crate) fn triggering_path<'a>(event: &'a Event, target: &WatchTarget) -> Option<&'a Path> {
    let candidates: &[PathBuf] = match event.kind {
        EventKind::Create(_) => &event.paths,
        // Only the destination of a rename counts
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => return None,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1..).unwrap_or_default()
        }
        EventKind::Modify(ModifyKind::Name(_)) => &event.paths,
        _ => return None,
    };

    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|path| path.file_name().is_some_and(|name| target.matches_name(name)))
}

/// Wait out the debounce delay, then sweep. Returns `None` when shutdown
/// arrives first and the sweep is abandoned.
pub(crate) async fn debounced_sweep(
    sweeper: Sweeper,
    delay: Duration,
    cancel: CancellationToken,
) -> Option<SweepReport> {
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Shutdown during debounce, sweep abandoned");
            return None;
        }
        _ = tokio::time::sleep(delay) => {}
    }

    if cancel.is_cancelled() {
        return None;
    }
    Some(sweeper.sweep().await)
}

/// Run `fut` detached. Nothing can observe its failure, so a panic is
/// caught here, logged and dropped.
pub(crate) fn spawn_guarded<F>(tracker: &TaskTracker, fut: F) -> JoinHandle<()>
where
    F: Future + Send + 'static,
{
    tracker.spawn(async move {
        if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
            error!("💥 Error handling file event: {}", panic_message(panic.as_ref()));
        }
    })
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
