//! Edgent Watchman - keeps desktop folders free of the Edge shortcut
//!
//! This crate is organized into:
//! - types: WatchTarget, SweepReport, timings and lifecycle states
//! - fs: the list/delete seam over the filesystem
//! - sweeper: finds matching files and deletes them one by one
//! - watcher: per-folder notifications feeding debounced sweeps
//! - periodic: the fallback sweep on a fixed interval
//! - lifecycle: the Watchman controller that owns all of the above

mod error;
mod fs;
mod lifecycle;
mod periodic;
mod sweeper;
mod types;
mod watcher;

#[cfg(test)]
mod test_support;

pub use error::WatchmanError;
pub use fs::{LocalFs, SweepFs};
pub use lifecycle::Watchman;
pub use sweeper::Sweeper;
pub use types::{
    DEBOUNCE_DELAY, EDGE_SHORTCUT_PATTERN, LifecycleState, SWEEP_INTERVAL, SweepOutcome,
    SweepReport, Timings, WatchTarget,
};
pub use watcher::WatchSubscription;

use tracing::info;

/// One target per desktop folder, all looking for the Edge shortcut.
pub fn default_targets() -> Result<Vec<WatchTarget>, WatchmanError> {
    let dirs = edgent_core::path_utils::desktop_dirs();
    if dirs.is_empty() {
        return Err(WatchmanError::NoDesktop);
    }

    dirs.into_iter()
        .map(|dir| WatchTarget::new(dir, EDGE_SHORTCUT_PATTERN))
        .collect()
}

/// Sweep every target once and return what happened.
pub async fn sweep_once(targets: &[WatchTarget]) -> SweepReport {
    let report = Sweeper::new(targets.to_vec()).sweep().await;
    info!(
        "🧹 Sweep finished: {} removed, {} failed",
        report.deleted(),
        report.failed()
    );
    report
}

/// Build a `Watchman` over `targets` and start it.
pub async fn start_watching(targets: Vec<WatchTarget>) -> Result<Watchman, WatchmanError> {
    let watchman = Watchman::new(targets);
    watchman.start().await?;
    Ok(watchman)
}

pub async fn stop_watching(watchman: &Watchman) {
    watchman.stop().await;
}
