use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::sweeper::Sweeper;
use crate::watcher::panic_message;

/// Sweep now, then every `interval`, until `cancel` fires.
///
/// Catches whatever the event watcher missed: events dropped by the OS,
/// filesystems that raise none, or shortcuts that were already there at
/// startup. A sweep that panics is logged and the loop carries on.
pub(crate) async fn run_periodic(sweeper: Sweeper, interval: Duration, cancel: CancellationToken) {
    info!("🕒 Periodic sweeper: running every {:?}", interval);

    while !cancel.is_cancelled() {
        match AssertUnwindSafe(sweeper.sweep()).catch_unwind().await {
            Ok(report) if !report.is_empty() => debug!(
                "Periodic sweep: {} removed, {} failed",
                report.deleted(),
                report.failed()
            ),
            Ok(_) => {}
            Err(panic) => error!("💥 Periodic sweep failed: {}", panic_message(panic.as_ref())),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }

    info!("🕒 Periodic sweeper: stopped");
}
