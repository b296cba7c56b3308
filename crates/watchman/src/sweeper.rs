use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::fs::{LocalFs, SweepFs};
use crate::types::{SweepOutcome, SweepReport, WatchTarget};

/// Finds every matching file in every target and deletes it.
///
/// Cheap to clone and safe to run concurrently with itself: the only
/// shared state is the filesystem, and a lost delete race is just a
/// logged failure.
#[derive(Clone)]
pub struct Sweeper {
    targets: Arc<[WatchTarget]>,
    fs: Arc<dyn SweepFs>,
}

impl Sweeper {
    pub fn new(targets: Vec<WatchTarget>) -> Self {
        Self::with_fs(targets, Arc::new(LocalFs))
    }

    pub fn with_fs(targets: Vec<WatchTarget>, fs: Arc<dyn SweepFs>) -> Self {
        Self {
            targets: targets.into(),
            fs,
        }
    }

    pub fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }

    /// Sweep all targets. Never fails: per-target and per-file errors are
    /// logged and recorded in the report, then the sweep moves on.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for target in self.targets.iter() {
            report.merge(self.sweep_target(target).await);
        }
        report
    }

    async fn sweep_target(&self, target: &WatchTarget) -> SweepReport {
        let mut report = SweepReport::default();

        let mut matches = self.fs.list(target);
        while let Some(found) = matches.next().await {
            match found {
                Ok(path) => {
                    let outcome = self.destroy(&path).await;
                    report.outcomes.push((path, outcome));
                }
                Err(e) => {
                    // Whatever was found before the error has been dealt with
                    warn!("⚠️ Could not list {}: {}", target.dir().display(), e);
                    report.unreadable_targets += 1;
                    break;
                }
            }
        }

        debug!(
            "Swept {} ({} removed, {} failed)",
            target.dir().display(),
            report.deleted(),
            report.failed()
        );
        report
    }

    async fn destroy(&self, path: &Path) -> SweepOutcome {
        match self.fs.delete(path).await {
            Ok(()) => {
                info!("🗑️ Not on my watch! Edge shortcut removed at {}", path.display());
                SweepOutcome::Deleted
            }
            Err(e) => {
                error!("❌ Failed to remove Edge shortcut at {}: {}", path.display(), e);
                SweepOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EDGE_SHORTCUT_PATTERN;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// In-memory directory where some paths refuse to be deleted.
    #[derive(Default)]
    struct FakeFs {
        files: Mutex<Vec<PathBuf>>,
        locked: Vec<PathBuf>,
        unreadable: Vec<PathBuf>,
        /// Directories whose listing breaks down after the first match.
        flaky: Vec<PathBuf>,
    }

    #[async_trait]
    impl SweepFs for FakeFs {
        fn list<'a>(&'a self, target: &'a WatchTarget) -> BoxStream<'a, io::Result<PathBuf>> {
            let denied = || io::Error::new(io::ErrorKind::PermissionDenied, "denied");
            if self.unreadable.iter().any(|dir| dir == target.dir()) {
                return stream::iter(vec![Err(denied())]).boxed();
            }
            let mut found: Vec<io::Result<PathBuf>> = self
                .files
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.parent() == Some(target.dir()))
                .filter(|p| target.matches_name(p.file_name().unwrap()))
                .cloned()
                .map(Ok)
                .collect();
            if self.flaky.iter().any(|dir| dir == target.dir()) {
                found.truncate(1);
                found.push(Err(denied()));
            }
            stream::iter(found).boxed()
        }

        async fn delete(&self, path: &Path) -> io::Result<()> {
            if self.locked.iter().any(|p| p == path) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "used by another process",
                ));
            }
            let mut files = self.files.lock().unwrap();
            let before = files.len();
            files.retain(|p| p != path);
            if files.len() == before {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn one_locked_file_does_not_block_the_rest() {
        let locked = PathBuf::from("/public/Microsoft Edge.lnk");
        let free = PathBuf::from("/user/Microsoft Edge.lnk");
        let fs = FakeFs {
            files: Mutex::new(vec![locked.clone(), free.clone()]),
            locked: vec![locked.clone()],
            ..Default::default()
        };
        let sweeper = Sweeper::with_fs(
            vec![
                WatchTarget::new("/public", EDGE_SHORTCUT_PATTERN).unwrap(),
                WatchTarget::new("/user", EDGE_SHORTCUT_PATTERN).unwrap(),
            ],
            Arc::new(fs),
        );

        let report = sweeper.sweep().await;

        assert_eq!(report.deleted(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.outcomes.contains(&(free, SweepOutcome::Deleted)));
        assert!(matches!(
            report.outcomes.iter().find(|(p, _)| *p == locked),
            Some((_, SweepOutcome::Failed(_)))
        ));
    }

    #[tokio::test]
    async fn unreadable_target_does_not_block_the_other() {
        let fs = FakeFs {
            files: Mutex::new(vec![PathBuf::from("/user/Microsoft Edge.lnk")]),
            unreadable: vec![PathBuf::from("/public")],
            ..Default::default()
        };
        let sweeper = Sweeper::with_fs(
            vec![
                WatchTarget::new("/public", EDGE_SHORTCUT_PATTERN).unwrap(),
                WatchTarget::new("/user", EDGE_SHORTCUT_PATTERN).unwrap(),
            ],
            Arc::new(fs),
        );

        let report = sweeper.sweep().await;

        assert_eq!(report.unreadable_targets, 1);
        assert_eq!(report.deleted(), 1);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn listing_error_keeps_what_was_already_found() {
        let first = PathBuf::from("/user/a.lnk");
        let second = PathBuf::from("/user/b.lnk");
        let fs = Arc::new(FakeFs {
            files: Mutex::new(vec![first.clone(), second.clone()]),
            flaky: vec![PathBuf::from("/user")],
            ..Default::default()
        });
        let sweeper = Sweeper::with_fs(vec![WatchTarget::new("/user", "*.lnk").unwrap()], fs.clone());

        let report = sweeper.sweep().await;

        assert_eq!(report.outcomes, vec![(first, SweepOutcome::Deleted)]);
        assert_eq!(report.unreadable_targets, 1);
        assert_eq!(*fs.files.lock().unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn missing_directory_is_skipped_on_disk() {
        let present = tempdir().unwrap();
        let shortcut = present.path().join(EDGE_SHORTCUT_PATTERN);
        std::fs::write(&shortcut, b"lnk").unwrap();

        let sweeper = Sweeper::new(vec![
            WatchTarget::new(present.path().join("gone"), EDGE_SHORTCUT_PATTERN).unwrap(),
            WatchTarget::new(present.path(), EDGE_SHORTCUT_PATTERN).unwrap(),
        ]);

        let report = sweeper.sweep().await;

        assert_eq!(report.unreadable_targets, 1);
        assert_eq!(report.deleted(), 1);
        assert!(!shortcut.exists());
    }

    #[tokio::test]
    async fn leaves_non_matching_entries_alone() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Microsoft Edge.url"), b"x").unwrap();
        std::fs::write(dir.path().join("Firefox.lnk"), b"x").unwrap();
        // No recursion into subdirectories
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join(EDGE_SHORTCUT_PATTERN), b"x").unwrap();

        let sweeper = Sweeper::new(vec![
            WatchTarget::new(dir.path(), EDGE_SHORTCUT_PATTERN).unwrap(),
        ]);
        let report = sweeper.sweep().await;

        assert!(report.is_empty());
        assert!(dir.path().join("Microsoft Edge.url").exists());
        assert!(dir.path().join("Firefox.lnk").exists());
        assert!(dir.path().join("nested").join(EDGE_SHORTCUT_PATTERN).exists());
    }
}
