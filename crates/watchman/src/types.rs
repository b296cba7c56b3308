use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{GlobBuilder, GlobMatcher};

use crate::error::WatchmanError;

/// The shortcut the Edge installer keeps dropping on desktops.
pub const EDGE_SHORTCUT_PATTERN: &str = "Microsoft Edge.lnk";

/// Delay between a filesystem notification and the sweep it triggers,
/// giving the writer a chance to close the file.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(100);

/// Fallback sweep interval for events that were missed or never raised.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A directory plus the file name glob swept inside it (non-recursive).
#[derive(Clone)]
pub struct WatchTarget {
    dir: PathBuf,
    pattern: String,
    matcher: GlobMatcher,
}

impl WatchTarget {
    pub fn new(dir: impl Into<PathBuf>, pattern: &str) -> Result<Self, WatchmanError> {
        // Windows file names are case-insensitive, so the shortcut can show up
        // as "microsoft edge.LNK" and still be the same file.
        let matcher = GlobBuilder::new(pattern)
            .case_insensitive(cfg!(windows))
            .literal_separator(true)
            .build()?
            .compile_matcher();

        Ok(Self {
            dir: dir.into(),
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether a bare file name matches this target's pattern.
    pub fn matches_name(&self, name: &OsStr) -> bool {
        self.matcher.is_match(Path::new(name))
    }
}

impl fmt::Debug for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchTarget")
            .field("dir", &self.dir)
            .field("pattern", &self.pattern)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Deleted,
    Failed(String),
}

/// What a single sweep did. Only used for logging and tests, never kept.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub outcomes: Vec<(PathBuf, SweepOutcome)>,
    /// Targets whose directory could not be listed this time.
    pub unreadable_targets: usize,
}

impl SweepReport {
    pub fn deleted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == SweepOutcome::Deleted)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.deleted()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub(crate) fn merge(&mut self, other: SweepReport) {
        self.outcomes.extend(other.outcomes);
        self.unreadable_targets += other.unreadable_targets;
    }
}

/// The two suspension points of the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub debounce: Duration,
    pub interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_DELAY,
            interval: SWEEP_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Created = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl LifecycleState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
