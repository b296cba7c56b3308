use std::path::PathBuf;

use thiserror::Error;

use crate::types::LifecycleState;

#[derive(Error, Debug)]
pub enum WatchmanError {
    #[error("Watched directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("Failed to watch {}: {source}", .path.display())]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] globset::Error),
    #[error("No desktop folder could be resolved")]
    NoDesktop,
    #[error("Watchman is {0}, expected created")]
    InvalidState(LifecycleState),
}
