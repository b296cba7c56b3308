//! The filesystem as seen by the sweeper: list what matches, delete one path.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::types::WatchTarget;

#[async_trait]
pub trait SweepFs: Send + Sync {
    /// Regular files directly inside `target.dir()` whose name matches the
    /// pattern, yielded as the directory is read. An error ends the listing.
    fn list<'a>(&'a self, target: &'a WatchTarget) -> BoxStream<'a, io::Result<PathBuf>>;

    async fn delete(&self, path: &Path) -> io::Result<()>;
}

/// The real disk, through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl SweepFs for LocalFs {
    fn list<'a>(&'a self, target: &'a WatchTarget) -> BoxStream<'a, io::Result<PathBuf>> {
        stream::once(tokio::fs::read_dir(target.dir()))
            .map_ok(|entries| {
                stream::try_unfold(entries, |mut entries| async move {
                    Ok::<_, io::Error>(entries.next_entry().await?.map(|entry| (entry, entries)))
                })
            })
            .try_flatten()
            .try_filter_map(move |entry| async move {
                if !target.matches_name(&entry.file_name()) {
                    return Ok(None);
                }
                // A vanished entry is simply not a match any more
                match entry.file_type().await {
                    Ok(kind) if kind.is_file() || kind.is_symlink() => Ok(Some(entry.path())),
                    Ok(_) => Ok(None),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .boxed()
    }

    async fn delete(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
