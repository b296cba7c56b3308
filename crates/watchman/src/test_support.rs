use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::fs::SweepFs;
use crate::types::WatchTarget;

/// Never finds anything, only counts how often it was asked.
#[derive(Default)]
pub(crate) struct CountingFs {
    lists: AtomicUsize,
}

impl CountingFs {
    pub(crate) fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SweepFs for CountingFs {
    fn list<'a>(&'a self, _target: &'a WatchTarget) -> BoxStream<'a, io::Result<PathBuf>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        stream::empty().boxed()
    }

    async fn delete(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Like `CountingFs`, but the very first listing panics.
#[derive(Default)]
pub(crate) struct PanicOnceFs {
    lists: AtomicUsize,
}

impl PanicOnceFs {
    pub(crate) fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SweepFs for PanicOnceFs {
    fn list<'a>(&'a self, _target: &'a WatchTarget) -> BoxStream<'a, io::Result<PathBuf>> {
        if self.lists.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("listing blew up");
        }
        stream::empty().boxed()
    }

    async fn delete(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}
