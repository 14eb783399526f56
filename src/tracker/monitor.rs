//! Filesystem event channel of the tracker.
//!
//! Watches the output directory (non-recursive) and every known artifact
//! file, forwarding notify events into a tokio channel. The owner rescans on
//! each event and on a fixed poll tick, since event delivery is unreliable
//! on some filesystems.

use std::fs;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc::UnboundedSender;

use super::Scan;
use crate::{debug, log};

/// Paths touched by a filesystem event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub paths: Vec<PathBuf>,
}

/// Live notify watcher over an output directory and its artifacts.
///
/// Dropping the monitor stops all watches.
pub struct Monitor {
    watcher: RecommendedWatcher,
    dir: PathBuf,
    dir_attached: bool,
    files: FxHashSet<PathBuf>,
}

impl Monitor {
    /// Start watching `dir`, creating it when missing.
    pub fn start(dir: impl Into<PathBuf>, events: UnboundedSender<FsChange>) -> notify::Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            debug!("watch"; "creating output directory {}", dir.display());
            fs::create_dir_all(&dir).map_err(notify::Error::io)?;
        }

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                // receiver gone means monitoring stopped
                let _ = events.send(FsChange { paths: event.paths });
            }
            Err(e) => log!("watch"; "notify error: {}", e),
        })?;

        let mut monitor = Self {
            watcher,
            dir,
            dir_attached: false,
            files: FxHashSet::default(),
        };
        monitor.attach_dir()?;
        Ok(monitor)
    }

    /// Number of individually watched artifact files.
    pub fn watched_files(&self) -> usize {
        self.files.len()
    }

    /// Bring the per-file watches in line with the pages of `scan`.
    pub fn apply(&mut self, scan: &Scan) {
        let current: FxHashSet<&Path> = scan.pages.iter().map(|p| p.path.as_path()).collect();

        self.files.retain(|path| {
            if current.contains(path.as_path()) {
                return true;
            }
            let _ = self.watcher.unwatch(path);
            false
        });

        for page in &scan.pages {
            if self.files.contains(&page.path) {
                continue;
            }
            match self.watcher.watch(&page.path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    self.files.insert(page.path.clone());
                }
                Err(e) => debug!("watch"; "cannot watch {}: {}", page.path.display(), e),
            }
        }
    }

    /// Re-attach the directory watch if the directory was removed and
    /// recreated.
    pub fn maintain(&mut self) {
        if self.dir_attached && !self.dir.exists() {
            self.dir_attached = false;
            self.files.clear();
        }
        if !self.dir_attached && self.dir.exists() && self.attach_dir().is_ok() {
            debug!("watch"; "re-attached watch: {}", self.dir.display());
        }
    }

    fn attach_dir(&mut self) -> notify::Result<()> {
        self.watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        self.dir_attached = true;
        Ok(())
    }
}
