//! Output artifact tracker.
//!
//! Keeps a page-ordered view of the artifacts the watch process writes and
//! tells the viewer exactly which pages changed since the last look.
//!
//! # Tokens
//!
//! Each page carries a cache-invalidation token embedded in its URL:
//!
//! | Path seen before | mtime     | Token              |
//! |------------------|-----------|--------------------|
//! | no               | any       | fresh              |
//! | yes              | unchanged | previous           |
//! | yes              | changed   | fresh              |
//! | any              | stat fail | current scan time  |
//!
//! Fresh tokens come from a strictly increasing clock, so a fresh token
//! never equals any earlier one. Two observations of a page are equal iff
//! path and token match.

mod monitor;
mod pattern;


pub use monitor::{FsChange, Monitor};
pub use pattern::PagePattern;

use pattern::parse_page_index;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashMap;

use crate::utils::fs::get_mtime;

/// A page artifact as of the latest scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtifact {
    /// 1-based page number from the file name; 0 when malformed.
    pub index: u32,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub token: u64,
}

impl PageArtifact {
    /// `file://` URL with the token as `?t=` query.
    pub fn url(&self) -> String {
        match url::Url::from_file_path(&self.path) {
            Ok(mut url) => {
                url.set_query(Some(&format!("t={}", self.token)));
                url.into()
            }
            Err(()) => format!("file://{}?t={}", self.path.display(), self.token),
        }
    }
}

/// Where the first changed page sits in a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstChange {
    /// No artifacts at all.
    Empty,
    /// Artifacts exist and none changed.
    Unchanged,
    /// 0-based position of the first page with a new token.
    At(usize),
}

/// Result of one rescan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Artifacts sorted by page number.
    pub pages: Vec<PageArtifact>,
    pub first_changed: FirstChange,
}

impl Scan {
    pub fn urls(&self) -> Vec<String> {
        self.pages.iter().map(PageArtifact::url).collect()
    }
}

/// Millisecond wall clock that never repeats or goes backwards.
#[derive(Debug, Default)]
pub struct TokenClock {
    last: u64,
}

impl TokenClock {
    pub fn tick(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self.last = now.max(self.last + 1);
        self.last
    }
}

#[derive(Debug, Clone, Copy)]
struct Record {
    modified: Option<SystemTime>,
    token: u64,
}

/// Stateful scanner of one output directory.
#[derive(Debug)]
pub struct OutputTracker {
    output_dir: PathBuf,
    pattern: PagePattern,
    records: FxHashMap<PathBuf, Record>,
    clock: TokenClock,
}

impl OutputTracker {
    pub fn new(output_dir: impl Into<PathBuf>, pattern: PagePattern) -> Self {
        Self {
            output_dir: output_dir.into(),
            pattern,
            records: FxHashMap::default(),
            clock: TokenClock::default(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Rescan the output directory and diff against the previous scan.
    ///
    /// Safe to call redundantly: without filesystem changes the result is
    /// the same pages with [`FirstChange::Unchanged`].
    pub fn scan(&mut self) -> Scan {
        let scan_token = self.clock.tick();
        let found = self.list_pages();

        let mut records = FxHashMap::with_capacity_and_hasher(found.len(), Default::default());
        let mut pages = Vec::with_capacity(found.len());
        let mut first_changed = None;

        for (position, (index, path)) in found.into_iter().enumerate() {
            let modified = get_mtime(&path);
            let previous = self.records.get(&path);

            let token = match (previous, modified) {
                (Some(record), Some(_)) if record.modified == modified => record.token,
                _ => {
                    first_changed.get_or_insert(position);
                    scan_token
                }
            };

            records.insert(path.clone(), Record { modified, token });
            pages.push(PageArtifact {
                index,
                path,
                modified,
                token,
            });
        }

        self.records = records;

        let first_changed = match first_changed {
            _ if pages.is_empty() => FirstChange::Empty,
            Some(position) => FirstChange::At(position),
            None => FirstChange::Unchanged,
        };

        Scan {
            pages,
            first_changed,
        }
    }

    /// Matching files sorted by page number, ties by file name. A missing
    /// or unreadable directory lists as empty.
    fn list_pages(&self) -> Vec<(u32, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.output_dir) else {
            return Vec::new();
        };

        let mut pages: Vec<(u32, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                self.pattern
                    .matches(name)
                    .then(|| (parse_page_index(name, &self.pattern), entry.path()))
            })
            .collect();

        pages.sort();
        pages
    }
}
