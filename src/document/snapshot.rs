//! Form-data snapshot persistence.
//!
//! The whole [`Document`] is dumped as pretty JSON after every successful
//! generation so a later session can restore the form.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::Document;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access snapshot `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed snapshot `{}`: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Snapshot file handle.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<Document>, SnapshotError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| SnapshotError::Json {
                path: self.path.clone(),
                source,
            })
    }

    /// Read the snapshot, logging and discarding any error.
    pub fn load_or_default(&self) -> Document {
        match self.load() {
            Ok(doc) => doc.unwrap_or_default(),
            Err(e) => {
                crate::log!("warning"; "{}", e);
                Document::default()
            }
        }
    }

    /// Write the snapshot, replacing any previous one.
    pub fn save(&self, doc: &Document) -> Result<(), SnapshotError> {
        let mut json = serde_json::to_string_pretty(doc)
            .map_err(|source| SnapshotError::Json {
                path: self.path.clone(),
                source,
            })?;
        json.push('\n');
        fs::write(&self.path, json).map_err(|source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
