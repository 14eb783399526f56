//! Document generator.
//!
//! Turns a [`Document`] into the compiler's source tree:
//!
//! ```text
//! <project>/
//! ├── main.typ            root document, written last
//! ├── sections/<id>.typ   one file per top-level section run
//! └── form_data.json      snapshot for session restore
//! ```
//!
//! Rendering is pure (see [`render_sections`] and [`render_root`]); only
//! [`Generator::generate`] touches the filesystem.

mod escape;
mod root;
mod section;

#[cfg(test)]
mod tests;

pub use root::render_root;
pub use section::render_sections;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::DocumentConfig;
use crate::document::{Document, Snapshot};
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("project path not set, cannot generate")]
    NotConfigured,

    #[error("failed to write `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Outcome of a successful generation.
#[derive(Debug)]
pub struct GenerateReport {
    /// Path of the written root document.
    pub root: PathBuf,
    /// Number of section run files written.
    pub sections: usize,
    /// Set when the snapshot could not be saved.
    pub snapshot_warning: Option<String>,
}

/// Writes generated sources into the active project.
#[derive(Debug, Clone)]
pub struct Generator {
    project: Option<PathBuf>,
    config: DocumentConfig,
}

impl Generator {
    pub fn new(project: impl Into<PathBuf>, config: DocumentConfig) -> Self {
        Self {
            project: Some(project.into()),
            config,
        }
    }

    /// A generator with no active project. Every `generate` call fails
    /// with [`GenerateError::NotConfigured`].
    pub fn unconfigured(config: DocumentConfig) -> Self {
        Self {
            project: None,
            config,
        }
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.project
            .as_ref()
            .map(|root| Snapshot::new(root.join(&self.config.snapshot)))
    }

    /// Regenerate the source tree from `doc`.
    ///
    /// Missing image labels are assigned and written back into `doc`. Files
    /// written before a failure are left in place.
    pub fn generate(&self, doc: &mut Document) -> Result<GenerateReport, GenerateError> {
        let root = self.project.as_ref().ok_or(GenerateError::NotConfigured)?;

        let sections_dir = root.join(&self.config.sections_dir);
        fs::create_dir_all(&sections_dir).map_err(|source| GenerateError::Io {
            path: sections_dir.clone(),
            source,
        })?;

        let files = render_sections(doc, &self.config);
        for file in &files {
            write(&sections_dir.join(file.file_name()), &file.content)?;
        }
        debug!("generate"; "wrote {} section files", files.len());

        let entry = root.join(&self.config.entry);
        write(&entry, &render_root(doc, &self.config))?;

        let snapshot_warning = self.snapshot().and_then(|snapshot| {
            snapshot.save(doc).err().map(|e| {
                log!("warning"; "failed to save form data: {}", e);
                e.to_string()
            })
        });

        Ok(GenerateReport {
            root: entry,
            sections: files.len(),
            snapshot_warning,
        })
    }
}

fn write(path: &Path, content: &str) -> Result<(), GenerateError> {
    fs::write(path, content).map_err(|source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
