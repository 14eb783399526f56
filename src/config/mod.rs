//! Project configuration management for `ergo.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── compiler   # [compiler]
//! │   ├── document   # [document]
//! │   ├── tracker    # [tracker]
//! │   └── watch      # [watch]
//! ├── error          # ConfigError
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section        | Purpose                                          |
//! |----------------|--------------------------------------------------|
//! | `[compiler]`   | Compiler binary lookup, watch/export output      |
//! | `[document]`   | Generated file layout and template package       |
//! | `[tracker]`    | Output polling interval                          |
//! | `[watch]`      | Stop grace periods for the watch process         |
//!
//! The file is optional: a project without `ergo.toml` runs with defaults.
//! Configuration is loaded once and handed to each component; nothing reads
//! it from global state.

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{CompilerConfig, DocumentConfig, TrackerConfig, WatchConfig};

use crate::log;
use crate::tracker::PagePattern;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "ergo.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing `ergo.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Compiler lookup and invocation
    pub compiler: CompilerConfig,

    /// Watch process lifecycle
    pub watch: WatchConfig,

    /// Output artifact tracking
    pub tracker: TrackerConfig,

    /// Generated source layout
    pub document: DocumentConfig,
}

impl ProjectConfig {
    /// Load configuration for the project at `root`.
    ///
    /// `file` is resolved against the root when relative. A missing file
    /// yields the defaults.
    pub fn load(root: &Path, file: &Path) -> Result<Self, ConfigError> {
        let path = if file.is_absolute() {
            file.to_path_buf()
        } else {
            root.join(file)
        };

        let mut config = if path.exists() {
            Self::from_path(&path)?
        } else {
            crate::debug!("config"; "no {} found, using defaults", path.display());
            Self::default()
        };

        config.root = root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let (config, _) = Self::parse_with_ignored(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path, warning about unknown fields.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            log!("warning"; "ignoring unknown fields in {}: {}", path.display(), ignored.join(", "));
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Check cross-field constraints that serde cannot express.
    fn validate(&self) -> Result<(), ConfigError> {
        PagePattern::parse(&self.compiler.output_pattern).ok_or_else(|| {
            ConfigError::Validation(format!(
                "compiler.output_pattern `{}` must contain the `{{p}}` page placeholder in its file name",
                self.compiler.output_pattern
            ))
        })?;

        if self.document.entry.trim().is_empty() {
            return Err(ConfigError::Validation(
                "document.entry must not be empty".into(),
            ));
        }

        if self.document.root_prefix().is_none() {
            return Err(ConfigError::Validation(format!(
                "document.sections_dir `{}` must be a relative directory inside the project",
                self.document.sections_dir
            )));
        }

        if self.tracker.poll_ms == 0 {
            return Err(ConfigError::Validation(
                "tracker.poll_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Get the project root.
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Join a project-relative path onto the root.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Directory the watch process writes page artifacts into.
    pub fn output_dir(&self) -> PathBuf {
        let pattern = Path::new(&self.compiler.output_pattern);
        match pattern.parent() {
            Some(parent) => self.root.join(parent),
            None => self.root.clone(),
        }
    }

    /// File-name pattern of page artifacts (e.g. `p{p}.svg`).
    pub fn page_pattern(&self) -> PagePattern {
        // validated on load
        PagePattern::parse(&self.compiler.output_pattern).unwrap_or_default()
    }
}

/// Find the project root by searching upward from `start` for `config_name`.
///
/// Returns the directory containing the config file, if any.
pub fn find_project_root(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name
            .exists()
            .then(|| config_name.parent().map(Path::to_path_buf))
            .flatten();
    }

    let mut current = start;
    loop {
        if current.join(config_name).exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed.validate().unwrap();
    parsed
}

// ============================================================================
// tests
// ============================================================================
