//! `[compiler]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [compiler]
//! version = "0.14.0"                   # bundled binary version
//! bin_dir = "/opt/ergo/bin"            # default: `bin/` next to the ergo executable
//! # path = "/usr/local/bin/typst"      # explicit binary, skips platform lookup
//! search_path = false                  # fall back to `typst` on PATH
//! output_pattern = "output/p{p}.svg"   # watch mode page artifacts
//! export_output = "output/main.pdf"    # one-shot export intermediate file
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Compiler lookup and invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Explicit compiler binary. Relative paths resolve against the project root.
    pub path: Option<PathBuf>,

    /// Directory holding `<os>-<arch>/typst_<version>` binaries.
    pub bin_dir: Option<PathBuf>,

    /// Version suffix of the bundled binary name.
    pub version: String,

    /// Look up `typst` on PATH when the bundled binary is missing.
    pub search_path: bool,

    /// Project-relative artifact pattern for watch mode; `{p}` is the page number.
    pub output_pattern: String,

    /// Project-relative output file of a one-shot export.
    pub export_output: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            path: None,
            bin_dir: None,
            version: "0.14.0".into(),
            search_path: false,
            output_pattern: "output/p{p}.svg".into(),
            export_output: "output/main.pdf".into(),
        }
    }
}
