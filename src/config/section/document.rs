//! `[document]` section configuration.
//!
//! Layout of the generated source tree and the template it targets.
//!
//! # Example
//!
//! ```toml
//! [document]
//! entry = "main.typ"                           # root document, also the compiler entry
//! sections_dir = "sections"                    # one file per top-level section
//! snapshot = "form_data.json"                  # form-data snapshot for session restore
//! package = "@preview/versatile-apa:7.1.5"     # imported by every generated file
//! bibliography = "bibliography/ref.bib"
//! csl = "csl/apa.csl"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// Generated source layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub entry: String,
    pub sections_dir: String,
    pub snapshot: String,
    /// Template package spec, emitted as `#import "<package>": *`.
    pub package: String,
    pub bibliography: String,
    pub csl: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            entry: "main.typ".into(),
            sections_dir: "sections".into(),
            snapshot: "form_data.json".into(),
            package: "@preview/versatile-apa:7.1.5".into(),
            bibliography: "bibliography/ref.bib".into(),
            csl: "csl/apa.csl".into(),
        }
    }
}

impl DocumentConfig {
    /// Import line placed at the top of every generated file.
    pub fn import_line(&self) -> String {
        format!("#import \"{}\": *", self.package)
    }

    /// Relative path from a file in `sections_dir` back to the project
    /// root, one `../` per directory level.
    ///
    /// `None` unless `sections_dir` is a relative path made of plain
    /// directory names.
    pub fn root_prefix(&self) -> Option<String> {
        let mut depth = 0;
        for component in Path::new(&self.sections_dir).components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
                _ => return None,
            }
        }
        (depth > 0).then(|| "../".repeat(depth))
    }
}
