//! External compiler invocation.
//!
//! The compiler is an opaque binary with two modes, both run from the
//! project root:
//!
//! ```text
//! <exe> watch   main.typ output/p{p}.svg    continuous, one file per page
//! <exe> compile main.typ output/main.pdf    one-shot export
//! ```

mod resolve;

pub use resolve::{ResolveError, resolve};

use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::utils::exec::Cmd;

/// A resolved compiler plus the project-relative paths it is invoked with.
#[derive(Debug, Clone)]
pub struct Compiler {
    exe: PathBuf,
    entry: String,
    output_pattern: String,
    export_output: String,
}

impl Compiler {
    pub fn new(
        exe: impl Into<PathBuf>,
        entry: impl Into<String>,
        output_pattern: impl Into<String>,
        export_output: impl Into<String>,
    ) -> Self {
        Self {
            exe: exe.into(),
            entry: entry.into(),
            output_pattern: output_pattern.into(),
            export_output: export_output.into(),
        }
    }

    /// Resolve the executable for `config` and capture its invocation paths.
    pub fn locate(config: &ProjectConfig) -> Result<Self, ResolveError> {
        let exe = resolve(&config.compiler, config.get_root())?;
        crate::debug!("compiler"; "using {}", exe.display());
        Ok(Self::new(
            exe,
            config.document.entry.clone(),
            config.compiler.output_pattern.clone(),
            config.compiler.export_output.clone(),
        ))
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Project-relative path of the one-shot export artifact.
    pub fn export_output(&self) -> &str {
        &self.export_output
    }

    /// Directory the watch mode writes pages into.
    pub fn watch_output_dir(&self, root: &Path) -> PathBuf {
        parent_dir(root, &self.output_pattern)
    }

    /// Directory the one-shot export writes into.
    pub fn export_output_dir(&self, root: &Path) -> PathBuf {
        parent_dir(root, &self.export_output)
    }

    /// Continuous watch invocation.
    pub fn watch(&self, root: &Path) -> Cmd {
        Cmd::new(&self.exe)
            .args(["watch", self.entry.as_str(), self.output_pattern.as_str()])
            .cwd(root)
    }

    /// One-shot compile invocation.
    pub fn compile(&self, root: &Path) -> Cmd {
        Cmd::new(&self.exe)
            .args(["compile", self.entry.as_str(), self.export_output.as_str()])
            .cwd(root)
    }
}

fn parent_dir(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    path.parent().map_or_else(|| root.to_path_buf(), Path::to_path_buf)
}
