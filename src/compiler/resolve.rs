//! Compiler executable resolution.
//!
//! Lookup order:
//!
//! 1. `compiler.path` (or `--compiler`), relative to the project root
//! 2. bundled binary at `<bin_dir>/<os>-<arch>/typst_<version>[.exe]`
//! 3. `typst` on PATH, only with `compiler.search_path = true`

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::CompilerConfig;
use crate::utils::path::resolve_against;
use crate::utils::platform::{exe_suffix, normalize_arch, os_key};

/// Binary name looked up on PATH.
const PATH_BINARY: &str = "typst";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unsupported platform `{os}-{arch}`")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("compiler executable not found at `{}`", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("compiler executable not found at `{}` or on PATH", .0.display())]
    NotOnPath(PathBuf),
}

/// Resolve the compiler for the running platform.
pub fn resolve(config: &CompilerConfig, root: &Path) -> Result<PathBuf, ResolveError> {
    if let Some(path) = &config.path {
        let exe = resolve_against(path, root);
        return if exe.is_file() {
            Ok(exe)
        } else {
            Err(ResolveError::ExecutableNotFound(exe))
        };
    }

    let bin_dir = config.bin_dir.clone().unwrap_or_else(default_bin_dir);
    match bundled_path(
        std::env::consts::OS,
        std::env::consts::ARCH,
        &bin_dir,
        &config.version,
    ) {
        Ok(exe) if exe.is_file() => Ok(exe),
        Ok(exe) if config.search_path => which::which(PATH_BINARY)
            .map_err(|_| ResolveError::NotOnPath(exe)),
        Ok(exe) => Err(ResolveError::ExecutableNotFound(exe)),
        Err(_) if config.search_path => which::which(PATH_BINARY)
            .map_err(|_| ResolveError::NotOnPath(PathBuf::from(PATH_BINARY))),
        Err(e) => Err(e),
    }
}

/// Expected location of the bundled binary for a platform.
///
/// Does not touch the filesystem.
pub fn bundled_path(
    os: &str,
    arch: &str,
    bin_dir: &Path,
    version: &str,
) -> Result<PathBuf, ResolveError> {
    let unsupported = || ResolveError::UnsupportedPlatform {
        os: os.to_string(),
        arch: arch.to_string(),
    };
    let os_key = os_key(os).ok_or_else(unsupported)?;
    let arch = normalize_arch(arch).ok_or_else(unsupported)?;

    Ok(bin_dir
        .join(format!("{os_key}-{arch}"))
        .join(format!("typst_{version}{}", exe_suffix(os_key))))
}

/// `bin/` next to the running executable.
fn default_bin_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("bin")))
        .unwrap_or_else(|| PathBuf::from("bin"))
}
