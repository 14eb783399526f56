//! Platform keys for locating bundled binaries.
//!
//! Bundled compilers live under `<os>-<arch>/`, for example `linux-x86_64`
//! or `macos-aarch64`.

/// Directory key of an operating system, if binaries ship for it.
pub fn os_key(os: &str) -> Option<&'static str> {
    match os {
        "linux" => Some("linux"),
        "windows" => Some("windows"),
        "macos" => Some("macos"),
        _ => None,
    }
}

/// Fold architecture aliases to a canonical name.
pub fn normalize_arch(arch: &str) -> Option<&'static str> {
    match arch.to_ascii_lowercase().as_str() {
        "amd64" | "x86_64" | "x64" => Some("x86_64"),
        "arm64" | "aarch64" => Some("aarch64"),
        _ => None,
    }
}

/// Executable suffix for an operating system key.
pub fn exe_suffix(os: &str) -> &'static str {
    if os == "windows" { ".exe" } else { "" }
}
