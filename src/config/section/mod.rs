//! Configuration section definitions.
//!
//! Each module corresponds to a section in `ergo.toml`:
//!
//! | Module     | TOML Section   | Purpose                              |
//! |------------|----------------|--------------------------------------|
//! | `compiler` | `[compiler]`   | Compiler binary and output paths     |
//! | `document` | `[document]`   | Generated source layout              |
//! | `tracker`  | `[tracker]`    | Output polling                       |
//! | `watch`    | `[watch]`      | Watch process stop timeouts          |

mod compiler;
mod document;
mod tracker;
mod watch;

pub use compiler::CompilerConfig;
pub use document::DocumentConfig;
pub use tracker::TrackerConfig;
pub use watch::WatchConfig;
