//! Core process state shared across commands.

mod state;

pub use state::{is_shutdown, register_preview, setup_shutdown_handler};
