//! Utility modules shared by the pipeline stages.

pub mod exec;
pub mod fs;
pub mod path;
pub mod platform;
