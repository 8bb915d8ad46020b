//! Worker thread that owns the async runtime and the active view.

pub mod commands;
pub mod runtime;
