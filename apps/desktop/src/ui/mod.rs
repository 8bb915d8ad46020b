//! Terminal front end: line input parsing and plain-text rendering of view models.

pub mod input;
pub mod render;
