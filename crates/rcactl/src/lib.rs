//! rcactl library - exposes modules for integration tests.

pub mod collectors;
pub mod commands;
pub mod groq;
