//! Core types: errors, configuration, formatting helpers.

pub mod config;
pub mod errors;
pub mod format;
