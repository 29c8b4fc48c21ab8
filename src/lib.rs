#![forbid(unsafe_code)]

//! Backup Lifecycle Helper (blh): inventory, health analysis and retention
//! for database backup artifacts.
//!
//! Backups live under a root directory with one subdirectory per database
//! type (`mongo/`, `mysql/`, `postgresql/`). The library:
//! 1. **Inventories** the artifacts in each subdirectory, with recursive sizes
//! 2. **Analyzes** them into statistics, anomalies, a health score and advice
//! 3. **Enforces retention** by age or count, with a dry-run mode
//!
//! # Library usage
//!
//! ```rust,no_run
//! use backup_lifecycle_helper::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use backup_lifecycle_helper::core::config::Config;
//! use backup_lifecycle_helper::retention::policy::{RetentionPolicy, select};
//! ```

pub mod prelude;

pub mod analysis;
pub mod core;
pub mod inventory;
pub mod logger;
pub mod retention;

#[cfg(test)]
mod test_properties;
