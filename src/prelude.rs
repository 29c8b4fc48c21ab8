//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use backup_lifecycle_helper::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{BlhError, Result};
pub use crate::core::format::{format_age, format_size};

// Inventory
pub use crate::inventory::artifact::{BackupArtifact, DatabaseInventory, DatabaseKind};
pub use crate::inventory::layout::{BackupCreator, BackupLayout, BackupRestorer};
pub use crate::inventory::scanner::{ArtifactScanner, BackupCatalog};

// Analysis
pub use crate::analysis::chart::TrendChart;
pub use crate::analysis::health::{HealthGrade, HealthReport, HealthScorer};
pub use crate::analysis::recommendations::Recommendation;
pub use crate::analysis::statistics::DatabaseStatistics;

// Retention
pub use crate::retention::cleanup::{CleanupExecutor, CleanupReport};
pub use crate::retention::policy::{RetentionMode, RetentionPlan, RetentionPolicy, select};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLogger};
