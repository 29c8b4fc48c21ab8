//! Advisory synthesis from per-database statistics.

#![allow(missing_docs)]

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::statistics::DatabaseStatistics;
use crate::core::config::AnalysisConfig;
use crate::inventory::artifact::DatabaseKind;

/// One human-readable advisory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    /// Newest backup is older than the stale threshold.
    RunBackupSoon { database: DatabaseKind, days: f64 },
    /// Backups are growing quickly.
    IncreaseFrequency {
        database: DatabaseKind,
        growth_percent: f64,
    },
    /// Stored backups exceed the large-storage threshold.
    RunCleanup {
        database: DatabaseKind,
        total_size_bytes: u64,
    },
    /// Too few backups to fall back on.
    BuildHistory { database: DatabaseKind, count: usize },
    /// At least one size or schedule anomaly was found.
    ReviewSizePatterns {
        database: DatabaseKind,
        anomalies: usize,
    },
    /// Nothing triggered for any database.
    AllHealthy,
    /// Always appended last.
    AutomateSchedule,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunBackupSoon { database, days } => write!(
                f,
                "{database}: it has been {days:.0} days since the last backup. Run a full backup soon"
            ),
            Self::IncreaseFrequency {
                database,
                growth_percent,
            } => write!(
                f,
                "{database}: backups are growing rapidly ({growth_percent:.1}%). Consider more frequent backups"
            ),
            Self::RunCleanup {
                database,
                total_size_bytes,
            } => write!(
                f,
                "{database}: backups use {}. Consider running 'cleanup' to remove old backups",
                crate::core::format::format_size(*total_size_bytes)
            ),
            Self::BuildHistory { database, count } => write!(
                f,
                "{database}: only {count} backup(s). Build a backup history for better protection"
            ),
            Self::ReviewSizePatterns {
                database,
                anomalies,
            } => write!(
                f,
                "{database}: {anomalies} anomaly(ies) detected. Review your backup patterns"
            ),
            Self::AllHealthy => f.write_str("Everything looks great! Your backups are healthy."),
            Self::AutomateSchedule => {
                f.write_str("Set up automated backups on a schedule for peace of mind")
            }
        }
    }
}

/// Build the ordered advisory list.
///
/// Databases are visited in the order given; each may trigger several
/// advisories. When none trigger, a single [`Recommendation::AllHealthy`]
/// stands in for them. [`Recommendation::AutomateSchedule`] always closes
/// the list.
pub fn recommend(
    stats: &[DatabaseStatistics],
    now: DateTime<Utc>,
    config: &AnalysisConfig,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for db in stats.iter().filter(|s| s.has_backups()) {
        if let Some(days) = db.days_since_newest(now) {
            if days > config.stale_days {
                out.push(Recommendation::RunBackupSoon {
                    database: db.database,
                    days,
                });
            }
        }
        if let Some(growth) = db.growth_rate_percent {
            if growth > config.growth_advice_pct {
                out.push(Recommendation::IncreaseFrequency {
                    database: db.database,
                    growth_percent: growth,
                });
            }
        }
        if db.total_size_bytes > config.large_storage_bytes {
            out.push(Recommendation::RunCleanup {
                database: db.database,
                total_size_bytes: db.total_size_bytes,
            });
        }
        if db.total_count < config.min_history {
            out.push(Recommendation::BuildHistory {
                database: db.database,
                count: db.total_count,
            });
        }
        if !db.anomalies.is_empty() {
            out.push(Recommendation::ReviewSizePatterns {
                database: db.database,
                anomalies: db.anomalies.len(),
            });
        }
    }

    if out.is_empty() {
        out.push(Recommendation::AllHealthy);
    }
    out.push(Recommendation::AutomateSchedule);
    out
}
