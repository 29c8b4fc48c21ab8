//! Per-database backup statistics derived from an inventory.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::anomaly::{self, Anomaly, AnomalyThresholds};
use crate::inventory::artifact::{BackupArtifact, DatabaseInventory, DatabaseKind};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Read-only summary of one database's backup history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseStatistics {
    pub database: DatabaseKind,
    pub total_count: usize,
    pub total_size_bytes: u64,
    /// Integer mean; `None` when there are no artifacts.
    pub average_size_bytes: Option<u64>,
    pub oldest_at: Option<DateTime<Utc>>,
    pub newest_at: Option<DateTime<Utc>>,
    /// Percent change from the earliest to the latest artifact. `None` with
    /// fewer than two artifacts or a zero-byte earliest artifact.
    pub growth_rate_percent: Option<f64>,
    /// Sizes oldest first.
    pub size_history: Vec<u64>,
    pub anomalies: Vec<Anomaly>,
}

impl DatabaseStatistics {
    /// Statistics for a database with no artifacts.
    pub fn empty(database: DatabaseKind) -> Self {
        Self {
            database,
            total_count: 0,
            total_size_bytes: 0,
            average_size_bytes: None,
            oldest_at: None,
            newest_at: None,
            growth_rate_percent: None,
            size_history: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    /// Compute statistics and anomalies for `inventory`.
    pub fn compute(inventory: &DatabaseInventory, thresholds: &AnomalyThresholds) -> Self {
        let ascending = inventory.ascending();
        let (Some(first), Some(last)) = (ascending.first(), ascending.last()) else {
            return Self::empty(inventory.database);
        };

        let total_count = ascending.len();
        let total_size_bytes: u64 = ascending.iter().map(|a| a.size_bytes).sum();
        let average = total_size_bytes / total_count as u64;

        Self {
            database: inventory.database,
            total_count,
            total_size_bytes,
            average_size_bytes: Some(average),
            oldest_at: Some(first.modified_at),
            newest_at: Some(last.modified_at),
            growth_rate_percent: growth_rate(&ascending),
            size_history: ascending.iter().map(|a| a.size_bytes).collect(),
            anomalies: anomaly::detect(&ascending, average, thresholds),
        }
    }

    pub fn has_backups(&self) -> bool {
        self.total_count > 0
    }

    /// Fractional days since the newest artifact, or `None` when empty.
    pub fn days_since_newest(&self, now: DateTime<Utc>) -> Option<f64> {
        self.newest_at
            .map(|newest| (now - newest).num_seconds() as f64 / SECONDS_PER_DAY)
    }

    /// Growth rate with the neutral value substituted when undefined.
    pub fn growth_or_zero(&self) -> f64 {
        self.growth_rate_percent.unwrap_or(0.0)
    }
}

fn growth_rate(ascending: &[&BackupArtifact]) -> Option<f64> {
    if ascending.len() < 2 {
        return None;
    }
    let first = ascending.first()?.size_bytes;
    let last = ascending.last()?.size_bytes;
    if first == 0 {
        return None;
    }
    let first = first as f64;
    Some((last as f64 - first) / first * 100.0)
}
