//! Aggregate backup health: additive deductions from a perfect 100.

#![allow(missing_docs)]

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::anomaly::AnomalyThresholds;
use crate::analysis::recommendations::{self, Recommendation};
use crate::analysis::statistics::DatabaseStatistics;
use crate::core::config::{AnalysisConfig, Config, HealthConfig};
use crate::inventory::artifact::{DatabaseInventory, DatabaseKind};

const PERFECT_SCORE: u32 = 100;

/// Why points were taken off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionReason {
    /// Newest backup older than the stale threshold.
    Stale,
    /// Newest backup older than the aging threshold (but not stale).
    Aging,
    /// Size or schedule anomalies.
    Anomalies,
    /// Fewer backups than the minimum history.
    ThinHistory,
    /// Growth above the alert threshold.
    RapidGrowth,
}

/// One line of the score breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deduction {
    pub database: DatabaseKind,
    pub reason: DeductionReason,
    pub points: u32,
}

/// Coarse label for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthGrade {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
}

impl HealthGrade {
    pub const fn from_score(score: u8) -> Self {
        match score {
            70.. => Self::Excellent,
            50..=69 => Self::Good,
            30..=49 => Self::Fair,
            _ => Self::NeedsAttention,
        }
    }
}

impl fmt::Display for HealthGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsAttention => "Needs Attention",
        })
    }
}

/// Reduces per-database statistics to a 0–100 score.
#[derive(Debug, Clone)]
pub struct HealthScorer {
    analysis: AnalysisConfig,
    weights: HealthConfig,
}

impl Default for HealthScorer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default(), HealthConfig::default())
    }
}

impl HealthScorer {
    pub const fn new(analysis: AnalysisConfig, weights: HealthConfig) -> Self {
        Self { analysis, weights }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.analysis.clone(), config.health.clone())
    }

    /// Deductions for one database. Empty databases cost nothing.
    pub fn deductions(&self, stats: &DatabaseStatistics, now: DateTime<Utc>) -> Vec<Deduction> {
        let mut out = Vec::new();
        let Some(days) = stats.days_since_newest(now) else {
            return out;
        };
        let mut take = |reason, points| {
            if points > 0 {
                out.push(Deduction {
                    database: stats.database,
                    reason,
                    points,
                });
            }
        };

        if days > self.analysis.stale_days {
            take(DeductionReason::Stale, self.weights.stale_penalty);
        } else if days > self.analysis.aging_days {
            take(DeductionReason::Aging, self.weights.aging_penalty);
        }

        let anomaly_count = u32::try_from(stats.anomalies.len()).unwrap_or(u32::MAX);
        take(
            DeductionReason::Anomalies,
            anomaly_count.saturating_mul(self.weights.anomaly_penalty),
        );

        if stats.total_count < self.analysis.min_history {
            take(DeductionReason::ThinHistory, self.weights.thin_history_penalty);
        }

        if stats.growth_or_zero() > self.analysis.growth_alert_pct {
            take(DeductionReason::RapidGrowth, self.weights.growth_penalty);
        }

        out
    }

    /// Score across all databases, floored at 0.
    pub fn score(&self, stats: &[DatabaseStatistics], now: DateTime<Utc>) -> u8 {
        let deductions: Vec<Deduction> = stats
            .iter()
            .flat_map(|s| self.deductions(s, now))
            .collect();
        score_from(&deductions)
    }
}

fn score_from(deductions: &[Deduction]) -> u8 {
    let total = deductions
        .iter()
        .fold(0_u32, |acc, d| acc.saturating_add(d.points));
    u8::try_from(PERFECT_SCORE.saturating_sub(total)).unwrap_or(0)
}

/// Everything the doctor surface shows.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub databases: Vec<DatabaseStatistics>,
    pub score: u8,
    pub grade: HealthGrade,
    pub deductions: Vec<Deduction>,
    pub recommendations: Vec<Recommendation>,
}

impl HealthReport {
    /// Derive statistics, score and advisories from scanned inventories.
    pub fn build(inventories: &[DatabaseInventory], config: &Config, now: DateTime<Utc>) -> Self {
        let thresholds = AnomalyThresholds::from_config(&config.analysis);
        let databases: Vec<DatabaseStatistics> = inventories
            .iter()
            .map(|inv| DatabaseStatistics::compute(inv, &thresholds))
            .collect();
        Self::from_statistics(databases, config, now)
    }

    pub fn from_statistics(
        databases: Vec<DatabaseStatistics>,
        config: &Config,
        now: DateTime<Utc>,
    ) -> Self {
        let scorer = HealthScorer::from_config(config);
        let deductions: Vec<Deduction> = databases
            .iter()
            .flat_map(|s| scorer.deductions(s, now))
            .collect();
        let score = score_from(&deductions);
        let recommendations = recommendations::recommend(&databases, now, &config.analysis);

        Self {
            generated_at: now,
            databases,
            score,
            grade: HealthGrade::from_score(score),
            deductions,
            recommendations,
        }
    }

    pub fn total_count(&self) -> usize {
        self.databases.iter().map(|s| s.total_count).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.databases.iter().map(|s| s.total_size_bytes).sum()
    }

    /// 20-cell bar: one filled cell per 5 points.
    pub fn score_bar(&self) -> String {
        let filled = usize::from(self.score / 5);
        let empty = usize::from((100 - self.score) / 5);
        format!("{}{}", "█".repeat(filled), "░".repeat(empty))
    }
}
