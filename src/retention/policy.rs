//! Retention policy and keep/delete selection.

#![allow(missing_docs)]

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::core::errors::{BlhError, Result};
use crate::inventory::artifact::{BackupArtifact, DatabaseInventory, DatabaseKind};

/// Which threshold decides retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RetentionMode {
    /// Delete artifacts older than `max_days`.
    ByAge { max_days: u32 },
    /// Keep only the `max_count` most recent artifacts.
    ByCount { max_count: usize },
}

impl fmt::Display for RetentionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByAge { max_days } => write!(f, "keeping last {max_days} days"),
            Self::ByCount { max_count } => write!(f, "keeping {max_count} most recent"),
        }
    }
}

/// Immutable retention rule, built once and passed to selection and cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    pub mode: RetentionMode,
    /// Report decisions without touching the filesystem.
    pub dry_run: bool,
}

impl RetentionPolicy {
    /// Build a policy from the two optional thresholds.
    ///
    /// Exactly one must be given and it must be non-zero.
    pub fn new(max_days: Option<u32>, max_count: Option<usize>, dry_run: bool) -> Result<Self> {
        let mode = match (max_days, max_count) {
            (Some(_), Some(_)) => {
                return Err(BlhError::InvalidPolicy {
                    details: "specify either an age limit or a count limit, not both".to_string(),
                });
            }
            (None, None) => {
                return Err(BlhError::InvalidPolicy {
                    details: "specify an age limit (days) or a count limit (keep)".to_string(),
                });
            }
            (Some(0), None) => {
                return Err(BlhError::InvalidPolicy {
                    details: "age limit must be at least 1 day".to_string(),
                });
            }
            (None, Some(0)) => {
                return Err(BlhError::InvalidPolicy {
                    details: "count limit must be at least 1".to_string(),
                });
            }
            (Some(max_days), None) => RetentionMode::ByAge { max_days },
            (None, Some(max_count)) => RetentionMode::ByCount { max_count },
        };
        Ok(Self { mode, dry_run })
    }

    pub const fn by_age(max_days: u32) -> Self {
        Self {
            mode: RetentionMode::ByAge { max_days },
            dry_run: false,
        }
    }

    pub const fn by_count(max_count: usize) -> Self {
        Self {
            mode: RetentionMode::ByCount { max_count },
            dry_run: false,
        }
    }

    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Age cutoff for [`RetentionMode::ByAge`]; `None` for count policies.
    ///
    /// A limit reaching past the earliest representable time clamps to it,
    /// so nothing is old enough to delete.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.mode {
            RetentionMode::ByAge { max_days } => Some(age_cutoff(now, max_days)),
            RetentionMode::ByCount { .. } => None,
        }
    }
}

fn age_cutoff(now: DateTime<Utc>, max_days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(max_days))
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionAction {
    Keep,
    Delete,
}

/// Verdict for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionDecision<'a> {
    pub artifact: &'a BackupArtifact,
    pub action: RetentionAction,
    pub reason: String,
}

impl RetentionDecision<'_> {
    pub fn is_delete(&self) -> bool {
        self.action == RetentionAction::Delete
    }
}

/// Decisions for a whole inventory, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct RetentionPlan<'a> {
    pub database: DatabaseKind,
    pub policy: RetentionPolicy,
    pub decisions: Vec<RetentionDecision<'a>>,
}

impl<'a> RetentionPlan<'a> {
    pub fn keep(&self) -> impl Iterator<Item = &RetentionDecision<'a>> {
        self.decisions.iter().filter(|d| !d.is_delete())
    }

    pub fn delete(&self) -> impl Iterator<Item = &RetentionDecision<'a>> {
        self.decisions.iter().filter(|d| d.is_delete())
    }

    pub fn delete_count(&self) -> usize {
        self.delete().count()
    }

    /// Bytes the delete set would free.
    pub fn reclaimable_bytes(&self) -> u64 {
        self.delete().map(|d| d.artifact.size_bytes).sum()
    }
}

/// Partition `inventory` into keep and delete decisions under `policy`.
///
/// Every artifact gets exactly one decision. Artifacts sitting exactly on the
/// age cutoff are kept.
pub fn select<'a>(
    inventory: &'a DatabaseInventory,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionPlan<'a> {
    let descending = inventory.descending();
    let decisions = match policy.mode {
        RetentionMode::ByAge { max_days } => {
            let cutoff = age_cutoff(now, max_days);
            descending
                .into_iter()
                .map(|artifact| {
                    if artifact.modified_at < cutoff {
                        RetentionDecision {
                            artifact,
                            action: RetentionAction::Delete,
                            reason: format!("older than {max_days} day(s)"),
                        }
                    } else {
                        RetentionDecision {
                            artifact,
                            action: RetentionAction::Keep,
                            reason: format!("within {max_days} day(s)"),
                        }
                    }
                })
                .collect()
        }
        RetentionMode::ByCount { max_count } => descending
            .into_iter()
            .enumerate()
            .map(|(rank, artifact)| {
                if rank < max_count {
                    RetentionDecision {
                        artifact,
                        action: RetentionAction::Keep,
                        reason: format!("among {max_count} most recent"),
                    }
                } else {
                    RetentionDecision {
                        artifact,
                        action: RetentionAction::Delete,
                        reason: format!("beyond {max_count} most recent"),
                    }
                }
            })
            .collect(),
    };

    RetentionPlan {
        database: inventory.database,
        policy: *policy,
        decisions,
    }
}
