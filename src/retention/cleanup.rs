//! Cleanup executor: removes a retention plan's delete set, one artifact at a time.
//!
//! Dry runs walk the same loop and fill the same counters without touching
//! the filesystem. A failed removal is recorded and the batch carries on;
//! nothing here is atomic across artifacts.

#![allow(missing_docs)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::errors::{BlhError, Result};
use crate::inventory::artifact::{BackupArtifact, DatabaseKind};
use crate::logger::activity::{ActivityEvent, ActivityLogger};
use crate::retention::policy::RetentionPlan;

/// What happened to one artifact in the delete set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupStatus {
    Deleted,
    /// Dry run: would have been removed.
    WouldDelete,
    /// Vanished between scan and removal.
    AlreadyGone,
    Failed { error_code: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    #[serde(flatten)]
    pub status: CleanupStatus,
}

/// A single removal failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub error_code: String,
    pub error: String,
    pub recoverable: bool,
}

/// Summary of one database's cleanup. Same shape for dry and live runs.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub database: DatabaseKind,
    pub dry_run: bool,
    /// Removed (or, in a dry run, would-be removed) artifacts.
    pub deleted_count: usize,
    pub freed_bytes: u64,
    pub already_gone: usize,
    pub failures: Vec<CleanupFailure>,
    /// Per-artifact outcomes in plan order.
    pub outcomes: Vec<CleanupOutcome>,
    /// Wall time spent executing the plan.
    pub duration_ms: u64,
}

impl CleanupReport {
    fn new(database: DatabaseKind, dry_run: bool) -> Self {
        Self {
            database,
            dry_run,
            deleted_count: 0,
            freed_bytes: 0,
            already_gone: 0,
            failures: Vec::new(),
            outcomes: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Nothing was selected for deletion.
    pub fn is_noop(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Executes retention plans.
#[derive(Debug, Default)]
pub struct CleanupExecutor {
    logger: Option<ActivityLogger>,
}

impl CleanupExecutor {
    pub const fn new(logger: Option<ActivityLogger>) -> Self {
        Self { logger }
    }

    /// Remove (or simulate removing) every artifact the plan marks for deletion.
    pub fn execute(&self, plan: &RetentionPlan<'_>) -> CleanupReport {
        let start = Instant::now();
        let dry_run = plan.policy.dry_run;
        let mut report = CleanupReport::new(plan.database, dry_run);

        for decision in plan.delete() {
            let artifact = decision.artifact;
            let status = if dry_run {
                report.deleted_count += 1;
                report.freed_bytes += artifact.size_bytes;
                CleanupStatus::WouldDelete
            } else {
                self.remove_one(plan.database, artifact, &mut report)
            };
            report.outcomes.push(CleanupOutcome {
                name: artifact.name.clone(),
                path: artifact.path.clone(),
                size_bytes: artifact.size_bytes,
                modified_at: artifact.modified_at,
                status,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;
        report.duration_ms = duration_ms;
        self.log_event(&ActivityEvent::CleanupCompleted {
            database: plan.database,
            deleted: report.deleted_count,
            failed: report.failures.len(),
            freed_bytes: report.freed_bytes,
            dry_run,
            duration_ms: report.duration_ms,
        });
        report
    }

    fn remove_one(
        &self,
        database: DatabaseKind,
        artifact: &BackupArtifact,
        report: &mut CleanupReport,
    ) -> CleanupStatus {
        let del_start = Instant::now();
        match delete_artifact(artifact) {
            Ok(Removal::Removed) => {
                report.deleted_count += 1;
                report.freed_bytes += artifact.size_bytes;
                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = del_start.elapsed().as_millis() as u64;
                self.log_event(&ActivityEvent::ArtifactDeleted {
                    database,
                    path: artifact.path.to_string_lossy().to_string(),
                    size_bytes: artifact.size_bytes,
                    duration_ms,
                });
                CleanupStatus::Deleted
            }
            Ok(Removal::AlreadyGone) => {
                report.already_gone += 1;
                CleanupStatus::AlreadyGone
            }
            Err(e) => {
                let failure = CleanupFailure {
                    path: artifact.path.clone(),
                    error_code: e.code().to_string(),
                    error: e.to_string(),
                    recoverable: e.is_retryable(),
                };
                self.log_event(&ActivityEvent::ArtifactDeletionFailed {
                    database,
                    path: artifact.path.to_string_lossy().to_string(),
                    error_code: failure.error_code.clone(),
                    error_message: failure.error.clone(),
                });
                let status = CleanupStatus::Failed {
                    error_code: failure.error_code.clone(),
                    error: failure.error.clone(),
                };
                report.failures.push(failure);
                status
            }
        }
    }

    fn log_event(&self, event: &ActivityEvent) {
        if let Some(logger) = &self.logger {
            logger.log(event);
        }
    }
}

enum Removal {
    Removed,
    AlreadyGone,
}

/// Recursive removal for directory artifacts, plain removal for files.
fn delete_artifact(artifact: &BackupArtifact) -> Result<Removal> {
    let path = artifact.path.as_path();
    let removed = if artifact.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removed {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Removal::AlreadyGone),
        Err(e) => return Err(BlhError::io(path, e)),
    }

    if still_exists(path) {
        return Err(BlhError::Runtime {
            details: format!("path still exists after deletion: {}", path.display()),
        });
    }
    Ok(Removal::Removed)
}

fn still_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::artifact::{ArtifactKind, DatabaseInventory};
    use crate::retention::policy::{RetentionPolicy, select};
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
    }

    fn file_artifact(dir: &Path, name: &str, days_ago: i64) -> BackupArtifact {
        let path = dir.join(name);
        fs::write(&path, vec![b'x'; 100]).unwrap();
        BackupArtifact {
            name: name.to_string(),
            path,
            size_bytes: 100,
            modified_at: now() - ChronoDuration::days(days_ago),
            kind: ArtifactKind::File,
        }
    }

    fn five_dumps(dir: &Path) -> DatabaseInventory {
        DatabaseInventory::new(
            DatabaseKind::MySql,
            (0..5)
                .map(|d| file_artifact(dir, &format!("app_{d}.sql"), d))
                .collect(),
        )
    }

    fn remaining(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn live_run_deletes_oldest_beyond_count() {
        let dir = tempfile::tempdir().unwrap();
        let inv = five_dumps(dir.path());
        let plan = select(&inv, &RetentionPolicy::by_count(2), now());

        let report = CleanupExecutor::default().execute(&plan);

        assert!(!report.dry_run);
        assert_eq!(report.deleted_count, 3);
        assert_eq!(report.freed_bytes, 300);
        assert!(!report.has_failures());
        assert_eq!(remaining(dir.path()), 2);
        assert!(dir.path().join("app_0.sql").exists());
        assert!(dir.path().join("app_1.sql").exists());
        assert!(
            report
                .outcomes
                .iter()
                .all(|o| o.status == CleanupStatus::Deleted)
        );
    }

    #[test]
    fn dry_run_reports_identically_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let inv = five_dumps(dir.path());
        let policy = RetentionPolicy::by_count(2).with_dry_run(true);
        let plan = select(&inv, &policy, now());

        let report = CleanupExecutor::default().execute(&plan);

        assert!(report.dry_run);
        assert_eq!(report.deleted_count, 3);
        assert_eq!(report.freed_bytes, 300);
        assert_eq!(remaining(dir.path()), 5);
        assert!(
            report
                .outcomes
                .iter()
                .all(|o| o.status == CleanupStatus::WouldDelete)
        );
    }

    #[test]
    fn removes_directory_artifacts_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("backup_2026-01-01_00-00-00");
        fs::create_dir_all(dump.join("admin")).unwrap();
        fs::write(dump.join("admin/system.bson"), "bson").unwrap();
        let inv = DatabaseInventory::new(
            DatabaseKind::MongoDb,
            vec![BackupArtifact {
                name: "backup_2026-01-01_00-00-00".to_string(),
                path: dump.clone(),
                size_bytes: 4,
                modified_at: now() - ChronoDuration::days(90),
                kind: ArtifactKind::Directory,
            }],
        );
        let plan = select(&inv, &RetentionPolicy::by_age(30), now());

        let report = CleanupExecutor::default().execute(&plan);
        assert_eq!(report.deleted_count, 1);
        assert!(!dump.exists());
    }

    #[test]
    fn vanished_artifact_is_already_gone() {
        let dir = tempfile::tempdir().unwrap();
        let inv = five_dumps(dir.path());
        fs::remove_file(dir.path().join("app_4.sql")).unwrap();
        let plan = select(&inv, &RetentionPolicy::by_count(3), now());

        let report = CleanupExecutor::default().execute(&plan);
        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.freed_bytes, 100);
        assert_eq!(report.already_gone, 1);
        assert!(!report.has_failures());
    }

    #[test]
    fn failure_is_recorded_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut inv = five_dumps(dir.path());
        // A "file" artifact that is really a non-empty directory cannot be
        // removed with remove_file, even by root.
        let blocker = dir.path().join("app_3.sql");
        fs::remove_file(&blocker).unwrap();
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("inner"), "x").unwrap();
        inv.artifacts[3].path = blocker.clone();

        let plan = select(&inv, &RetentionPolicy::by_count(2), now());
        let report = CleanupExecutor::default().execute(&plan);

        assert_eq!(report.deleted_count, 2);
        assert_eq!(report.freed_bytes, 200);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, blocker);
        assert!(report.failures[0].error_code.starts_with("BLH-3"));
        assert!(blocker.exists());
        assert!(!dir.path().join("app_2.sql").exists());
        assert!(!dir.path().join("app_4.sql").exists());
        assert!(matches!(
            report.outcomes[1].status,
            CleanupStatus::Failed { .. }
        ));
    }

    #[test]
    fn empty_delete_set_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let inv = five_dumps(dir.path());
        let plan = select(&inv, &RetentionPolicy::by_count(10), now());
        let report = CleanupExecutor::default().execute(&plan);
        assert!(report.is_noop());
        assert_eq!(report.deleted_count, 0);
    }

    #[test]
    fn live_run_writes_activity_log() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("mysql");
        fs::create_dir(&data).unwrap();
        let inv = five_dumps(&data);
        let log_path = dir.path().join("activity.jsonl");
        let logger = ActivityLogger::open(&log_path);

        let plan = select(&inv, &RetentionPolicy::by_count(4), now());
        let report = CleanupExecutor::new(Some(logger.clone())).execute(&plan);
        logger.flush();

        let log = fs::read_to_string(&log_path).unwrap();
        let events: Vec<serde_json::Value> = log
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "artifact_delete");
        assert_eq!(events[1]["event"], "cleanup_complete");
        assert_eq!(events[1]["count"], 1);
        assert_eq!(events[1]["duration_ms"], report.duration_ms);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["duration_ms"], report.duration_ms);
    }

    #[test]
    fn dry_run_logs_only_the_summary() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("mysql");
        fs::create_dir(&data).unwrap();
        let inv = five_dumps(&data);
        let log_path = dir.path().join("activity.jsonl");
        let logger = ActivityLogger::open(&log_path);

        let plan = select(&inv, &RetentionPolicy::by_count(1).with_dry_run(true), now());
        CleanupExecutor::new(Some(logger.clone())).execute(&plan);
        logger.flush();

        let log = fs::read_to_string(&log_path).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("\"dry_run\":true"));
    }
}
