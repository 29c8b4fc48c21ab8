//! Property-based tests for retention and analysis invariants.
//!
//! Uses `proptest` to check that selection always partitions an inventory,
//! that count and age policies delete exactly what they should, and that
//! statistics and scoring stay well-behaved for arbitrary histories.

use std::path::PathBuf;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use crate::analysis::anomaly::AnomalyThresholds;
use crate::analysis::health::HealthScorer;
use crate::analysis::statistics::DatabaseStatistics;
use crate::core::format::format_size;
use crate::inventory::artifact::{ArtifactKind, BackupArtifact, DatabaseInventory, DatabaseKind};
use crate::retention::cleanup::CleanupExecutor;
use crate::retention::policy::{RetentionPolicy, select};

// ──────────────────── strategies ────────────────────

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
}

/// (size, age in minutes) pairs; ages span roughly 60 days.
fn arb_entries(max: usize) -> impl Strategy<Value = Vec<(u64, i64)>> {
    prop::collection::vec((0u64..10_000_000, 0i64..86_400), 0..max)
}

fn inventory_from(entries: &[(u64, i64)]) -> DatabaseInventory {
    DatabaseInventory::new(
        DatabaseKind::MySql,
        entries
            .iter()
            .enumerate()
            .map(|(i, &(size, age_minutes))| BackupArtifact {
                name: format!("app_{i}.sql"),
                path: PathBuf::from(format!("/b/mysql/app_{i}.sql")),
                size_bytes: size,
                modified_at: now() - Duration::minutes(age_minutes),
                kind: ArtifactKind::File,
            })
            .collect(),
    )
}

fn arb_policy() -> impl Strategy<Value = RetentionPolicy> {
    prop_oneof![
        (1u32..90).prop_map(RetentionPolicy::by_age),
        (1usize..20).prop_map(RetentionPolicy::by_count),
    ]
}

// ──────────────────── retention ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every artifact is decided exactly once.
    #[test]
    fn selection_partitions_inventory(
        entries in arb_entries(40),
        policy in arb_policy(),
    ) {
        let inv = inventory_from(&entries);
        let plan = select(&inv, &policy, now());

        prop_assert_eq!(plan.decisions.len(), inv.len());
        prop_assert_eq!(plan.keep().count() + plan.delete_count(), inv.len());

        let mut seen: Vec<&str> = plan
            .decisions
            .iter()
            .map(|d| d.artifact.name.as_str())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen.len(), inv.len());
    }

    /// Count retention deletes max(0, n - k) and keeps the newest.
    #[test]
    fn by_count_deletes_surplus(entries in arb_entries(40), keep in 1usize..20) {
        let inv = inventory_from(&entries);
        let plan = select(&inv, &RetentionPolicy::by_count(keep), now());

        prop_assert_eq!(plan.delete_count(), inv.len().saturating_sub(keep));

        let oldest_kept = plan.keep().map(|d| d.artifact.modified_at).min();
        let newest_deleted = plan.delete().map(|d| d.artifact.modified_at).max();
        if let (Some(kept), Some(deleted)) = (oldest_kept, newest_deleted) {
            prop_assert!(kept >= deleted);
        }
    }

    /// Age retention deletes exactly the artifacts strictly older than the cutoff.
    #[test]
    fn by_age_respects_cutoff(entries in arb_entries(40), days in 1u32..90) {
        let inv = inventory_from(&entries);
        let policy = RetentionPolicy::by_age(days);
        let cutoff = policy.cutoff(now()).unwrap();
        let plan = select(&inv, &policy, now());

        for decision in &plan.decisions {
            prop_assert_eq!(decision.is_delete(), decision.artifact.modified_at < cutoff);
        }
    }

    /// Reclaimable bytes are the sum of the delete set.
    #[test]
    fn reclaimable_matches_delete_set(entries in arb_entries(40), policy in arb_policy()) {
        let inv = inventory_from(&entries);
        let plan = select(&inv, &policy, now());
        let expected: u64 = plan.delete().map(|d| d.artifact.size_bytes).sum();
        prop_assert_eq!(plan.reclaimable_bytes(), expected);
        prop_assert!(plan.reclaimable_bytes() <= inv.total_size());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// A dry run reports the same counts a live run achieves, and leaves the disk alone.
    #[test]
    fn dry_run_matches_live_counts(
        sizes in prop::collection::vec(1usize..512, 1..8),
        keep in 1usize..6,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let artifacts: Vec<BackupArtifact> = sizes
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                let path = dir.path().join(format!("app_{i}.sql"));
                std::fs::write(&path, vec![b'x'; len]).unwrap();
                BackupArtifact {
                    name: format!("app_{i}.sql"),
                    path,
                    size_bytes: len as u64,
                    modified_at: now() - Duration::hours(i64::try_from(i).unwrap()),
                    kind: ArtifactKind::File,
                }
            })
            .collect();
        let inv = DatabaseInventory::new(DatabaseKind::PostgreSql, artifacts);
        let executor = CleanupExecutor::default();

        let dry_policy = RetentionPolicy::by_count(keep).with_dry_run(true);
        let dry = executor.execute(&select(&inv, &dry_policy, now()));
        for artifact in &inv.artifacts {
            prop_assert!(artifact.path.exists());
        }

        let live = executor.execute(&select(&inv, &RetentionPolicy::by_count(keep), now()));
        prop_assert_eq!(dry.deleted_count, live.deleted_count);
        prop_assert_eq!(dry.freed_bytes, live.freed_bytes);
        prop_assert!(live.failures.is_empty());

        let remaining = inv.artifacts.iter().filter(|a| a.path.exists()).count();
        prop_assert_eq!(remaining, inv.len().min(keep));
    }
}

// ──────────────────── analysis ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Multiplying every size by the same factor changes neither growth nor anomalies.
    ///
    /// Sizes are multiples of the artifact count so the integer average is exact.
    #[test]
    fn statistics_are_scale_invariant(
        units in prop::collection::vec((1u64..1_000, 0i64..86_400), 2..20),
        factor in 2u64..1_000,
    ) {
        let count = units.len() as u64;
        let base: Vec<(u64, i64)> = units.iter().map(|&(u, age)| (u * count, age)).collect();
        let scaled: Vec<(u64, i64)> = base.iter().map(|&(s, age)| (s * factor, age)).collect();
        let thresholds = AnomalyThresholds::default();

        let a = DatabaseStatistics::compute(&inventory_from(&base), &thresholds);
        let b = DatabaseStatistics::compute(&inventory_from(&scaled), &thresholds);

        prop_assert_eq!(a.anomalies.len(), b.anomalies.len());
        match (a.growth_rate_percent, b.growth_rate_percent) {
            (Some(x), Some(y)) => prop_assert!((x - y).abs() < 1e-9),
            (x, y) => prop_assert_eq!(x, y),
        }
    }

    /// Score stays in range and never rises when history gets older.
    #[test]
    fn score_is_bounded_and_monotone_in_staleness(
        entries in arb_entries(30),
        extra_days in 0i64..60,
    ) {
        let inv = inventory_from(&entries);
        let stats = vec![DatabaseStatistics::compute(&inv, &AnomalyThresholds::default())];
        let scorer = HealthScorer::default();

        let fresh = scorer.score(&stats, now());
        let later = scorer.score(&stats, now() + Duration::days(extra_days));
        prop_assert!(fresh <= 100);
        prop_assert!(later <= fresh);
    }

    /// Formatted sizes stay within one display step of the real magnitude.
    #[test]
    fn format_size_is_precise(bytes in any::<u64>()) {
        let text = format_size(bytes);
        let (number, unit) = text.split_once(' ').unwrap();
        let value: f64 = number.parse().unwrap();
        let scale = match unit {
            "B" => 1.0,
            "KB" => 1024f64,
            "MB" => 1024f64.powi(2),
            "GB" => 1024f64.powi(3),
            "TB" => 1024f64.powi(4),
            "PB" => 1024f64.powi(5),
            "EB" => 1024f64.powi(6),
            other => return Err(TestCaseError::fail(format!("unexpected unit {other}"))),
        };
        prop_assert!(value <= 1024.0 || unit == "EB");
        let actual = bytes as f64;
        prop_assert!((value * scale - actual).abs() <= 0.05 * scale + 1.0);
    }
}
