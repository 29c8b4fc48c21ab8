//! Size-outlier and schedule-gap detection over an ascending artifact list.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::core::config::AnalysisConfig;
use crate::inventory::artifact::BackupArtifact;

/// A notable deviation in artifact size or backup cadence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Artifact is `ratio` times larger than the average.
    SizeSpike { artifact: String, ratio: f64 },
    /// Artifact is `ratio` times smaller than the average.
    SizeDrop { artifact: String, ratio: f64 },
    /// No backup between `from` and `to`.
    ScheduleGap {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        gap_days: i64,
    },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeSpike { artifact, ratio } => {
                write!(f, "{artifact} is {ratio:.1}x larger than average")
            }
            Self::SizeDrop { artifact, ratio } => {
                write!(f, "{artifact} is {ratio:.1}x smaller than average")
            }
            Self::ScheduleGap { from, to, gap_days } => write!(
                f,
                "{gap_days}-day gap between backups ({} to {})",
                from.format("%b %-d"),
                to.format("%b %-d")
            ),
        }
    }
}

/// Thresholds for both rule families.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyThresholds {
    pub spike_ratio: f64,
    pub drop_ratio: f64,
    pub gap: Duration,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl AnomalyThresholds {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            spike_ratio: config.spike_ratio,
            drop_ratio: config.drop_ratio,
            gap: Duration::try_days(config.gap_days).unwrap_or(Duration::MAX),
        }
    }
}

/// Run both rule families. `ascending` must be sorted oldest first.
///
/// Size anomalies come first in artifact order, then gap anomalies.
pub fn detect(
    ascending: &[&BackupArtifact],
    average_size: u64,
    thresholds: &AnomalyThresholds,
) -> Vec<Anomaly> {
    let mut anomalies = size_anomalies(ascending, average_size, thresholds);
    anomalies.extend(schedule_gaps(ascending, thresholds.gap));
    anomalies
}

/// Flag artifacts far above or below the average size.
///
/// Zero-byte artifacts are never reported as drops.
pub fn size_anomalies(
    artifacts: &[&BackupArtifact],
    average_size: u64,
    thresholds: &AnomalyThresholds,
) -> Vec<Anomaly> {
    if average_size == 0 {
        return Vec::new();
    }
    let average = average_size as f64;

    artifacts
        .iter()
        .filter_map(|artifact| {
            let ratio = artifact.size_bytes as f64 / average;
            if ratio > thresholds.spike_ratio {
                Some(Anomaly::SizeSpike {
                    artifact: artifact.name.clone(),
                    ratio,
                })
            } else if ratio < thresholds.drop_ratio && artifact.size_bytes > 0 {
                Some(Anomaly::SizeDrop {
                    artifact: artifact.name.clone(),
                    ratio: 1.0 / ratio,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Flag consecutive backups more than `max_gap` apart.
pub fn schedule_gaps(ascending: &[&BackupArtifact], max_gap: Duration) -> Vec<Anomaly> {
    ascending
        .windows(2)
        .filter_map(|pair| {
            let (from, to) = (pair[0].modified_at, pair[1].modified_at);
            let gap = to - from;
            (gap > max_gap).then(|| Anomaly::ScheduleGap {
                from,
                to,
                gap_days: gap.num_days(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::artifact::ArtifactKind;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn artifacts(sizes: &[u64], spacing_days: i64) -> Vec<BackupArtifact> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| BackupArtifact {
                name: format!("dump_{i}.sql"),
                path: PathBuf::from(format!("/b/mysql/dump_{i}.sql")),
                size_bytes: size,
                modified_at: base() + Duration::days(spacing_days * i as i64),
                kind: ArtifactKind::File,
            })
            .collect()
    }

    fn average(list: &[BackupArtifact]) -> u64 {
        list.iter().map(|a| a.size_bytes).sum::<u64>() / list.len() as u64
    }

    #[test]
    fn out_of_range_gap_saturates_instead_of_panicking() {
        let config = AnalysisConfig {
            gap_days: i64::MAX / 2,
            ..AnalysisConfig::default()
        };
        let thresholds = AnomalyThresholds::from_config(&config);
        assert_eq!(thresholds.gap, Duration::MAX);

        let list = artifacts(&[100, 100], 400);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        assert!(schedule_gaps(&refs, thresholds.gap).is_empty());
    }

    #[test]
    fn spike_detected_against_average() {
        let list = artifacts(&[100, 100, 100, 100, 1000], 1);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        let avg = average(&list);
        assert_eq!(avg, 280);

        let found = size_anomalies(&refs, avg, &AnomalyThresholds::default());
        assert_eq!(found.len(), 1);
        match &found[0] {
            Anomaly::SizeSpike { artifact, ratio } => {
                assert_eq!(artifact, "dump_4.sql");
                assert!((ratio - 1000.0 / 280.0).abs() < 1e-9);
            }
            other => panic!("expected spike, got {other:?}"),
        }
    }

    #[test]
    fn drop_reports_inverse_ratio() {
        let list = artifacts(&[1000, 1000, 1000, 100], 1);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        let found = size_anomalies(&refs, average(&list), &AnomalyThresholds::default());
        assert_eq!(found.len(), 1);
        match &found[0] {
            Anomaly::SizeDrop { artifact, ratio } => {
                assert_eq!(artifact, "dump_3.sql");
                // average 775 / 100
                assert!((ratio - 7.75).abs() < 1e-9);
            }
            other => panic!("expected drop, got {other:?}"),
        }
    }

    #[test]
    fn zero_byte_artifact_is_not_a_drop() {
        let list = artifacts(&[500, 500, 0], 1);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        let found = size_anomalies(&refs, average(&list), &AnomalyThresholds::default());
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn zero_average_yields_nothing() {
        let list = artifacts(&[0, 0, 0], 1);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        assert!(size_anomalies(&refs, 0, &AnomalyThresholds::default()).is_empty());
    }

    #[test]
    fn ratios_exactly_at_threshold_are_not_flagged() {
        // average 200: 400 is exactly 2.0x, 100 exactly 0.5x.
        let list = artifacts(&[400, 100, 100], 1);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        assert!(size_anomalies(&refs, 200, &AnomalyThresholds::default()).is_empty());
    }

    #[test]
    fn ten_day_gap_is_reported() {
        let list = artifacts(&[10, 10], 10);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        let gaps = schedule_gaps(&refs, Duration::days(7));
        assert_eq!(gaps.len(), 1);
        match &gaps[0] {
            Anomaly::ScheduleGap { from, to, gap_days } => {
                assert_eq!(*gap_days, 10);
                assert_eq!(*from, base());
                assert_eq!(*to, base() + Duration::days(10));
            }
            other => panic!("expected gap, got {other:?}"),
        }
    }

    #[test]
    fn exactly_seven_days_is_not_a_gap() {
        let list = artifacts(&[10, 10, 10], 7);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        assert!(schedule_gaps(&refs, Duration::days(7)).is_empty());
    }

    #[test]
    fn gap_days_truncate_partial_days() {
        let mut list = artifacts(&[10, 10], 0);
        list[1].modified_at = base() + Duration::days(8) + Duration::hours(23);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        let gaps = schedule_gaps(&refs, Duration::days(7));
        assert!(matches!(gaps[0], Anomaly::ScheduleGap { gap_days: 8, .. }));
    }

    #[test]
    fn size_anomalies_precede_gaps() {
        let list = artifacts(&[100, 100, 100, 100, 1000], 9);
        let refs: Vec<&BackupArtifact> = list.iter().collect();
        let all = detect(&refs, average(&list), &AnomalyThresholds::default());
        assert_eq!(all.len(), 5);
        assert!(matches!(all[0], Anomaly::SizeSpike { .. }));
        assert!(all[1..]
            .iter()
            .all(|a| matches!(a, Anomaly::ScheduleGap { .. })));
    }

    #[test]
    fn display_matches_report_wording() {
        let spike = Anomaly::SizeSpike {
            artifact: "backup_9".to_string(),
            ratio: 3.571,
        };
        assert_eq!(spike.to_string(), "backup_9 is 3.6x larger than average");

        let gap = Anomaly::ScheduleGap {
            from: base(),
            to: base() + Duration::days(10),
            gap_days: 10,
        };
        assert_eq!(gap.to_string(), "10-day gap between backups (Jan 1 to Jan 11)");
    }
}
