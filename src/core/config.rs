//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{BlhError, Result};

/// One gibibyte, used by the large-storage advisory default.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Largest accepted schedule-gap threshold (about a century).
pub const MAX_GAP_DAYS: i64 = 36_500;

/// Full configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub backup: BackupConfig,
    pub analysis: AnalysisConfig,
    pub health: HealthConfig,
    pub paths: PathsConfig,
}

/// Where the backup tree lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackupConfig {
    /// Root directory holding one subdirectory per database type.
    pub root: PathBuf,
}

/// Thresholds for anomaly detection and advisories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Size ratio above which an artifact is a spike.
    pub spike_ratio: f64,
    /// Size ratio below which a non-empty artifact is a drop.
    pub drop_ratio: f64,
    /// Gap between consecutive backups (days) that counts as a schedule gap.
    pub gap_days: i64,
    /// Days since the newest backup after which it is considered stale.
    pub stale_days: f64,
    /// Days since the newest backup after which it is considered aging.
    pub aging_days: f64,
    /// Minimum number of backups for a healthy history.
    pub min_history: usize,
    /// Growth percentage that costs health points.
    pub growth_alert_pct: f64,
    /// Growth percentage that triggers the backup-frequency advisory.
    pub growth_advice_pct: f64,
    /// Total storage above which cleanup is advised.
    pub large_storage_bytes: u64,
}

/// Health score deductions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HealthConfig {
    pub stale_penalty: u32,
    pub aging_penalty: u32,
    pub anomaly_penalty: u32,
    pub thin_history_penalty: u32,
    pub growth_penalty: u32,
}

/// Filesystem locations used by the tool itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("BACKUP"),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            spike_ratio: 2.0,
            drop_ratio: 0.5,
            gap_days: 7,
            stale_days: 7.0,
            aging_days: 3.0,
            min_history: 3,
            growth_alert_pct: 100.0,
            growth_advice_pct: 50.0,
            large_storage_bytes: 10 * GIB,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            stale_penalty: 15,
            aging_penalty: 5,
            anomaly_penalty: 3,
            thin_history_penalty: 10,
            growth_penalty: 10,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[BLH-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("blh").join("config.toml"),
            activity_log: home_dir
                .join(".local")
                .join("share")
                .join("blh")
                .join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| BlhError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(BlhError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(|name| env::var(name).ok())?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = var("BLH_BACKUP_ROOT") {
            self.backup.root = PathBuf::from(raw);
        }
        if let Some(raw) = var("BLH_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }

        let a = &mut self.analysis;
        set_parsed(&var, "BLH_ANALYSIS_SPIKE_RATIO", &mut a.spike_ratio)?;
        set_parsed(&var, "BLH_ANALYSIS_DROP_RATIO", &mut a.drop_ratio)?;
        set_parsed(&var, "BLH_ANALYSIS_GAP_DAYS", &mut a.gap_days)?;
        set_parsed(&var, "BLH_ANALYSIS_STALE_DAYS", &mut a.stale_days)?;
        set_parsed(&var, "BLH_ANALYSIS_AGING_DAYS", &mut a.aging_days)?;
        set_parsed(&var, "BLH_ANALYSIS_MIN_HISTORY", &mut a.min_history)?;
        set_parsed(&var, "BLH_ANALYSIS_GROWTH_ALERT_PCT", &mut a.growth_alert_pct)?;
        set_parsed(&var, "BLH_ANALYSIS_GROWTH_ADVICE_PCT", &mut a.growth_advice_pct)?;
        set_parsed(
            &var,
            "BLH_ANALYSIS_LARGE_STORAGE_BYTES",
            &mut a.large_storage_bytes,
        )?;

        let h = &mut self.health;
        set_parsed(&var, "BLH_HEALTH_STALE_PENALTY", &mut h.stale_penalty)?;
        set_parsed(&var, "BLH_HEALTH_AGING_PENALTY", &mut h.aging_penalty)?;
        set_parsed(&var, "BLH_HEALTH_ANOMALY_PENALTY", &mut h.anomaly_penalty)?;
        set_parsed(
            &var,
            "BLH_HEALTH_THIN_HISTORY_PENALTY",
            &mut h.thin_history_penalty,
        )?;
        set_parsed(&var, "BLH_HEALTH_GROWTH_PENALTY", &mut h.growth_penalty)?;
        Ok(())
    }

    fn normalize_paths(&mut self) {
        let s = self.backup.root.to_string_lossy();
        if s.len() > 1 {
            if let Some(stripped) = s.strip_suffix('/') {
                self.backup.root = PathBuf::from(stripped);
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.backup.root.as_os_str().is_empty() {
            return Err(BlhError::InvalidConfig {
                details: "backup.root must not be empty".to_string(),
            });
        }

        let a = &self.analysis;
        if !(a.spike_ratio > 1.0 && a.spike_ratio.is_finite()) {
            return Err(BlhError::InvalidConfig {
                details: format!("analysis.spike_ratio must be > 1, got {}", a.spike_ratio),
            });
        }
        if !(a.drop_ratio > 0.0 && a.drop_ratio < 1.0) {
            return Err(BlhError::InvalidConfig {
                details: format!("analysis.drop_ratio must be in (0, 1), got {}", a.drop_ratio),
            });
        }
        if !(1..=MAX_GAP_DAYS).contains(&a.gap_days) {
            return Err(BlhError::InvalidConfig {
                details: format!(
                    "analysis.gap_days must be in [1, {MAX_GAP_DAYS}], got {}",
                    a.gap_days
                ),
            });
        }
        if !(a.aging_days >= 0.0 && a.aging_days < a.stale_days) {
            return Err(BlhError::InvalidConfig {
                details: "analysis.aging_days must be >= 0 and < analysis.stale_days"
                    .to_string(),
            });
        }
        if a.growth_advice_pct < 0.0 || a.growth_alert_pct < 0.0 {
            return Err(BlhError::InvalidConfig {
                details: "analysis growth thresholds must be non-negative".to_string(),
            });
        }
        if a.large_storage_bytes == 0 {
            return Err(BlhError::InvalidConfig {
                details: "analysis.large_storage_bytes must be > 0".to_string(),
            });
        }

        let h = &self.health;
        for (name, value) in [
            ("stale_penalty", h.stale_penalty),
            ("aging_penalty", h.aging_penalty),
            ("anomaly_penalty", h.anomaly_penalty),
            ("thin_history_penalty", h.thin_history_penalty),
            ("growth_penalty", h.growth_penalty),
        ] {
            if value > 100 {
                return Err(BlhError::InvalidConfig {
                    details: format!("health.{name} must be in [0, 100], got {value}"),
                });
            }
        }
        if h.aging_penalty > h.stale_penalty {
            return Err(BlhError::InvalidConfig {
                details: "health.aging_penalty must not exceed health.stale_penalty".to_string(),
            });
        }

        Ok(())
    }
}

fn set_parsed<T, V>(var: &V, name: &str, slot: &mut T) -> Result<()>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    if let Some(raw) = var(name) {
        *slot = raw.trim().parse::<T>().map_err(|error| BlhError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}
