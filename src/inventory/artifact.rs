//! Backup artifact and per-database inventory model.

#![allow(missing_docs)]

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::BlhError;

/// Database families the helper knows how to inventory.
///
/// Declaration order is the order reports iterate in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    MongoDb,
    MySql,
    PostgreSql,
}

impl DatabaseKind {
    pub const ALL: [Self; 3] = [Self::MongoDb, Self::MySql, Self::PostgreSql];

    /// Subdirectory of the backup root that holds this database's artifacts.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::MongoDb => "mongo",
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
        }
    }

    /// Machine identifier, matching the serialized form and CLI argument.
    pub const fn key(self) -> &'static str {
        match self {
            Self::MongoDb => "mongodb",
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
        }
    }

    /// Display name for reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::MongoDb => "MongoDB",
            Self::MySql => "MySQL",
            Self::PostgreSql => "PostgreSQL",
        }
    }

    /// How dumps for this database are laid out on disk.
    pub const fn style(self) -> ArtifactStyle {
        match self {
            Self::MongoDb => ArtifactStyle::Directory,
            Self::MySql | Self::PostgreSql => ArtifactStyle::File { extension: "sql" },
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DatabaseKind {
    type Err = BlhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            "mysql" => Ok(Self::MySql),
            "postgresql" | "postgres" | "pg" => Ok(Self::PostgreSql),
            other => Err(BlhError::UnknownDatabase {
                name: other.to_string(),
            }),
        }
    }
}

/// Which children of a database directory count as artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStyle {
    /// Every subdirectory is one backup.
    Directory,
    /// Every regular file with this extension (no leading dot) is one backup.
    File { extension: &'static str },
}

/// Physical shape of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    File,
    Directory,
}

/// One discrete backup unit found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupArtifact {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    pub kind: ArtifactKind,
}

impl BackupArtifact {
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, ArtifactKind::Directory)
    }
}

/// A path the size walk could not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPath {
    pub path: PathBuf,
    pub error: String,
}

/// All artifacts currently on disk for one database, in scan order.
///
/// Scan order is unspecified; use [`Self::ascending`] or
/// [`Self::descending`] for anything order-sensitive.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInventory {
    pub database: DatabaseKind,
    pub artifacts: Vec<BackupArtifact>,
    /// Children skipped while listing or measuring.
    pub skipped: Vec<SkippedPath>,
}

impl DatabaseInventory {
    pub fn new(database: DatabaseKind, artifacts: Vec<BackupArtifact>) -> Self {
        Self {
            database,
            artifacts,
            skipped: Vec::new(),
        }
    }

    pub fn empty(database: DatabaseKind) -> Self {
        Self::new(database, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.artifacts.iter().map(|a| a.size_bytes).sum()
    }

    /// Oldest first. Ties keep scan order.
    pub fn ascending(&self) -> Vec<&BackupArtifact> {
        let mut view: Vec<&BackupArtifact> = self.artifacts.iter().collect();
        view.sort_by_key(|a| a.modified_at);
        view
    }

    /// Newest first. Ties keep scan order.
    pub fn descending(&self) -> Vec<&BackupArtifact> {
        let mut view: Vec<&BackupArtifact> = self.artifacts.iter().collect();
        view.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        view
    }

    /// Most recently modified artifact.
    pub fn latest(&self) -> Option<&BackupArtifact> {
        self.artifacts.iter().max_by_key(|a| a.modified_at)
    }
}
