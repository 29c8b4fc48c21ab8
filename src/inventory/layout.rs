//! On-disk layout of the backup tree and the dump/restore collaborator seams.
//!
//! The helper never creates or restores backups itself. External tools do
//! that through [`BackupCreator`] and [`BackupRestorer`]; this module only
//! tells them where artifacts live and which one is newest.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::core::errors::{BlhError, Result};
use crate::inventory::artifact::{ArtifactStyle, BackupArtifact, DatabaseKind, DatabaseInventory};

/// Timestamp suffix used in conventional artifact names.
const NAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Root of the backup tree: one subdirectory per database type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupLayout {
    root: PathBuf,
}

impl BackupLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every artifact of `database`.
    pub fn database_dir(&self, database: DatabaseKind) -> PathBuf {
        self.root.join(database.dir_name())
    }

    /// Conventional path for a new artifact created at `at`.
    ///
    /// Directory-style dumps are named `backup_<ts>`; file-style dumps are
    /// `<database_name>_<ts>.<ext>`. Nothing reads these names back: all
    /// metadata comes from the filesystem.
    pub fn artifact_destination(
        &self,
        database: DatabaseKind,
        database_name: &str,
        at: DateTime<Utc>,
    ) -> PathBuf {
        let stamp = at.format(NAME_TIMESTAMP_FORMAT);
        let name = match database.style() {
            ArtifactStyle::Directory => format!("backup_{stamp}"),
            ArtifactStyle::File { extension } => format!("{database_name}_{stamp}.{extension}"),
        };
        self.database_dir(database).join(name)
    }
}

/// Produces one artifact at the conventional location (an external dump tool).
pub trait BackupCreator {
    /// Create a backup of `database` at `destination`, returning the path written.
    fn create(&self, database: DatabaseKind, destination: &Path) -> Result<PathBuf>;
}

/// Consumes one artifact to restore a database (an external restore tool).
pub trait BackupRestorer {
    fn restore(&self, database: DatabaseKind, artifact: &BackupArtifact) -> Result<()>;
}

/// Ask `creator` for a new backup of `database` at the conventional path.
pub fn create_backup<C: BackupCreator + ?Sized>(
    creator: &C,
    layout: &BackupLayout,
    database: DatabaseKind,
    database_name: &str,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    let destination = layout.artifact_destination(database, database_name, now);
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BlhError::io(parent, e))?;
    }
    creator.create(database, &destination)
}

/// Hand the newest artifact of `inventory` to `restorer`.
///
/// Returns the artifact that was restored.
pub fn restore_latest<'a, R: BackupRestorer + ?Sized>(
    restorer: &R,
    inventory: &'a DatabaseInventory,
) -> Result<&'a BackupArtifact> {
    let latest = inventory.latest().ok_or_else(|| BlhError::NoArtifacts {
        database: inventory.database.label().to_string(),
    })?;
    restorer.restore(inventory.database, latest)?;
    Ok(latest)
}
