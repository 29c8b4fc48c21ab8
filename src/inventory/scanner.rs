//! Artifact scanner: lists one level of a database's backup directory.
//!
//! A missing directory is an empty inventory, not an error, so partial
//! deployments (only one database configured) still produce reports. Any
//! other listing failure is returned to the caller; [`ArtifactScanner::scan_all`]
//! records it per database and keeps going.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::errors::{BlhError, Result};
use crate::inventory::artifact::{
    ArtifactKind, ArtifactStyle, BackupArtifact, DatabaseInventory, DatabaseKind, SkippedPath,
};
use crate::inventory::layout::BackupLayout;
use crate::inventory::size::SizeAggregator;

/// A database whose directory could not be listed.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub database: DatabaseKind,
    pub error_code: String,
    pub error: String,
}

/// Inventories for every known database type.
#[derive(Debug, Clone, Serialize)]
pub struct BackupCatalog {
    /// One inventory per database, in [`DatabaseKind::ALL`] order. Databases
    /// that failed to scan appear here as empty inventories.
    pub inventories: Vec<DatabaseInventory>,
    pub failures: Vec<ScanFailure>,
}

impl BackupCatalog {
    pub fn total_artifacts(&self) -> usize {
        self.inventories.iter().map(DatabaseInventory::len).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.inventories.iter().map(DatabaseInventory::total_size).sum()
    }

    pub fn get(&self, database: DatabaseKind) -> Option<&DatabaseInventory> {
        self.inventories.iter().find(|inv| inv.database == database)
    }
}

/// Builds [`DatabaseInventory`] values from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactScanner {
    sizes: SizeAggregator,
}

impl ArtifactScanner {
    pub const fn new() -> Self {
        Self {
            sizes: SizeAggregator::new(),
        }
    }

    /// Scan the conventional directory of `database` under `layout`.
    pub fn scan(&self, layout: &BackupLayout, database: DatabaseKind) -> Result<DatabaseInventory> {
        self.scan_dir(database, &layout.database_dir(database), database.style())
    }

    /// Scan every known database, collecting failures instead of aborting.
    pub fn scan_all(&self, layout: &BackupLayout) -> BackupCatalog {
        let mut inventories = Vec::with_capacity(DatabaseKind::ALL.len());
        let mut failures = Vec::new();

        for database in DatabaseKind::ALL {
            match self.scan(layout, database) {
                Ok(inventory) => inventories.push(inventory),
                Err(err) => {
                    failures.push(ScanFailure {
                        database,
                        error_code: err.code().to_string(),
                        error: err.to_string(),
                    });
                    inventories.push(DatabaseInventory::empty(database));
                }
            }
        }

        BackupCatalog {
            inventories,
            failures,
        }
    }

    /// Scan an arbitrary directory with an explicit artifact style.
    pub fn scan_dir(
        &self,
        database: DatabaseKind,
        dir: &Path,
        style: ArtifactStyle,
    ) -> Result<DatabaseInventory> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(DatabaseInventory::empty(database));
            }
            Err(err) => return Err(BlhError::io(dir, err)),
        };

        let mut inventory = DatabaseInventory::empty(database);

        for entry in entries {
            let entry = entry.map_err(|e| BlhError::io(dir, e))?;
            let path = entry.path();

            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(err) => {
                    inventory.skipped.push(SkippedPath {
                        path,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            let kind = match style {
                ArtifactStyle::Directory if file_type.is_dir() => ArtifactKind::Directory,
                ArtifactStyle::File { extension }
                    if file_type.is_file() && has_extension(&path, extension) =>
                {
                    ArtifactKind::File
                }
                _ => continue,
            };

            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    inventory.skipped.push(SkippedPath {
                        path,
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            let modified_at: DateTime<Utc> = match meta.modified() {
                Ok(t) => t.into(),
                Err(err) => {
                    inventory.skipped.push(SkippedPath {
                        path,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            let size_bytes = match kind {
                ArtifactKind::File => meta.len(),
                ArtifactKind::Directory => {
                    let measured = self.sizes.measure(&path);
                    inventory.skipped.extend(measured.skipped);
                    measured.total_bytes
                }
            };

            inventory.artifacts.push(BackupArtifact {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size_bytes,
                modified_at,
                kind,
            });
        }

        Ok(inventory)
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy() == extension)
}
