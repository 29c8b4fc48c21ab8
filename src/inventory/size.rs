//! Best-effort recursive size of directory-style artifacts.
//!
//! Unreadable children are recorded and skipped; one bad file never blanks
//! out the size of an otherwise valid backup. Symlinks are not followed.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use crate::inventory::artifact::SkippedPath;

/// Result of measuring one directory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirSize {
    /// Sum of all regular files that could be read.
    pub total_bytes: u64,
    /// Number of regular files counted.
    pub file_count: u64,
    /// Children that could not be listed or stat'ed.
    pub skipped: Vec<SkippedPath>,
}

impl DirSize {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Sums regular-file sizes beneath a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeAggregator;

impl SizeAggregator {
    pub const fn new() -> Self {
        Self
    }

    /// Walk `root` depth-first and total every regular file below it.
    pub fn measure(&self, root: &Path) -> DirSize {
        let mut result = DirSize::default();
        let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    result.skipped.push(skip(&dir, &err));
                    continue;
                }
            };

            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        result.skipped.push(skip(&dir, &err));
                        continue;
                    }
                };
                let path = entry.path();
                // symlink_metadata: never follow links out of the artifact.
                let meta = match fs::symlink_metadata(&path) {
                    Ok(meta) => meta,
                    Err(err) => {
                        result.skipped.push(skip(&path, &err));
                        continue;
                    }
                };
                let file_type = meta.file_type();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    result.total_bytes = result.total_bytes.saturating_add(meta.len());
                    result.file_count += 1;
                }
            }
        }

        result
    }
}

fn skip(path: &Path, err: &std::io::Error) -> SkippedPath {
    SkippedPath {
        path: path.to_path_buf(),
        error: err.to_string(),
    }
}
