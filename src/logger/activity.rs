//! Activity events and the shared logger that records them as JSONL.
//!
//! Callers describe what happened with an [`ActivityEvent`]; the logger maps
//! it onto a [`LogEntry`] and appends it. The handle is `Clone + Send + Sync`
//! so scanning and cleanup code can hold one without threading `&mut` through.

#![allow(missing_docs)]

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::inventory::artifact::DatabaseKind;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Things worth recording in the activity log.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    ScanCompleted {
        database: DatabaseKind,
        artifacts: usize,
        total_bytes: u64,
        skipped_paths: usize,
        duration_ms: u64,
    },
    ArtifactDeleted {
        database: DatabaseKind,
        path: String,
        size_bytes: u64,
        duration_ms: u64,
    },
    ArtifactDeletionFailed {
        database: DatabaseKind,
        path: String,
        error_code: String,
        error_message: String,
    },
    CleanupCompleted {
        database: DatabaseKind,
        deleted: usize,
        failed: usize,
        freed_bytes: u64,
        dry_run: bool,
        duration_ms: u64,
    },
}

/// Cloneable handle to a single JSONL writer.
#[derive(Clone)]
pub struct ActivityLogger {
    writer: Arc<Mutex<JsonlWriter>>,
}

impl std::fmt::Debug for ActivityLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLogger")
            .field("state", &self.writer.lock().state())
            .finish()
    }
}

impl ActivityLogger {
    /// Open (or create) the activity log at `path`.
    pub fn open(path: &Path) -> Self {
        Self::from_writer(JsonlWriter::open(JsonlConfig::new(path)))
    }

    /// A logger that records nothing.
    pub fn disabled() -> Self {
        Self::from_writer(JsonlWriter::discard())
    }

    fn from_writer(writer: JsonlWriter) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn log(&self, event: &ActivityEvent) {
        let entry = event_to_log_entry(event);
        let mut writer = self.writer.lock();
        writer.write_entry(&entry);
    }

    pub fn flush(&self) {
        self.writer.lock().flush();
    }
}

fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::ScanCompleted {
            database,
            artifacts,
            total_bytes,
            skipped_paths,
            duration_ms,
        } => {
            let severity = if *skipped_paths > 0 {
                Severity::Warning
            } else {
                Severity::Info
            };
            let mut e = LogEntry::new(EventType::ScanComplete, severity);
            e.database = Some(database.key().to_string());
            e.count = Some(*artifacts);
            e.bytes = Some(*total_bytes);
            e.duration_ms = Some(*duration_ms);
            if *skipped_paths > 0 {
                e.details = Some(format!("skipped_paths={skipped_paths}"));
            }
            e
        }
        ActivityEvent::ArtifactDeleted {
            database,
            path,
            size_bytes,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::ArtifactDelete, Severity::Info);
            e.database = Some(database.key().to_string());
            e.path = Some(path.clone());
            e.size = Some(*size_bytes);
            e.duration_ms = Some(*duration_ms);
            e.ok = Some(true);
            e
        }
        ActivityEvent::ArtifactDeletionFailed {
            database,
            path,
            error_code,
            error_message,
        } => {
            let mut e = LogEntry::new(EventType::ArtifactDeleteFailed, Severity::Warning);
            e.database = Some(database.key().to_string());
            e.path = Some(path.clone());
            e.ok = Some(false);
            e.error_code = Some(error_code.clone());
            e.error_message = Some(error_message.clone());
            e
        }
        ActivityEvent::CleanupCompleted {
            database,
            deleted,
            failed,
            freed_bytes,
            dry_run,
            duration_ms,
        } => {
            let severity = if *failed > 0 {
                Severity::Warning
            } else {
                Severity::Info
            };
            let mut e = LogEntry::new(EventType::CleanupComplete, severity);
            e.database = Some(database.key().to_string());
            e.count = Some(*deleted);
            e.bytes = Some(*freed_bytes);
            e.dry_run = Some(*dry_run);
            e.duration_ms = Some(*duration_ms);
            e.ok = Some(*failed == 0);
            if *failed > 0 {
                e.details = Some(format!("failed={failed}"));
            }
            e
        }
    }
}
