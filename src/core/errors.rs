//! BLH-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, BlhError>;

/// Top-level error type for the backup lifecycle helper.
#[derive(Debug, Error)]
pub enum BlhError {
    #[error("[BLH-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[BLH-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[BLH-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[BLH-1101] invalid retention policy: {details}")]
    InvalidPolicy { details: String },

    #[error("[BLH-1102] unknown database type: {name}")]
    UnknownDatabase { name: String },

    #[error("[BLH-2001] no backup artifacts found for {database}")]
    NoArtifacts { database: String },

    #[error("[BLH-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[BLH-3001] permission denied for {path}")]
    PermissionDenied { path: PathBuf },

    #[error("[BLH-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[BLH-3101] {operation} collaborator failed: {details}")]
    Collaborator {
        operation: &'static str,
        details: String,
    },

    #[error("[BLH-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl BlhError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "BLH-1001",
            Self::MissingConfig { .. } => "BLH-1002",
            Self::ConfigParse { .. } => "BLH-1003",
            Self::InvalidPolicy { .. } => "BLH-1101",
            Self::UnknownDatabase { .. } => "BLH-1102",
            Self::NoArtifacts { .. } => "BLH-2001",
            Self::Serialization { .. } => "BLH-2101",
            Self::PermissionDenied { .. } => "BLH-3001",
            Self::Io { .. } => "BLH-3002",
            Self::Collaborator { .. } => "BLH-3101",
            Self::Runtime { .. } => "BLH-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Collaborator { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    ///
    /// Permission failures are mapped to [`BlhError::PermissionDenied`] so
    /// callers can report them without digging into the IO source.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io { path, source }
    }
}

impl From<serde_json::Error> for BlhError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for BlhError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<BlhError> {
        vec![
            BlhError::InvalidConfig {
                details: String::new(),
            },
            BlhError::MissingConfig {
                path: PathBuf::new(),
            },
            BlhError::ConfigParse {
                context: "",
                details: String::new(),
            },
            BlhError::InvalidPolicy {
                details: String::new(),
            },
            BlhError::UnknownDatabase {
                name: String::new(),
            },
            BlhError::NoArtifacts {
                database: String::new(),
            },
            BlhError::Serialization {
                context: "",
                details: String::new(),
            },
            BlhError::PermissionDenied {
                path: PathBuf::new(),
            },
            BlhError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            BlhError::Collaborator {
                operation: "restore",
                details: String::new(),
            },
            BlhError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(BlhError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_blh_prefix() {
        for err in &all_variants() {
            assert!(
                err.code().starts_with("BLH-"),
                "code {} must start with BLH-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = BlhError::InvalidPolicy {
            details: "specify either --days or --keep".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("BLH-1101"), "display should contain code: {msg}");
        assert!(msg.contains("--days"), "display should contain details: {msg}");
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(
            BlhError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            }
            .is_retryable()
        );
        assert!(
            BlhError::Collaborator {
                operation: "dump",
                details: String::new()
            }
            .is_retryable()
        );

        assert!(
            !BlhError::InvalidPolicy {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !BlhError::PermissionDenied {
                path: PathBuf::new()
            }
            .is_retryable()
        );
        assert!(
            !BlhError::NoArtifacts {
                database: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_constructor_maps_permission_denied() {
        let err = BlhError::io(
            "/backups/mysql",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert_eq!(err.code(), "BLH-3001");

        let err = BlhError::io(
            "/backups/mysql/a.sql",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "BLH-3002");
        assert!(err.to_string().contains("/backups/mysql/a.sql"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: BlhError = json_err.into();
        assert_eq!(err.code(), "BLH-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: BlhError = toml_err.into();
        assert_eq!(err.code(), "BLH-1003");
    }
}
