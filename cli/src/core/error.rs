//! # slugdeploy Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout slugdeploy. There are
//! two families:
//!
//! - `ArchiveError`: the typed taxonomy returned by the slug archiver
//!   (`common::archive`). Callers can match on it to tell a missing source
//!   apart from an unreadable one or from an output device failure.
//! - `SlugError`: application-level errors for configuration and the remote
//!   APIs (GitHub, Heroku).
//!
//! Command handlers work with `Result<T>`, an alias for `anyhow::Result<T>`,
//! and attach context with `.context(..)` as errors travel upwards.
//!
//! ## Examples
//!
//! ```rust
//! match archive::create_archive(&request) {
//!     Ok(entries) => info!("tarball written with {entries} entries"),
//!     Err(ArchiveError::NotFound { path }) => eprintln!("no such file: {}", path.display()),
//!     Err(e) => return Err(e.into()),
//! }
//! ```
//!
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a slug tarball.
///
/// Every variant is fatal to the archive being written; there is no partial
/// success mode.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Source path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Permission denied while trying to {op} '{}'", path.display())]
    Permission { path: PathBuf, op: &'static str },

    #[error("Failed to read symbolic link target of '{}': {source}", path.display())]
    LinkResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while trying to {op} '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to close the {stage}: {source}")]
    Close {
        stage: CloseStage,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type (only regular files, directories and symlinks can be archived): {}", path.display())]
    UnsupportedFileType { path: PathBuf },

    #[error("Source path has no usable file name: {}", path.display())]
    InvalidSource { path: PathBuf },
}

impl ArchiveError {
    /// Classifies an `io::Error` raised while reading `path` during `op`.
    pub fn from_io(path: impl Into<PathBuf>, op: &'static str, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => ArchiveError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => ArchiveError::Permission { path, op },
            _ => ArchiveError::Io { path, op, source },
        }
    }
}

/// The three layers of the archive writer, in the order they are shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStage {
    Tar,
    Compression,
    Sink,
}

impl std::fmt::Display for CloseStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CloseStage::Tar => "tar stream",
            CloseStage::Compression => "gzip stream",
            CloseStage::Sink => "output file",
        };
        f.write_str(name)
    }
}

/// Application errors outside the archiver.
#[derive(Error, Debug)]
pub enum SlugError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required setting '{setting}' (pass {flag} or set it in .slugdeploy.toml)")]
    MissingSetting { setting: &'static str, flag: &'static str },

    #[error("{service} API returned status {status}:\n{body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {service}: {detail}")]
    UnexpectedResponse { service: &'static str, detail: String },
}

/// Type alias for Result using anyhow::Error at the command layer.
pub type Result<T> = anyhow::Result<T>;

/// Result type returned by the archiver.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let missing = ArchiveError::NotFound {
            path: PathBuf::from("notes.txt"),
        };
        assert_eq!(missing.to_string(), "Source path not found: notes.txt");

        let close = ArchiveError::Close {
            stage: CloseStage::Compression,
            source: io::Error::other("disk full"),
        };
        assert_eq!(close.to_string(), "Failed to close the gzip stream: disk full");

        let api = SlugError::Api {
            service: "GitHub",
            status: 422,
            body: "already_exists".into(),
        };
        assert_eq!(api.to_string(), "GitHub API returned status 422:\nalready_exists");
    }

    #[test]
    fn test_from_io_classifies_by_kind() {
        let err = ArchiveError::from_io("a", "stat", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, ArchiveError::NotFound { .. }));

        let err = ArchiveError::from_io("a", "open", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, ArchiveError::Permission { op: "open", .. }));

        let err = ArchiveError::from_io("a", "read", io::Error::other("boom"));
        assert!(matches!(err, ArchiveError::Io { op: "read", .. }));
    }
}
