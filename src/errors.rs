//! Typed error definitions for dirtree.
//! One variant per failure kind the orchestrators distinguish, each carrying the offending path.

use std::path::PathBuf;
use thiserror::Error;

use crate::native::{NativeCode, NativeError, hint};

#[derive(Debug, Error)]
pub enum DirTreeError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Source and destination resolve to the same path: {0}")]
    SameSourceAndDestination(PathBuf),

    #[error("Destination {dst_path} lies inside source {src_path}")]
    DestinationInsideSource { src_path: PathBuf, dst_path: PathBuf },

    #[error("Source {src_path} lies inside destination {dst_path}")]
    SourceInsideDestination { src_path: PathBuf, dst_path: PathBuf },

    #[error("{src_path} and {dst_path} are on different volumes and copying is not allowed")]
    NotSameDevice { src_path: PathBuf, dst_path: PathBuf },

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(PathBuf),

    #[error("Directory {path} still not removable after {attempts} attempts: {code}")]
    RetryExhausted {
        path: PathBuf,
        attempts: u32,
        code: NativeCode,
    },

    #[error("Read-only entry: {0}")]
    ReadOnly(PathBuf),

    #[error("Access denied: {0}")]
    AccessDenied(PathBuf),

    #[error("Sharing violation (in use by another process): {0}")]
    SharingViolation(PathBuf),

    #[error("Failed to list {path}: {code}")]
    ListingFailed { path: PathBuf, code: NativeCode },

    #[error("{op} '{path}' failed: {error}{}", hint_suffix(.error.code))]
    Native {
        path: PathBuf,
        op: &'static str,
        error: NativeError,
    },

    #[error("Invalid search pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

fn hint_suffix(code: NativeCode) -> String {
    hint(code).map(|h| format!("; {h}")).unwrap_or_default()
}

impl DirTreeError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            DirTreeError::Configuration(_) => 10,
            DirTreeError::SameSourceAndDestination(_) => 20,
            DirTreeError::DestinationInsideSource { .. } => 21,
            DirTreeError::NotSameDevice { .. } => 22,
            DirTreeError::NotADirectory(_) => 23,
            DirTreeError::SourceInsideDestination { .. } => 24,
            DirTreeError::NotFound(_) => 30,
            DirTreeError::AlreadyExists(_) => 31,
            DirTreeError::DirectoryNotEmpty(_) => 40,
            DirTreeError::RetryExhausted { .. } => 41,
            DirTreeError::ReadOnly(_) => 50,
            DirTreeError::AccessDenied(_) => 51,
            DirTreeError::SharingViolation(_) => 60,
            DirTreeError::ListingFailed { .. } => 70,
            DirTreeError::Native { .. } => 80,
            DirTreeError::InvalidPattern { .. } => 90,
        }
    }

    /// Short machine-readable name, used as the `kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DirTreeError::Configuration(_) => "configuration",
            DirTreeError::SameSourceAndDestination(_) => "same_source_and_destination",
            DirTreeError::DestinationInsideSource { .. } => "destination_inside_source",
            DirTreeError::SourceInsideDestination { .. } => "source_inside_destination",
            DirTreeError::NotSameDevice { .. } => "not_same_device",
            DirTreeError::NotADirectory(_) => "not_a_directory",
            DirTreeError::NotFound(_) => "not_found",
            DirTreeError::AlreadyExists(_) => "already_exists",
            DirTreeError::DirectoryNotEmpty(_) => "directory_not_empty",
            DirTreeError::RetryExhausted { .. } => "retry_exhausted",
            DirTreeError::ReadOnly(_) => "read_only",
            DirTreeError::AccessDenied(_) => "access_denied",
            DirTreeError::SharingViolation(_) => "sharing_violation",
            DirTreeError::ListingFailed { .. } => "listing_failed",
            DirTreeError::Native { .. } => "native",
            DirTreeError::InvalidPattern { .. } => "invalid_pattern",
        }
    }

    /// Translate a native failure on `path` into the matching variant.
    ///
    /// Codes without a dedicated variant keep the operation name and raw error.
    pub fn from_native(path: impl Into<PathBuf>, op: &'static str, error: NativeError) -> Self {
        let path = path.into();
        match error.code {
            NativeCode::FileNotFound | NativeCode::PathNotFound => DirTreeError::NotFound(path),
            NativeCode::FileExists | NativeCode::AlreadyExists => DirTreeError::AlreadyExists(path),
            NativeCode::DirNotEmpty => DirTreeError::DirectoryNotEmpty(path),
            NativeCode::NotADirectory => DirTreeError::NotADirectory(path),
            NativeCode::AccessDenied => DirTreeError::AccessDenied(path),
            NativeCode::SharingViolation => DirTreeError::SharingViolation(path),
            _ => DirTreeError::Native { path, op, error },
        }
    }
}

pub type Result<T> = std::result::Result<T, DirTreeError>;
