//! Error types for vault storage, analysis, and the collaborator seam.
//!
//! Errors are classified by where they stop:
//! - `NotFound` is expected and handled (upsert creates the document)
//! - `Storage` propagates to the caller; retry policy lives there
//! - `Parse` is caught per-document inside the analyzer and logged
//! - Collaborator failures are absorbed by node creation with an
//!   empty-field fallback

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Category;

/// Errors from vault document operations.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("document not found: {category}/{id}")]
    NotFound { category: Category, id: String },

    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

impl VaultError {
    /// Returns true if this error is an expected missing-document case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::NotFound { .. })
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VaultError::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the external AI context collaborator.
///
/// None of these are fatal to document processing: node creation falls
/// back to empty descriptive fields and logs a warning.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("context lookup timed out after {0}s")]
    Timeout(u64),

    #[error("context lookup failed: {0}")]
    Failed(String),

    #[error("malformed collaborator response: {0}")]
    Malformed(String),
}
