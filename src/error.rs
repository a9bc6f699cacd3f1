//! Error types for the edition-bundler library.
//!
//! Every failure is fatal to the job that raised it: there is no local retry
//! and no partial result. [`BundleError`] carries enough context for an
//! operator to triage a failed job (the offending path, or the verbatim
//! output of an external stage), and [`BundleError::kind`] gives callers a
//! coarse classification to branch on without matching every variant.
//!
//! A failed workspace removal is reported as [`BundleError::Cleanup`] in the
//! logs only. It never replaces an error that was already in flight.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edition-bundler library.
#[derive(Debug, Error)]
pub enum BundleError {
    // ── Staging ───────────────────────────────────────────────────────────
    /// The workspace skeleton could not be created or the input document
    /// (or a stage script) could not be moved into it.
    #[error("Workspace setup failed at '{path}': {source}")]
    StagingSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── External stages ───────────────────────────────────────────────────
    /// A stage program exited non-zero or could not be launched.
    ///
    /// `exit_code` is `-1` when no exit code is available (launch failure or
    /// termination by signal). `output` is the verbatim combined output.
    #[error("Stage {stage} ({name}) failed with exit code {exit_code}\n{output}")]
    ExternalStage {
        stage: usize,
        name: String,
        exit_code: i32,
        output: String,
    },

    // ── Assembly ──────────────────────────────────────────────────────────
    /// An expected copy source does not exist, or a required bundle path
    /// ended up empty. Most often this means the second stage did not
    /// produce its output.
    #[error("Bundle assembly failed: missing or empty '{missing}'")]
    Assembly { missing: PathBuf },

    /// A copy into the bundle failed for a reason other than a missing source.
    #[error("Failed to copy '{from}' to '{to}': {source}")]
    AssemblyCopy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The menu data file could not be patched.
    #[error("Cannot patch '{path}': {detail}")]
    Patch { path: PathBuf, detail: String },

    // ── Archive ───────────────────────────────────────────────────────────
    /// Compression failed or the publish location is not writable.
    #[error("Failed to publish archive '{path}': {detail}")]
    Archive { path: PathBuf, detail: String },

    // ── Cleanup ───────────────────────────────────────────────────────────
    /// The workspace tree could not be removed.
    #[error("Failed to remove workspace '{path}': {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure classification reported to the caller of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    StagingSetup,
    ExternalStage,
    Assembly,
    Patch,
    Archive,
    Cleanup,
    Config,
    Internal,
}

impl BundleError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BundleError::StagingSetup { .. } => ErrorKind::StagingSetup,
            BundleError::ExternalStage { .. } => ErrorKind::ExternalStage,
            BundleError::Assembly { .. } | BundleError::AssemblyCopy { .. } => ErrorKind::Assembly,
            BundleError::Patch { .. } => ErrorKind::Patch,
            BundleError::Archive { .. } => ErrorKind::Archive,
            BundleError::Cleanup { .. } => ErrorKind::Cleanup,
            BundleError::InvalidConfig(_) => ErrorKind::Config,
            BundleError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Captured external-stage output, if this error carries any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            BundleError::ExternalStage { output, .. } => Some(output),
            _ => None,
        }
    }

    pub(crate) fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::StagingSetup {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        BundleError::Archive {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}
