//! Errors surfaced by the mirror and prune jobs.

use std::path::PathBuf;

use thiserror::Error;

use crate::platform::PlatformError;

/// Errors produced by the reconciler, the pruner and the ledger.
///
/// Listing failures abort a run; per-repository failures are isolated and
/// carried in the run report instead.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// A source or destination listing could not be completed.
    #[error("{stage} listing unavailable: {message}")]
    UpstreamUnavailable { stage: String, message: String },

    /// One create/configure/delete call failed after retries.
    #[error("{operation} failed for {key}: {message}")]
    RemoteOperationFailed {
        operation: String,
        key: String,
        message: String,
    },

    /// The persisted ledger could not be parsed.
    #[error("prune ledger {} is corrupt: {message}", path.display())]
    LedgerCorrupt { path: PathBuf, message: String },

    /// The clone/push fallback failed.
    #[error("transfer fallback failed for {key}: {message}")]
    TransferFallbackFailed { key: String, message: String },

    /// The destination path is held by a project mirrored from another source.
    #[error("destination path for {key} is taken by {existing}")]
    PathConflict { key: String, existing: String },

    /// Reading or writing the ledger failed.
    #[error("prune ledger I/O error on {}: {source}", path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid options.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MirrorError {
    pub fn upstream(stage: impl Into<String>, err: &PlatformError) -> Self {
        Self::UpstreamUnavailable {
            stage: stage.into(),
            message: err.to_string(),
        }
    }

    pub fn remote(operation: impl Into<String>, key: impl ToString, err: &PlatformError) -> Self {
        Self::RemoteOperationFailed {
            operation: operation.into(),
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    /// Short machine-friendly tag used in outcome log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::RemoteOperationFailed { .. } => "remote_operation_failed",
            Self::LedgerCorrupt { .. } => "ledger_corrupt",
            Self::TransferFallbackFailed { .. } => "transfer_fallback_failed",
            Self::PathConflict { .. } => "path_conflict",
            Self::Ledger { .. } => "ledger_io",
            Self::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
