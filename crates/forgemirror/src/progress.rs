//! Progress events for mirror and prune runs.
//!
//! The library never prints. Every listing page, per-repo outcome and prune
//! decision is emitted as a [`MirrorProgress`] event; the CLI turns these into
//! structured log lines.

/// Progress events emitted during mirror and prune runs.
///
/// Repository keys are carried pre-rendered as `owner/name`.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum MirrorProgress {
    /// Starting to list one source or destination namespace.
    FetchingRepos {
        /// `user` for the credential's own listing, the account or group otherwise.
        namespace: String,
    },

    /// Fetched one page of a listing.
    FetchedPage {
        namespace: String,
        /// Page number (1-indexed).
        page: u32,
        /// Entries on this page.
        count: usize,
        /// Running total for this namespace.
        total_so_far: usize,
    },

    /// Finished one namespace listing.
    FetchComplete { namespace: String, total: usize },

    /// Source listings merged.
    SourceListed {
        /// Unique repositories after deduplication.
        total: usize,
        /// Entries dropped because an earlier listing already had the key.
        duplicates: usize,
    },

    /// Destination group listed.
    CatalogListed { group: String, total: usize },

    /// Repository excluded by the dot-prefix skip rule.
    RepoSkipped { repo: String },

    /// Destination project created.
    ProjectCreated { repo: String, project_id: u64 },

    /// Destination project already present.
    ProjectExists { repo: String, project_id: u64 },

    /// Pull mirror configured (or already configured when `changed` is false).
    MirrorConfigured {
        repo: String,
        project_id: u64,
        changed: bool,
    },

    /// Pull mirror could not be configured; the one-shot transfer ran instead.
    FallbackUsed {
        repo: String,
        project_id: u64,
        reason: String,
    },

    /// Reconciliation of one repository failed.
    MirrorFailed { repo: String, error: String },

    /// Final state of one repository after a mirror pass.
    RepoReconciled {
        repo: String,
        project_id: Option<u64>,
        /// One of the [`OutcomeStatus`](crate::mirror::OutcomeStatus) labels.
        status: &'static str,
        error: Option<String>,
    },

    /// Retrying a transient failure.
    Backoff {
        /// What is being retried (request label).
        operation: String,
        retry_after_ms: u64,
        attempt: u32,
    },

    /// Ledger entry removed because the repository is back in the source listing.
    PruneHealed { repo: String },

    /// Repository first seen missing; ledger entry created.
    PruneMarked { repo: String, project_id: u64 },

    /// Missing repository still inside the grace period.
    PruneAging {
        repo: String,
        project_id: u64,
        age_days: i64,
    },

    /// Missing repository past the grace period but protected.
    PruneProtected {
        repo: String,
        project_id: u64,
        age_days: i64,
    },

    /// Deletion candidate reported in simulation mode.
    PruneCandidate { repo: String, project_id: u64 },

    /// Repository reappeared at the pre-delete check.
    PruneReappeared { repo: String, project_id: u64 },

    /// Destination project deleted.
    PruneDeleted { repo: String, project_id: u64 },

    /// Destination delete failed; the ledger entry is kept for the next run.
    PruneDeleteFailed {
        repo: String,
        project_id: u64,
        error: String,
    },

    /// Persisted ledger could not be read and was replaced by an empty one.
    LedgerCorrupt { path: String, error: String },

    /// Run stopped early on a shutdown request.
    Interrupted { remaining: usize },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(MirrorProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: MirrorProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
