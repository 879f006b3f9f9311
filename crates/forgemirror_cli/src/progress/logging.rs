use forgemirror::MirrorProgress;

/// Logging reporter using tracing for structured output.
///
/// Every repository ends with one line carrying an `outcome` field at info
/// level or above, so a run can be audited with a plain grep over the job
/// log. Intermediate steps are logged at debug with a `step` field.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: MirrorProgress) {
        match event {
            MirrorProgress::FetchingRepos { namespace } => {
                tracing::info!(namespace = %namespace, "Fetching repositories");
            }

            MirrorProgress::FetchedPage {
                namespace,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(namespace = %namespace, page, count, total_so_far, "Fetched page");
            }

            MirrorProgress::FetchComplete { namespace, total } => {
                tracing::info!(namespace = %namespace, total, "Fetch complete");
            }

            MirrorProgress::SourceListed { total, duplicates } => {
                tracing::info!(total, duplicates, "Source repositories listed");
            }

            MirrorProgress::CatalogListed { group, total } => {
                tracing::info!(group = %group, total, "Destination projects listed");
            }

            MirrorProgress::RepoSkipped { repo } => {
                tracing::info!(outcome = "skipped", repo = %repo, "Skipped");
            }

            MirrorProgress::ProjectCreated { repo, project_id } => {
                tracing::debug!(step = "created", repo = %repo, project_id, "Created project");
            }

            MirrorProgress::ProjectExists { repo, project_id } => {
                tracing::debug!(step = "exists", repo = %repo, project_id, "Project exists");
            }

            MirrorProgress::MirrorConfigured {
                repo,
                project_id,
                changed,
            } => {
                tracing::debug!(
                    step = "mirror_configured",
                    repo = %repo,
                    project_id,
                    changed,
                    "Pull mirror in place"
                );
            }

            MirrorProgress::FallbackUsed {
                repo,
                project_id,
                reason,
            } => {
                tracing::debug!(
                    step = "fallback",
                    repo = %repo,
                    project_id,
                    reason = %reason,
                    "Pushed mirror once instead"
                );
            }

            MirrorProgress::MirrorFailed { repo, error } => {
                tracing::debug!(step = "failed", repo = %repo, error = %error, "Step failed");
            }

            MirrorProgress::RepoReconciled {
                repo,
                project_id,
                status,
                error,
            } => match (status, error) {
                (_, Some(error)) => {
                    tracing::error!(
                        outcome = status,
                        repo = %repo,
                        project_id,
                        error = %error,
                        "Mirror failed"
                    );
                }
                ("fallback_used", None) => {
                    tracing::warn!(
                        outcome = status,
                        repo = %repo,
                        project_id,
                        "Pull mirror unavailable, pushed contents once"
                    );
                }
                (_, None) => {
                    tracing::info!(outcome = status, repo = %repo, project_id, "Reconciled");
                }
            },

            MirrorProgress::Backoff {
                operation,
                retry_after_ms,
                attempt,
            } => {
                tracing::warn!(
                    operation = %operation,
                    retry_after_ms,
                    attempt,
                    "Transient failure, backing off"
                );
            }

            MirrorProgress::PruneHealed { repo } => {
                tracing::info!(
                    outcome = "healed",
                    repo = %repo,
                    "Repository is back, clearing ledger entry"
                );
            }

            MirrorProgress::PruneMarked { repo, project_id } => {
                tracing::info!(
                    outcome = "marked",
                    repo = %repo,
                    project_id,
                    "Repository missing, grace period started"
                );
            }

            MirrorProgress::PruneAging {
                repo,
                project_id,
                age_days,
            } => {
                tracing::info!(
                    outcome = "aging",
                    repo = %repo,
                    project_id,
                    age_days,
                    "Repository missing, within grace period"
                );
            }

            MirrorProgress::PruneProtected {
                repo,
                project_id,
                age_days,
            } => {
                tracing::info!(
                    outcome = "protected",
                    repo = %repo,
                    project_id,
                    age_days,
                    "Protected, not deleting"
                );
            }

            MirrorProgress::PruneCandidate { repo, project_id } => {
                tracing::warn!(
                    outcome = "candidate",
                    repo = %repo,
                    project_id,
                    "Would delete (dry run)"
                );
            }

            MirrorProgress::PruneReappeared { repo, project_id } => {
                tracing::info!(
                    outcome = "reappeared",
                    repo = %repo,
                    project_id,
                    "Repository exists again, not deleting"
                );
            }

            MirrorProgress::PruneDeleted { repo, project_id } => {
                tracing::warn!(outcome = "deleted", repo = %repo, project_id, "Deleted project");
            }

            MirrorProgress::PruneDeleteFailed {
                repo,
                project_id,
                error,
            } => {
                tracing::error!(
                    outcome = "delete_failed",
                    repo = %repo,
                    project_id,
                    error = %error,
                    "Delete failed"
                );
            }

            MirrorProgress::LedgerCorrupt { path, error } => {
                tracing::error!(
                    path = %path,
                    error = %error,
                    "Prune ledger was corrupt and has been reset"
                );
            }

            MirrorProgress::Interrupted { remaining } => {
                tracing::warn!(remaining, "Interrupted, remaining repositories not attempted");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
