//! Mirror reconciliation: make sure every source repository has a
//! destination project that pulls from it.
//!
//! Per repository the reconciler walks
//! `lookup -> (create) -> configure pull mirror -> (transfer fallback)` and
//! records each step as a [`MirrorResult`]. A failed repository never stops
//! the pass; [`MirrorReport::has_failures`] drives the exit status.

use serde::Serialize;

use crate::destination::DestinationCatalog;
use crate::error::{MirrorError, Result};
use crate::identity::{IdentityMapper, RepoKey, is_skipped, key_for_repo, mirror_description};
use crate::platform::{
    CreateProject, DestinationForge, DestinationGroup, DestinationProject, PlatformError, RepoRef,
    SourceForge, Visibility, strip_credentials,
};
use crate::progress::{MirrorProgress, ProgressCallback, emit};
use crate::source::{list_source_repos, normalize_accounts};
use crate::transfer::MirrorTransfer;

/// Options for a mirror run.
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Source accounts whose public repositories are mirrored. The first one
    /// owns flat destination paths without a recognizable description.
    pub accounts: Vec<String>,
    /// Destination group id.
    pub group_id: u64,
    /// Run the clone/push transfer when pull mirroring cannot be configured.
    pub fallback: bool,
}

impl MirrorOptions {
    pub fn new(accounts: Vec<String>, group_id: u64) -> Self {
        Self {
            accounts,
            group_id,
            fallback: true,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }
}

/// One step of reconciling a repository.
#[derive(Debug)]
pub enum MirrorResult {
    /// Destination project created.
    Created { project_id: u64 },
    /// Destination project was already there (or appeared concurrently).
    AlreadyExists { project_id: u64 },
    /// Pull mirror in place. `changed` is false when it already pointed at
    /// the source and no call was made.
    MirrorConfigured { changed: bool },
    /// Pull mirror unavailable; contents pushed once instead.
    FallbackUsed { reason: String },
    /// The repository could not be reconciled this run.
    Failed(MirrorError),
}

/// Everything that happened to one repository.
#[derive(Debug)]
pub struct MirrorOutcome {
    pub key: RepoKey,
    pub project_id: Option<u64>,
    pub steps: Vec<MirrorResult>,
}

impl MirrorOutcome {
    fn new(key: RepoKey) -> Self {
        Self {
            key,
            project_id: None,
            steps: Vec::new(),
        }
    }

    fn failed(mut self, err: MirrorError) -> Self {
        self.steps.push(MirrorResult::Failed(err));
        self
    }

    pub fn is_failed(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s, MirrorResult::Failed(_)))
    }

    pub fn was_created(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s, MirrorResult::Created { .. }))
    }

    pub fn used_fallback(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s, MirrorResult::FallbackUsed { .. }))
    }

    /// Whether a pull mirror configuration call was made and accepted.
    pub fn mirror_changed(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s, MirrorResult::MirrorConfigured { changed: true }))
    }

    pub fn error(&self) -> Option<&MirrorError> {
        self.steps.iter().find_map(|s| match s {
            MirrorResult::Failed(e) => Some(e),
            _ => None,
        })
    }

    /// Final state label used in logs and reports.
    pub fn status(&self) -> OutcomeStatus {
        if self.is_failed() {
            OutcomeStatus::Failed
        } else if self.used_fallback() {
            OutcomeStatus::FallbackUsed
        } else if self.was_created() {
            OutcomeStatus::Created
        } else if self.mirror_changed() {
            OutcomeStatus::MirrorConfigured
        } else {
            OutcomeStatus::AlreadyExists
        }
    }
}

/// Final state of one repository in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Created,
    AlreadyExists,
    MirrorConfigured,
    FallbackUsed,
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
            Self::MirrorConfigured => "mirror_configured",
            Self::FallbackUsed => "fallback_used",
            Self::Failed => "failed",
        }
    }
}

/// Result of a mirror run.
#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Repositories after deduplication, skipped ones included.
    pub source_total: usize,
    pub outcomes: Vec<MirrorOutcome>,
    pub skipped: Vec<RepoKey>,
    /// Repositories not attempted because of a shutdown request.
    pub not_attempted: usize,
}

impl MirrorReport {
    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status() == status).count()
    }

    pub fn created(&self) -> usize {
        self.count(OutcomeStatus::Created)
    }

    pub fn already_existing(&self) -> usize {
        self.count(OutcomeStatus::AlreadyExists)
    }

    pub fn configured(&self) -> usize {
        self.count(OutcomeStatus::MirrorConfigured)
    }

    pub fn fallback(&self) -> usize {
        self.count(OutcomeStatus::FallbackUsed)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(MirrorOutcome::is_failed)
    }

    pub fn interrupted(&self) -> bool {
        self.not_attempted > 0
    }
}

/// Compare upstream URLs ignoring credentials, trailing slash and `.git`.
pub fn same_upstream(a: &str, b: &str) -> bool {
    fn normalize(raw: &str) -> String {
        let stripped = strip_credentials(raw);
        let trimmed = stripped.trim_end_matches('/');
        trimmed.strip_suffix(".git").unwrap_or(trimmed).to_string()
    }
    normalize(a) == normalize(b)
}

/// Reconciles single repositories against one destination group.
pub struct Reconciler<'a> {
    source: &'a dyn SourceForge,
    destination: &'a dyn DestinationForge,
    transfer: Option<&'a dyn MirrorTransfer>,
    mapper: &'a IdentityMapper,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        source: &'a dyn SourceForge,
        destination: &'a dyn DestinationForge,
        mapper: &'a IdentityMapper,
    ) -> Self {
        Self {
            source,
            destination,
            transfer: None,
            mapper,
            on_progress: None,
        }
    }

    /// Enable the clone/push fallback.
    #[must_use]
    pub fn with_transfer(mut self, transfer: &'a dyn MirrorTransfer) -> Self {
        self.transfer = Some(transfer);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    /// Reconcile one repository. `catalog` is updated with created projects.
    pub async fn reconcile(
        &self,
        repo: &RepoRef,
        catalog: &mut DestinationCatalog,
    ) -> MirrorOutcome {
        let key = key_for_repo(repo);
        let mut outcome = MirrorOutcome::new(key.clone());

        let project = match self.ensure_project(repo, &key, catalog, &mut outcome).await {
            Ok(project) => project,
            Err(err) => return self.fail(outcome, err),
        };
        outcome.project_id = Some(project.id);

        if let Some(import_url) = project.import_url.as_deref()
            && project.pull_mirror_configured
            && same_upstream(import_url, &repo.clone_url)
        {
            outcome
                .steps
                .push(MirrorResult::MirrorConfigured { changed: false });
            emit(
                self.on_progress,
                MirrorProgress::MirrorConfigured {
                    repo: key.to_string(),
                    project_id: project.id,
                    changed: false,
                },
            );
            return outcome;
        }

        let upstream = match self.source.authenticated_url(&repo.clone_url) {
            Ok(url) => url,
            Err(e) => {
                let err = MirrorError::remote("configure_pull_mirror", &key, &e);
                return self.fail(outcome, err);
            }
        };

        match self
            .destination
            .configure_pull_mirror(project.id, &upstream)
            .await
        {
            Ok(()) => {
                outcome
                    .steps
                    .push(MirrorResult::MirrorConfigured { changed: true });
                emit(
                    self.on_progress,
                    MirrorProgress::MirrorConfigured {
                        repo: key.to_string(),
                        project_id: project.id,
                        changed: true,
                    },
                );
                outcome
            }
            Err(mirror_err) => self.fallback(outcome, &project, &upstream, mirror_err).await,
        }
    }

    /// Find or create the destination project for `key`.
    async fn ensure_project(
        &self,
        repo: &RepoRef,
        key: &RepoKey,
        catalog: &mut DestinationCatalog,
        outcome: &mut MirrorOutcome,
    ) -> Result<DestinationProject> {
        if let Some(project) = catalog.get(key) {
            return Ok(self.existing(outcome, project.clone()));
        }

        let path = key.destination_path();
        if let Some((existing, _)) = catalog.by_path(path) {
            return Err(MirrorError::PathConflict {
                key: key.to_string(),
                existing: existing.to_string(),
            });
        }

        let group = catalog.group().clone();
        let request = CreateProject {
            name: repo.name.clone(),
            path: path.to_string(),
            visibility: Visibility::Private,
            description: mirror_description(&repo.clone_url),
        };

        match self.destination.create_project(&group, &request).await {
            Ok(project) => {
                outcome.steps.push(MirrorResult::Created {
                    project_id: project.id,
                });
                tracing::debug!(
                    repo = %key,
                    project_id = project.id,
                    "Created destination project"
                );
                emit(
                    self.on_progress,
                    MirrorProgress::ProjectCreated {
                        repo: key.to_string(),
                        project_id: project.id,
                    },
                );
                catalog.insert(key.clone(), project.clone());
                Ok(project)
            }
            Err(e) if e.is_already_exists() => {
                let project = self.reread(&group, key, path).await?;
                let found_key = self.mapper.key_for_project(&project);
                if &found_key != key {
                    return Err(MirrorError::PathConflict {
                        key: key.to_string(),
                        existing: found_key.to_string(),
                    });
                }
                catalog.insert(key.clone(), project.clone());
                Ok(self.existing(outcome, project))
            }
            Err(e) => Err(MirrorError::remote("create_project", key, &e)),
        }
    }

    /// Re-read a project whose create was rejected as taken.
    async fn reread(
        &self,
        group: &DestinationGroup,
        key: &RepoKey,
        path: &str,
    ) -> Result<DestinationProject> {
        match self.destination.find_project(group, path).await {
            Ok(Some(project)) => Ok(project),
            Ok(None) => Err(MirrorError::remote(
                "find_project",
                key,
                &PlatformError::not_found(format!("{}/{path}", group.full_path)),
            )),
            Err(e) => Err(MirrorError::remote("find_project", key, &e)),
        }
    }

    fn existing(
        &self,
        outcome: &mut MirrorOutcome,
        project: DestinationProject,
    ) -> DestinationProject {
        outcome.steps.push(MirrorResult::AlreadyExists {
            project_id: project.id,
        });
        emit(
            self.on_progress,
            MirrorProgress::ProjectExists {
                repo: outcome.key.to_string(),
                project_id: project.id,
            },
        );
        project
    }

    async fn fallback(
        &self,
        outcome: MirrorOutcome,
        project: &DestinationProject,
        upstream: &str,
        mirror_err: PlatformError,
    ) -> MirrorOutcome {
        let key = outcome.key.clone();
        let Some(transfer) = self.transfer else {
            let err = MirrorError::remote("configure_pull_mirror", &key, &mirror_err);
            return self.fail(outcome, err);
        };

        let reason = mirror_err.to_string();
        tracing::debug!(repo = %key, reason = %reason, "Pull mirror unavailable, transferring");

        let destination_url = match self
            .destination
            .authenticated_url(&project.http_url_to_repo)
        {
            Ok(url) => url,
            Err(e) => {
                return self.fail(
                    outcome,
                    MirrorError::TransferFallbackFailed {
                        key: key.to_string(),
                        message: e.to_string(),
                    },
                );
            }
        };

        match transfer.transfer(upstream, &destination_url).await {
            Ok(()) => {
                emit(
                    self.on_progress,
                    MirrorProgress::FallbackUsed {
                        repo: key.to_string(),
                        project_id: project.id,
                        reason: reason.clone(),
                    },
                );
                let mut outcome = outcome;
                outcome.steps.push(MirrorResult::FallbackUsed { reason });
                outcome
            }
            Err(e) => self.fail(
                outcome,
                MirrorError::TransferFallbackFailed {
                    key: key.to_string(),
                    message: format!("{e} (pull mirror: {reason})"),
                },
            ),
        }
    }

    fn fail(&self, outcome: MirrorOutcome, err: MirrorError) -> MirrorOutcome {
        emit(
            self.on_progress,
            MirrorProgress::MirrorFailed {
                repo: outcome.key.to_string(),
                error: err.to_string(),
            },
        );
        outcome.failed(err)
    }
}

/// Run a full mirror pass.
///
/// Listing failures abort with [`MirrorError::UpstreamUnavailable`]; every
/// other failure is isolated to its repository. `should_stop` is polled
/// before each repository.
pub async fn run_mirror(
    source: &dyn SourceForge,
    destination: &dyn DestinationForge,
    transfer: Option<&dyn MirrorTransfer>,
    options: &MirrorOptions,
    should_stop: &(dyn Fn() -> bool + Send + Sync),
    on_progress: Option<&ProgressCallback>,
) -> Result<MirrorReport> {
    let accounts = normalize_accounts(&options.accounts);
    let Some(primary) = accounts.first() else {
        return Err(MirrorError::Config(
            "at least one source account is required".to_string(),
        ));
    };
    let mapper = IdentityMapper::new(primary.clone());

    let group = destination
        .resolve_group(options.group_id)
        .await
        .map_err(|e| MirrorError::upstream("destination group", &e))?;

    let repos = list_source_repos(source, &accounts, on_progress).await?;
    let mut catalog =
        DestinationCatalog::load(destination, &group, &mapper, on_progress).await?;

    let mut reconciler =
        Reconciler::new(source, destination, &mapper).with_progress(on_progress);
    if options.fallback
        && let Some(transfer) = transfer
    {
        reconciler = reconciler.with_transfer(transfer);
    }

    let mut report = MirrorReport {
        source_total: repos.len(),
        ..MirrorReport::default()
    };

    for (index, repo) in repos.iter().enumerate() {
        if should_stop() {
            report.not_attempted = repos.len() - index;
            emit(
                on_progress,
                MirrorProgress::Interrupted {
                    remaining: report.not_attempted,
                },
            );
            break;
        }

        let key = key_for_repo(repo);
        if is_skipped(&key) {
            emit(
                on_progress,
                MirrorProgress::RepoSkipped {
                    repo: key.to_string(),
                },
            );
            report.skipped.push(key);
            continue;
        }

        let outcome = reconciler.reconcile(repo, &mut catalog).await;
        emit(
            on_progress,
            MirrorProgress::RepoReconciled {
                repo: outcome.key.to_string(),
                project_id: outcome.project_id,
                status: outcome.status().as_str(),
                error: outcome.error().map(ToString::to_string),
            },
        );
        report.outcomes.push(outcome);
    }

    tracing::info!(
        created = report.created(),
        existing = report.already_existing(),
        configured = report.configured(),
        fallback = report.fallback(),
        failed = report.failed(),
        skipped = report.skipped.len(),
        "Mirror run finished"
    );
    Ok(report)
}
