//! Grace-period pruning of destination projects whose source is gone.
//!
//! Every destination key goes through one transition per run:
//!
//! | State | Action |
//! |---|---|
//! | present in source | drop any ledger entry (healed) |
//! | missing, no entry | record `first_missing_at = now` |
//! | missing, younger than the grace period | nothing |
//! | missing, past grace, protected | nothing, indefinitely |
//! | missing, past grace, not protected | candidate: report (dry run) or re-check then delete |
//!
//! A grace period of zero makes a key a candidate the first time it is seen
//! missing.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::destination::DestinationCatalog;
use crate::error::{MirrorError, Result};
use crate::identity::{IdentityMapper, ProtectedSet, RepoKey, is_skipped, key_for_repo};
use crate::ledger::{Ledger, LedgerStore};
use crate::platform::{DestinationForge, DestinationProject, SourceForge};
use crate::progress::{MirrorProgress, ProgressCallback, emit};
use crate::source::{list_source_repos, normalize_accounts};

/// Default grace period in days.
pub const DEFAULT_GRACE_DAYS: u32 = 7;

/// Options for a prune run.
#[derive(Debug, Clone)]
pub struct PruneOptions {
    pub accounts: Vec<String>,
    pub group_id: u64,
    pub grace_days: u32,
    pub protected: ProtectedSet,
    /// Report candidates without deleting anything.
    pub dry_run: bool,
    /// Prune even when the source listing came back empty.
    pub allow_empty_source: bool,
}

impl PruneOptions {
    pub fn new(accounts: Vec<String>, group_id: u64) -> Self {
        Self {
            accounts,
            group_id,
            grace_days: DEFAULT_GRACE_DAYS,
            protected: ProtectedSet::default(),
            dry_run: true,
            allow_empty_source: false,
        }
    }

    pub fn grace_period(&self) -> Duration {
        Duration::days(i64::from(self.grace_days))
    }
}

/// What happened to one key.
#[derive(Debug)]
pub enum PruneDecision {
    /// Back in the source; ledger entry removed.
    Healed,
    /// First seen missing this run.
    Marked,
    /// Missing but inside the grace period.
    Aging { age_days: i64 },
    /// Past the grace period but protected.
    Protected { age_days: i64 },
    /// Would be deleted (dry run).
    Candidate,
    /// Reappeared at the pre-delete check; ledger entry removed.
    Reappeared,
    Deleted,
    /// Delete (or the pre-delete check) failed; the entry is kept.
    DeleteFailed(MirrorError),
}

impl PruneDecision {
    pub fn status(&self) -> PruneStatus {
        match self {
            Self::Healed => PruneStatus::Healed,
            Self::Marked => PruneStatus::Marked,
            Self::Aging { .. } => PruneStatus::Aging,
            Self::Protected { .. } => PruneStatus::Protected,
            Self::Candidate => PruneStatus::Candidate,
            Self::Reappeared => PruneStatus::Reappeared,
            Self::Deleted => PruneStatus::Deleted,
            Self::DeleteFailed(_) => PruneStatus::DeleteFailed,
        }
    }
}

/// Flat label for a [`PruneDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneStatus {
    Healed,
    Marked,
    Aging,
    Protected,
    Candidate,
    Reappeared,
    Deleted,
    DeleteFailed,
}

impl PruneStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healed => "healed",
            Self::Marked => "marked",
            Self::Aging => "aging",
            Self::Protected => "protected",
            Self::Candidate => "candidate",
            Self::Reappeared => "reappeared",
            Self::Deleted => "deleted",
            Self::DeleteFailed => "delete_failed",
        }
    }
}

#[derive(Debug)]
pub struct PruneItem {
    pub key: RepoKey,
    pub project_id: Option<u64>,
    pub decision: PruneDecision,
}

/// Result of a prune run.
#[derive(Debug, Default)]
pub struct PruneReport {
    pub dry_run: bool,
    pub items: Vec<PruneItem>,
    /// Ledger entries dropped because their project left the destination.
    pub dropped: Vec<RepoKey>,
    /// Set when the ledger could not be read and the run started empty.
    pub ledger_corrupt: Option<MirrorError>,
    /// Missing keys not evaluated because of a shutdown request.
    pub not_attempted: usize,
}

impl PruneReport {
    pub fn count(&self, status: PruneStatus) -> usize {
        self.items
            .iter()
            .filter(|i| i.decision.status() == status)
            .count()
    }

    pub fn keys(&self, status: PruneStatus) -> Vec<&RepoKey> {
        self.items
            .iter()
            .filter(|i| i.decision.status() == status)
            .map(|i| &i.key)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.count(PruneStatus::DeleteFailed) > 0
    }

    pub fn interrupted(&self) -> bool {
        self.not_attempted > 0
    }
}

/// Evaluates destination keys against the source and the ledger.
pub struct Pruner<'a> {
    source: &'a dyn SourceForge,
    destination: &'a dyn DestinationForge,
    options: &'a PruneOptions,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a> Pruner<'a> {
    pub fn new(
        source: &'a dyn SourceForge,
        destination: &'a dyn DestinationForge,
        options: &'a PruneOptions,
    ) -> Self {
        Self {
            source,
            destination,
            options,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    /// List both sides and apply one transition per key to `ledger`.
    pub async fn run(
        &self,
        ledger: &mut Ledger,
        now: DateTime<Utc>,
        should_stop: &(dyn Fn() -> bool + Send + Sync),
    ) -> Result<PruneReport> {
        let accounts = normalize_accounts(&self.options.accounts);
        let Some(primary) = accounts.first() else {
            return Err(MirrorError::Config(
                "at least one source account is required".to_string(),
            ));
        };
        let mapper = IdentityMapper::new(primary.clone());

        let group = self
            .destination
            .resolve_group(self.options.group_id)
            .await
            .map_err(|e| MirrorError::upstream("destination group", &e))?;
        let repos = list_source_repos(self.source, &accounts, self.on_progress).await?;
        let catalog =
            DestinationCatalog::load(self.destination, &group, &mapper, self.on_progress).await?;

        let present: HashSet<RepoKey> = repos.iter().map(key_for_repo).collect();
        if present.is_empty() && !catalog.is_empty() && !self.options.allow_empty_source {
            return Err(MirrorError::UpstreamUnavailable {
                stage: "source".to_string(),
                message: format!(
                    "source listing is empty but {} destination projects exist; refusing to prune",
                    catalog.len()
                ),
            });
        }

        self.evaluate(ledger, &present, &catalog, now, should_stop)
            .await
    }

    /// Apply the state machine. Separated from listing for tests.
    pub async fn evaluate(
        &self,
        ledger: &mut Ledger,
        present: &HashSet<RepoKey>,
        catalog: &DestinationCatalog,
        now: DateTime<Utc>,
        should_stop: &(dyn Fn() -> bool + Send + Sync),
    ) -> Result<PruneReport> {
        let mut report = PruneReport {
            dry_run: self.options.dry_run,
            ..PruneReport::default()
        };

        for entry in ledger.retain(|e| !present.contains(&e.key())) {
            let key = entry.key();
            emit(
                self.on_progress,
                MirrorProgress::PruneHealed {
                    repo: key.to_string(),
                },
            );
            report.items.push(PruneItem {
                project_id: catalog.get(&key).map(|p| p.id),
                key,
                decision: PruneDecision::Healed,
            });
        }

        for entry in ledger.retain(|e| catalog.get(&e.key()).is_some()) {
            tracing::debug!(repo = %entry.key(), "Dropping ledger entry for vanished project");
            report.dropped.push(entry.key());
        }

        let missing: Vec<(&RepoKey, &DestinationProject)> = catalog
            .iter()
            .filter(|(key, _)| !is_skipped(key) && !present.contains(*key))
            .collect();

        for (index, (key, project)) in missing.iter().enumerate() {
            if should_stop() {
                report.not_attempted = missing.len() - index;
                emit(
                    self.on_progress,
                    MirrorProgress::Interrupted {
                        remaining: report.not_attempted,
                    },
                );
                break;
            }

            let decision = self.decide(ledger, key, project, now).await;
            report.items.push(PruneItem {
                key: (*key).clone(),
                project_id: Some(project.id),
                decision,
            });
        }

        tracing::info!(
            dry_run = self.options.dry_run,
            deleted = report.count(PruneStatus::Deleted),
            candidates = report.count(PruneStatus::Candidate),
            protected = report.count(PruneStatus::Protected),
            aging = report.count(PruneStatus::Aging) + report.count(PruneStatus::Marked),
            healed = report.count(PruneStatus::Healed) + report.count(PruneStatus::Reappeared),
            failed = report.count(PruneStatus::DeleteFailed),
            "Prune run finished"
        );
        Ok(report)
    }

    async fn decide(
        &self,
        ledger: &mut Ledger,
        key: &RepoKey,
        project: &DestinationProject,
        now: DateTime<Utc>,
    ) -> PruneDecision {
        let repo = key.to_string();
        let project_id = project.id;
        let first_seen = ledger.get(key).is_none();
        let age = ledger.mark_missing(key, now).age(now);
        let age_days = age.num_days();

        if first_seen && self.options.grace_days > 0 {
            emit(self.on_progress, MirrorProgress::PruneMarked { repo, project_id });
            return PruneDecision::Marked;
        }

        if age < self.options.grace_period() {
            emit(
                self.on_progress,
                MirrorProgress::PruneAging {
                    repo,
                    project_id,
                    age_days,
                },
            );
            return PruneDecision::Aging { age_days };
        }

        if self.options.protected.contains(key) {
            emit(
                self.on_progress,
                MirrorProgress::PruneProtected {
                    repo,
                    project_id,
                    age_days,
                },
            );
            return PruneDecision::Protected { age_days };
        }

        if self.options.dry_run {
            emit(self.on_progress, MirrorProgress::PruneCandidate { repo, project_id });
            return PruneDecision::Candidate;
        }

        match self.source.repo_exists(&key.owner, &key.name).await {
            Ok(true) => {
                ledger.remove(key);
                emit(
                    self.on_progress,
                    MirrorProgress::PruneReappeared { repo, project_id },
                );
                return PruneDecision::Reappeared;
            }
            Ok(false) => {}
            Err(e) => {
                let err = MirrorError::remote("repo_exists", key, &e);
                emit(
                    self.on_progress,
                    MirrorProgress::PruneDeleteFailed {
                        repo,
                        project_id,
                        error: err.to_string(),
                    },
                );
                return PruneDecision::DeleteFailed(err);
            }
        }

        match self.destination.delete_project(project_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(repo = %key, project_id, "Project already gone");
            }
            Err(e) => {
                let err = MirrorError::remote("delete_project", key, &e);
                emit(
                    self.on_progress,
                    MirrorProgress::PruneDeleteFailed {
                        repo,
                        project_id,
                        error: err.to_string(),
                    },
                );
                return PruneDecision::DeleteFailed(err);
            }
        }

        ledger.remove(key);
        emit(self.on_progress, MirrorProgress::PruneDeleted { repo, project_id });
        PruneDecision::Deleted
    }
}

/// Load the ledger, run the pruner, save the ledger.
///
/// The ledger is saved even when the run was interrupted. Listing failures
/// abort before anything is written.
pub async fn run_prune(
    source: &dyn SourceForge,
    destination: &dyn DestinationForge,
    store: &LedgerStore,
    options: &PruneOptions,
    now: DateTime<Utc>,
    should_stop: &(dyn Fn() -> bool + Send + Sync),
    on_progress: Option<&ProgressCallback>,
) -> Result<PruneReport> {
    let loaded = store.load()?;
    if let Some(MirrorError::LedgerCorrupt { path, message }) = &loaded.corrupt {
        emit(
            on_progress,
            MirrorProgress::LedgerCorrupt {
                path: path.display().to_string(),
                error: message.clone(),
            },
        );
    }
    let mut ledger = loaded.ledger;

    let mut report = Pruner::new(source, destination, options)
        .with_progress(on_progress)
        .run(&mut ledger, now, should_stop)
        .await?;

    store.save(&mut ledger, now)?;
    report.ledger_corrupt = loaded.corrupt;
    Ok(report)
}
