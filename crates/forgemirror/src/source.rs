//! Source listing: the deduplicated union of every repository the mirror
//! should carry.

use std::collections::HashSet;

use crate::error::{MirrorError, Result};
use crate::identity::{RepoKey, key_for_repo};
use crate::platform::{RepoRef, SourceForge};
use crate::progress::{MirrorProgress, ProgressCallback, emit};

/// Trim account names and drop blanks, keeping order.
pub fn normalize_accounts(accounts: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    accounts
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .filter(|a| seen.insert(a.to_string()))
        .map(str::to_string)
        .collect()
}

/// Merge listings in priority order. The first listing that contains a key
/// wins. Returns the merged repositories and the number of dropped
/// duplicates.
pub fn dedup_repos<I>(listings: I) -> (Vec<RepoRef>, usize)
where
    I: IntoIterator<Item = Vec<RepoRef>>,
{
    let mut seen: HashSet<RepoKey> = HashSet::new();
    let mut merged = Vec::new();
    let mut duplicates = 0;

    for repo in listings.into_iter().flatten() {
        if seen.insert(key_for_repo(&repo)) {
            merged.push(repo);
        } else {
            duplicates += 1;
        }
    }

    (merged, duplicates)
}

/// List every repository the credential can see plus every public
/// repository of each account.
///
/// Any failing sub-listing fails the whole listing: a partial result must
/// never be mistaken for "these repositories are gone".
pub async fn list_source_repos<S>(
    forge: &S,
    accounts: &[String],
    on_progress: Option<&ProgressCallback>,
) -> Result<Vec<RepoRef>>
where
    S: SourceForge + ?Sized,
{
    let accounts = normalize_accounts(accounts);
    if accounts.is_empty() {
        return Err(MirrorError::Config(
            "at least one source account is required".to_string(),
        ));
    }

    let mut listings = Vec::with_capacity(accounts.len() + 1);
    listings.push(
        forge
            .list_own_repos(on_progress)
            .await
            .map_err(|e| MirrorError::upstream("source (user)", &e))?,
    );
    for account in &accounts {
        listings.push(
            forge
                .list_account_repos(account, on_progress)
                .await
                .map_err(|e| MirrorError::upstream(format!("source ({account})"), &e))?,
        );
    }

    let (repos, duplicates) = dedup_repos(listings);
    tracing::info!(total = repos.len(), duplicates, "Listed source repositories");
    emit(
        on_progress,
        MirrorProgress::SourceListed {
            total: repos.len(),
            duplicates,
        },
    );
    Ok(repos)
}
