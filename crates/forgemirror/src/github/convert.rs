//! Conversion from GitHub API types to forge-agnostic types.

use crate::platform::{RepoOrigin, RepoRef, Visibility};

use super::types::GitHubRepo;

/// Convert a GitHub repository into a [`RepoRef`].
pub fn to_repo_ref(repo: GitHubRepo, origin: RepoOrigin) -> RepoRef {
    let visibility = match repo.visibility.as_deref() {
        Some(v) => Visibility::from_api(v),
        None if repo.private => Visibility::Private,
        None => Visibility::Public,
    };

    RepoRef {
        owner: repo.owner.login,
        name: repo.name,
        source_id: repo.id,
        visibility,
        clone_url: repo.clone_url,
        is_fork: repo.fork,
        origin,
    }
}
