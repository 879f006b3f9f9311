//! Canonical identity shared by source repositories and destination projects.
//!
//! GitHub identifies a repository by `owner/name`; GitLab identifies a project
//! by a numeric id and a path inside the destination group. Both are mapped
//! onto [`RepoKey`] so the two listings can be compared as sets.
//!
//! Two independent filters hang off the key:
//! - [`is_skipped`]: dot-prefixed names (`.github`, `.dotfiles`) are never
//!   mirrored and never considered for pruning.
//! - [`ProtectedSet`]: names exempt from deletion, however long they have
//!   been missing.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platform::{DestinationProject, RepoRef};

/// Canonical `(owner, name)` key. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoKey {
    pub owner: String,
    pub name: String,
}

impl RepoKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`. The name is the last path segment.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.rsplit_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(owner, name))
    }

    /// Project path used inside the destination group.
    ///
    /// Mirrors are created flat (`group/name`).
    pub fn destination_path(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Key for a source repository.
pub fn key_for_repo(repo: &RepoRef) -> RepoKey {
    RepoKey::new(&repo.owner, &repo.name)
}

/// Whether a key is excluded from mirroring and pruning altogether.
pub fn is_skipped(key: &RepoKey) -> bool {
    key.name.starts_with('.')
}

/// Maps destination projects back onto source keys.
#[derive(Debug, Clone)]
pub struct IdentityMapper {
    default_owner: String,
}

impl IdentityMapper {
    /// `default_owner` is used for flat project paths whose description does
    /// not name the upstream; it is the primary configured source account.
    pub fn new(default_owner: impl Into<String>) -> Self {
        Self {
            default_owner: default_owner.into(),
        }
    }

    pub fn default_owner(&self) -> &str {
        &self.default_owner
    }

    /// Key for a destination project.
    ///
    /// `owner/name` paths (subgroup per owner) map directly. Flat `name`
    /// paths recover the owner from the `Mirror of <url>` description written
    /// at creation time.
    pub fn key_for_project(&self, project: &DestinationProject) -> RepoKey {
        if let Some(key) = RepoKey::parse(&project.path) {
            return key;
        }

        let owner = project
            .description
            .as_deref()
            .and_then(|d| upstream_owner(d, &project.path))
            .unwrap_or_else(|| self.default_owner.clone());

        RepoKey::new(owner, &project.path)
    }
}

const MIRROR_DESCRIPTION_PREFIX: &str = "Mirror of ";

/// Description stored on created projects.
pub fn mirror_description(upstream_url: &str) -> String {
    format!("{MIRROR_DESCRIPTION_PREFIX}{upstream_url}")
}

/// Owner segment of a `Mirror of https://host/owner/name(.git)` description,
/// if the name segment matches `name`.
fn upstream_owner(description: &str, name: &str) -> Option<String> {
    let raw = description.trim().strip_prefix(MIRROR_DESCRIPTION_PREFIX)?;
    let url = url::Url::parse(raw.trim()).ok()?;
    let mut segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let repo = segments.pop()?;
    let owner = segments.pop()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    (repo == name).then(|| owner.to_string())
}

/// Names exempt from pruning.
///
/// An entry matches either a bare project name (`mirror-scripts`) or a full
/// `owner/name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedSet {
    names: BTreeSet<String>,
}

impl ProtectedSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .map(|s: String| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, key: &RepoKey) -> bool {
        self.names.contains(&key.name) || self.names.contains(&key.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
