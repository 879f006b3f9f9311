use async_trait::async_trait;
use serde::Serialize;

use crate::progress::ProgressCallback;

use super::errors::Result;

/// Repository or project visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
    Internal,
}

impl Visibility {
    /// Parse an API visibility string. Unknown values are treated as private.
    pub fn from_api(value: &str) -> Self {
        match value {
            "public" => Self::Public,
            "internal" => Self::Internal,
            _ => Self::Private,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::Internal => "internal",
        }
    }
}

/// Which source listing produced a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOrigin {
    /// The credential's own listing (owned, collaborator and private repos).
    Own,
    /// The public listing of a configured account.
    Account(String),
}

/// A repository on the source forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    /// Platform-specific numeric id. Opaque to the reconciler.
    pub source_id: u64,
    pub visibility: Visibility,
    /// Credential-free HTTPS clone URL.
    pub clone_url: String,
    pub is_fork: bool,
    pub origin: RepoOrigin,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// The destination group all mirrors live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationGroup {
    /// Numeric namespace id (used when creating projects).
    pub id: u64,
    /// Full namespace path (e.g. `me/mirrors`).
    pub full_path: String,
}

/// A project on the destination forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationProject {
    pub id: u64,
    /// Path relative to the destination group: `name` or `owner/name`.
    pub path: String,
    pub name: String,
    pub visibility: Visibility,
    pub pull_mirror_configured: bool,
    /// Upstream the project pulls from, as reported by the API (credentials
    /// are never echoed back).
    pub import_url: Option<String>,
    pub http_url_to_repo: String,
    pub description: Option<String>,
}

/// Parameters for creating a destination project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProject {
    pub name: String,
    pub path: String,
    pub visibility: Visibility,
    pub description: String,
}

/// The source-of-truth forge (GitHub).
#[async_trait]
pub trait SourceForge: Send + Sync {
    /// Every repository owned by or visible to the credential, all pages.
    async fn list_own_repos(&self, on_progress: Option<&ProgressCallback>)
    -> Result<Vec<RepoRef>>;

    /// Every public repository (forks included) of `account`, all pages.
    async fn list_account_repos(
        &self,
        account: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<RepoRef>>;

    /// Whether `owner/name` currently exists under that exact name.
    async fn repo_exists(&self, owner: &str, name: &str) -> Result<bool>;

    /// `clone_url` with the source credential embedded, for pull mirrors and
    /// the transfer fallback.
    fn authenticated_url(&self, clone_url: &str) -> Result<String>;
}

/// The destination control plane (GitLab).
#[async_trait]
pub trait DestinationForge: Send + Sync {
    /// Resolve the configured group id to its namespace.
    async fn resolve_group(&self, group_id: u64) -> Result<DestinationGroup>;

    /// Every project directly owned by the group or its subgroups, all pages.
    async fn list_group_projects(
        &self,
        group: &DestinationGroup,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<DestinationProject>>;

    /// Look up one project by its path relative to the group.
    async fn find_project(
        &self,
        group: &DestinationGroup,
        path: &str,
    ) -> Result<Option<DestinationProject>>;

    /// Create a project. A taken path fails with
    /// [`PlatformError::AlreadyExists`](super::PlatformError::AlreadyExists).
    async fn create_project(
        &self,
        group: &DestinationGroup,
        request: &CreateProject,
    ) -> Result<DestinationProject>;

    /// Point the project's pull mirror at `upstream_url` (credentials embedded).
    async fn configure_pull_mirror(&self, project_id: u64, upstream_url: &str) -> Result<()>;

    /// Delete a project.
    async fn delete_project(&self, project_id: u64) -> Result<()>;

    /// `repo_url` with the destination credential embedded, for the transfer
    /// fallback push.
    fn authenticated_url(&self, repo_url: &str) -> Result<String>;
}

/// Embed `username:token` into an HTTPS URL.
pub fn url_with_credentials(raw: &str, username: &str, token: &str) -> Result<String> {
    let mut url = url::Url::parse(raw)
        .map_err(|e| super::PlatformError::internal(format!("invalid URL {raw}: {e}")))?;
    let cannot_embed =
        |()| super::PlatformError::internal(format!("cannot embed credentials in {raw}"));
    url.set_username(username).map_err(cannot_embed)?;
    url.set_password(Some(token)).map_err(cannot_embed)?;
    Ok(url.into())
}

/// Remove any credentials from a URL, for comparison and logging.
pub fn strip_credentials(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.into()
        }
        Err(_) => raw.to_string(),
    }
}
