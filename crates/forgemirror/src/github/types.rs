//! GitHub API data types.

use serde::Deserialize;

/// GitHub repository, only the fields the mirror needs.
///
/// API docs: https://docs.github.com/en/rest/repos/repos#list-repositories-for-the-authenticated-user
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    pub owner: GitHubOwner,
    #[serde(default)]
    pub private: bool,
    /// `public`, `private` or `internal`; absent on older API versions.
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub fork: bool,
    /// HTTPS clone URL.
    pub clone_url: String,
}

/// Repository owner (user or organization).
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
}
