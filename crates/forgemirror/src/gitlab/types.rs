//! GitLab API data types.

use serde::{Deserialize, Serialize};

/// GitLab project, only the fields the mirror needs.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub name: String,
    /// Project path (slug).
    pub path: String,
    /// Full path including namespace (e.g. "group/subgroup/project").
    pub path_with_namespace: String,
    pub description: Option<String>,
    /// "public", "private" or "internal".
    #[serde(default = "default_visibility")]
    pub visibility: String,
    /// Whether pull mirroring is enabled. Absent for callers without
    /// maintainer access or on tiers without mirroring.
    #[serde(default)]
    pub mirror: Option<bool>,
    /// Pull mirror source, with credentials masked by GitLab.
    #[serde(default)]
    pub import_url: Option<String>,
    pub http_url_to_repo: Option<String>,
    pub web_url: Option<String>,
}

fn default_visibility() -> String {
    "private".to_string()
}

/// GitLab group.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabGroup {
    pub id: u64,
    pub name: String,
    pub path: String,
    /// Full path (e.g. "group/subgroup").
    pub full_path: String,
}

/// `POST /projects` body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectBody<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub namespace_id: u64,
    pub visibility: &'a str,
    pub description: &'a str,
}

/// `PUT /projects/:id` body enabling pull mirroring.
#[derive(Debug, Clone, Serialize)]
pub struct PullMirrorBody<'a> {
    pub import_url: &'a str,
    pub mirror: bool,
    pub only_mirror_protected_branches: bool,
    pub mirror_trigger_builds: bool,
}
