//! Conversion from GitLab API types to forge-agnostic types.

use crate::platform::{DestinationGroup, DestinationProject, Visibility};

use super::types::{GitLabGroup, GitLabProject};

pub fn to_destination_group(group: GitLabGroup) -> DestinationGroup {
    DestinationGroup {
        id: group.id,
        full_path: group.full_path,
    }
}

/// Convert a GitLab project into a [`DestinationProject`].
///
/// The path is made relative to `group_path`; projects outside the group
/// keep their full path.
pub fn to_destination_project(project: GitLabProject, group_path: &str) -> DestinationProject {
    let path = project
        .path_with_namespace
        .strip_prefix(group_path)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| project.path_with_namespace.clone());

    let http_url_to_repo = project.http_url_to_repo.unwrap_or_default();

    DestinationProject {
        id: project.id,
        path,
        name: project.name,
        visibility: Visibility::from_api(&project.visibility),
        pull_mirror_configured: project.mirror.unwrap_or(false),
        import_url: project.import_url.filter(|u| !u.is_empty()),
        http_url_to_repo,
        description: project.description.filter(|d| !d.is_empty()),
    }
}
