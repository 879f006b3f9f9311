//! Destination catalog: the projects currently in the mirror group, indexed
//! by canonical key and by path.

use std::collections::{BTreeMap, HashMap};

use crate::error::{MirrorError, Result};
use crate::identity::{IdentityMapper, RepoKey};
use crate::platform::{DestinationForge, DestinationGroup, DestinationProject};
use crate::progress::{MirrorProgress, ProgressCallback, emit};

/// List every project under the group.
pub async fn list_destination_projects<D>(
    forge: &D,
    group: &DestinationGroup,
    on_progress: Option<&ProgressCallback>,
) -> Result<Vec<DestinationProject>>
where
    D: DestinationForge + ?Sized,
{
    let projects = forge
        .list_group_projects(group, on_progress)
        .await
        .map_err(|e| MirrorError::upstream("destination", &e))?;
    emit(
        on_progress,
        MirrorProgress::CatalogListed {
            group: group.full_path.clone(),
            total: projects.len(),
        },
    );
    Ok(projects)
}

/// Snapshot of the destination group.
#[derive(Debug, Clone)]
pub struct DestinationCatalog {
    group: DestinationGroup,
    by_key: BTreeMap<RepoKey, DestinationProject>,
    by_path: HashMap<String, RepoKey>,
}

impl DestinationCatalog {
    /// Index `projects`. When two projects map to the same key the first
    /// one listed is kept.
    pub fn new(
        group: DestinationGroup,
        projects: Vec<DestinationProject>,
        mapper: &IdentityMapper,
    ) -> Self {
        let mut catalog = Self {
            group,
            by_key: BTreeMap::new(),
            by_path: HashMap::new(),
        };
        for project in projects {
            let key = mapper.key_for_project(&project);
            if let Some(existing) = catalog.by_key.get(&key) {
                tracing::warn!(
                    key = %key,
                    kept = existing.id,
                    ignored = project.id,
                    "Two destination projects map to the same repository"
                );
                continue;
            }
            catalog.insert(key, project);
        }
        catalog
    }

    /// List the group and index it.
    pub async fn load<D>(
        forge: &D,
        group: &DestinationGroup,
        mapper: &IdentityMapper,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Self>
    where
        D: DestinationForge + ?Sized,
    {
        let projects = list_destination_projects(forge, group, on_progress).await?;
        Ok(Self::new(group.clone(), projects, mapper))
    }

    pub fn group(&self) -> &DestinationGroup {
        &self.group
    }

    pub fn get(&self, key: &RepoKey) -> Option<&DestinationProject> {
        self.by_key.get(key)
    }

    /// Project occupying `path`, with the key it maps to.
    pub fn by_path(&self, path: &str) -> Option<(&RepoKey, &DestinationProject)> {
        let key = self.by_path.get(path)?;
        self.by_key.get_key_value(key)
    }

    pub fn insert(&mut self, key: RepoKey, project: DestinationProject) {
        self.by_path.insert(project.path.clone(), key.clone());
        self.by_key.insert(key, project);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RepoKey, &DestinationProject)> {
        self.by_key.iter()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
