//! `annotations.json` files under a storage root

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use wa_core::{AnnotationPersistence, Region, RegionId};

use super::{load_regions, save_regions, ProjectStore};
use crate::annotation::AnnotationMap;
use crate::DataError;

const ANNOTATIONS_FILE: &str = "annotations.json";

/// Stores each project at `<root>/projects/<project_id>/annotations.json`
#[derive(Debug, Clone)]
pub struct JsonProjectStore {
    root: PathBuf,
}

impl JsonProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    pub fn project_dir(&self, project_id: &str) -> Result<PathBuf, DataError> {
        validate_id(project_id)?;
        Ok(self.projects_dir().join(project_id))
    }

    pub fn annotations_path(&self, project_id: &str) -> Result<PathBuf, DataError> {
        Ok(self.project_dir(project_id)?.join(ANNOTATIONS_FILE))
    }

    /// Ids of every project directory under the root
    pub async fn list_projects(&self) -> Result<Vec<String>, DataError> {
        let dir = self.projects_dir();
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                projects.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        projects.sort();
        Ok(projects)
    }
}

/// Project ids become directory names, so keep them to a single component
fn validate_id(project_id: &str) -> Result<(), DataError> {
    if project_id.is_empty()
        || project_id == "."
        || project_id == ".."
        || project_id.contains(['/', '\\'])
    {
        return Err(DataError::InvalidRequest(format!("invalid project id: {:?}", project_id)));
    }
    Ok(())
}

#[async_trait]
impl ProjectStore for JsonProjectStore {
    async fn load_project(&self, project_id: &str) -> Result<AnnotationMap, DataError> {
        let dir = self.project_dir(project_id)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Err(DataError::ProjectNotFound(project_id.to_string()));
        }

        let path = dir.join(ANNOTATIONS_FILE);
        if !tokio::fs::try_exists(&path).await? {
            debug!("No annotations saved yet for project {}", project_id);
            return Ok(AnnotationMap::new());
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let map: AnnotationMap = serde_json::from_str(&contents)?;
        info!(
            "Loaded annotations for {} audio file(s) from {}",
            map.len(),
            path.display()
        );
        Ok(map)
    }

    async fn save_project(&self, project_id: &str, annotations: &AnnotationMap) -> Result<(), DataError> {
        let dir = self.project_dir(project_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(ANNOTATIONS_FILE);
        let contents = serde_json::to_string_pretty(annotations)?;
        tokio::fs::write(&path, contents).await?;
        info!("Saved annotations to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl AnnotationPersistence for JsonProjectStore {
    async fn load_annotations(&self, project_id: &str, audio_file_id: &str) -> anyhow::Result<Vec<(RegionId, Region)>> {
        load_regions(self, project_id, audio_file_id).await
    }

    async fn save_annotations(
        &self,
        project_id: &str,
        audio_file_id: &str,
        annotations: Vec<(RegionId, Region)>,
    ) -> anyhow::Result<()> {
        save_regions(self, project_id, audio_file_id, annotations).await
    }
}
