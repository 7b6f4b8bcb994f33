use std::sync::Arc;
use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::RwLock;

use wa_core::{AnnotationPersistence, Region, RegionId};

use super::{load_regions, save_regions, ProjectStore};
use crate::annotation::AnnotationMap;
use crate::DataError;

/// In-process project store
#[derive(Debug, Clone, Default)]
pub struct MemoryAnnotationStore {
    projects: Arc<RwLock<AHashMap<String, AnnotationMap>>>,
}

impl MemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty project so loads succeed
    pub fn create_project(&self, project_id: impl Into<String>) {
        self.projects.write().entry(project_id.into()).or_default();
    }

    pub fn project_count(&self) -> usize {
        self.projects.read().len()
    }
}

#[async_trait]
impl ProjectStore for MemoryAnnotationStore {
    async fn load_project(&self, project_id: &str) -> Result<AnnotationMap, DataError> {
        self.projects
            .read()
            .get(project_id)
            .cloned()
            .ok_or_else(|| DataError::ProjectNotFound(project_id.to_string()))
    }

    async fn save_project(&self, project_id: &str, annotations: &AnnotationMap) -> Result<(), DataError> {
        self.projects
            .write()
            .insert(project_id.to_string(), annotations.clone());
        Ok(())
    }
}

#[async_trait]
impl AnnotationPersistence for MemoryAnnotationStore {
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
