//! Project annotation storage backends

mod json_store;
mod memory;

pub use json_store::JsonProjectStore;
pub use memory::MemoryAnnotationStore;

use async_trait::async_trait;
use tracing::warn;

use wa_core::{Region, RegionId};

use crate::annotation::{reconcile, Annotation, AnnotationMap};
use crate::DataError;

/// Annotation storage for projects, one map of audio file lists per project
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Read a project's annotation map
    async fn load_project(&self, project_id: &str) -> Result<AnnotationMap, DataError>;

    /// Write a project's annotation map, replacing it
    async fn save_project(&self, project_id: &str, annotations: &AnnotationMap) -> Result<(), DataError>;

    /// Annotations of one audio file; empty when none were saved yet
    async fn load_audio(&self, project_id: &str, audio_file_id: &str) -> Result<Vec<Annotation>, DataError> {
        let mut map = self.load_project(project_id).await?;
        Ok(map.remove(audio_file_id).unwrap_or_default())
    }

    /// Replace one audio file's list, leaving the other lists untouched.
    /// An unreadable project map is started over.
    async fn save_audio(
        &self,
        project_id: &str,
        audio_file_id: &str,
        annotations: Vec<Annotation>,
    ) -> Result<(), DataError> {
        let mut map = match self.load_project(project_id).await {
            Ok(map) => map,
            Err(e) => {
                warn!("Starting a new annotation map for {}: {}", project_id, e);
                AnnotationMap::new()
            }
        };
        map.insert(audio_file_id.to_string(), annotations);
        self.save_project(project_id, &map).await
    }
}

pub(crate) async fn load_regions<S: ProjectStore + ?Sized>(
    store: &S,
    project_id: &str,
    audio_file_id: &str,
) -> anyhow::Result<Vec<(RegionId, Region)>> {
    let annotations = store.load_audio(project_id, audio_file_id).await?;
    Ok(annotations.into_iter().map(Annotation::into_pair).collect())
}

pub(crate) async fn save_regions<S: ProjectStore + ?Sized>(
    store: &S,
    project_id: &str,
    audio_file_id: &str,
    regions: Vec<(RegionId, Region)>,
) -> anyhow::Result<()> {
    let existing = store
        .load_audio(project_id, audio_file_id)
        .await
        .unwrap_or_default();
    let annotations = reconcile(audio_file_id, existing, regions);
    store.save_audio(project_id, audio_file_id, annotations).await?;
    Ok(())
}
