//! Server side of the merge protocol

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use wa_core::merge::combine;
use wa_core::{MergeApi, MergeRequest, MergeResponse};

use crate::storage::ProjectStore;
use crate::DataError;

/// Merge `source_id` into `target_id` and save the audio file's list.
///
/// The target keeps its id and creation time; the source is removed.
pub async fn merge_annotations<S: ProjectStore + ?Sized>(
    store: &S,
    request: &MergeRequest,
) -> Result<MergeResponse, DataError> {
    if request.project_id.is_empty() || request.audio_file_id.is_empty() {
        return Err(DataError::InvalidRequest(
            "missing project id or audio file id".to_string(),
        ));
    }
    if request.target_id == request.source_id {
        return Err(DataError::InvalidRequest(format!(
            "cannot merge {} with itself",
            request.source_id
        )));
    }

    let mut annotations = store
        .load_audio(&request.project_id, &request.audio_file_id)
        .await?;

    let target_index = annotations
        .iter()
        .position(|a| a.id == request.target_id)
        .ok_or_else(|| DataError::AnnotationNotFound(request.target_id.to_string()))?;
    let source = annotations
        .iter()
        .find(|a| a.id == request.source_id)
        .cloned()
        .ok_or_else(|| DataError::AnnotationNotFound(request.source_id.to_string()))?;

    let target = &mut annotations[target_index];
    let merged = combine(&target.region(), &source.region(), request.direction);
    target.start = merged.start;
    target.end = merged.end;
    target.text = merged.text;
    target.whisper_text = merged.whisper_text;
    target.updated_at = Utc::now();
    let merged = target.clone();

    annotations.retain(|a| a.id != request.source_id);
    store
        .save_audio(&request.project_id, &request.audio_file_id, annotations)
        .await?;

    info!(
        "Merged annotation {} into {} ({}..{})",
        request.source_id, merged.id, merged.start, merged.end
    );
    Ok(MergeResponse::ok(merged.into()))
}

/// [`MergeApi`] answered in-process by a project store
pub struct LocalMergeApi<S> {
    store: Arc<S>,
}

impl<S: ProjectStore> LocalMergeApi<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

#[async_trait]
impl<S: ProjectStore + 'static> MergeApi for LocalMergeApi<S> {
    async fn merge(&self, request: &MergeRequest) -> anyhow::Result<MergeResponse> {
        match merge_annotations(self.store.as_ref(), request).await {
            Ok(response) => Ok(response),
            // request-level failures come back as an unsuccessful response
            Err(
                e @ (DataError::InvalidRequest(_)
                | DataError::AnnotationNotFound(_)
                | DataError::ProjectNotFound(_)),
            ) => {
                warn!("Merge request rejected: {}", e);
                Ok(MergeResponse::failed(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
