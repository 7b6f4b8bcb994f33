//! Combining a region with its touching neighbor
//!
//! The clicked region is the *source*; the neighbor in the requested
//! direction is the *target* and keeps its id. Nothing is applied locally
//! until the merge API has confirmed the result.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MergeError;
use crate::regions::{Region, RegionId, RegionStore, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeDirection {
    Left,
    Right,
}

impl MergeDirection {
    /// Which side of the source the target lies on
    pub fn side(&self) -> Side {
        match self {
            MergeDirection::Left => Side::Before,
            MergeDirection::Right => Side::After,
        }
    }
}

impl fmt::Display for MergeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeDirection::Left => write!(f, "left"),
            MergeDirection::Right => write!(f, "right"),
        }
    }
}

impl FromStr for MergeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(MergeDirection::Left),
            "right" => Ok(MergeDirection::Right),
            other => Err(format!("invalid merge direction: {}", other)),
        }
    }
}

/// Wire request sent to the merge endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub project_id: String,
    pub audio_file_id: String,
    pub target_id: RegionId,
    pub source_id: RegionId,
    pub direction: MergeDirection,
}

/// A region together with its id, as returned by the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedAnnotation {
    pub id: RegionId,
    #[serde(flatten)]
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<MergedAnnotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MergeResponse {
    pub fn ok(annotation: MergedAnnotation) -> Self {
        Self {
            success: true,
            annotation: Some(annotation),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            annotation: None,
            error: Some(message.into()),
        }
    }
}

/// Remote side of the merge protocol
#[async_trait]
pub trait MergeApi: Send + Sync {
    async fn merge(&self, request: &MergeRequest) -> anyhow::Result<MergeResponse>;
}

/// Join `target` and `source` in spatial order.
///
/// Texts are concatenated without a separator.
pub fn combine(target: &Region, source: &Region, direction: MergeDirection) -> Region {
    let (left, right) = match direction {
        MergeDirection::Left => (target, source),
        MergeDirection::Right => (source, target),
    };

    let whisper_text = match (&left.whisper_text, &right.whisper_text) {
        (None, None) => None,
        (a, b) => Some(format!(
            "{}{}",
            a.as_deref().unwrap_or_default(),
            b.as_deref().unwrap_or_default()
        )),
    };

    Region {
        start: left.start,
        end: right.end,
        text: format!("{}{}", left.text, right.text),
        whisper_text,
    }
}

/// A merge computed locally, waiting for confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    pub request: MergeRequest,
    pub source: RegionId,
    pub target: RegionId,

    /// Expected result; the endpoint's answer wins when applied
    pub merged: Region,
}

pub struct MergeCoordinator;

impl MergeCoordinator {
    /// Locate the neighbor of `source` in `direction` and compute the merge.
    /// The store is not modified.
    pub fn plan(
        store: &RegionStore,
        project_id: &str,
        audio_file_id: &str,
        source: &RegionId,
        direction: MergeDirection,
    ) -> Result<MergePlan, MergeError> {
        let source_region = store
            .get(source)
            .ok_or_else(|| MergeError::RegionNotFound(source.clone()))?;

        let Some((target, target_region)) = store.find_adjacent(source, direction.side()) else {
            warn!("No adjacent annotation found to the {} of {}", direction, source);
            return Err(MergeError::NoAdjacentRegion {
                id: source.clone(),
                direction,
            });
        };

        let merged = combine(target_region, source_region, direction);
        debug!(
            "Planned merge of {} into {}: {}..{}",
            source, target, merged.start, merged.end
        );

        Ok(MergePlan {
            request: MergeRequest {
                project_id: project_id.to_string(),
                audio_file_id: audio_file_id.to_string(),
                target_id: target.clone(),
                source_id: source.clone(),
                direction,
            },
            source: source.clone(),
            target: target.clone(),
            merged,
        })
    }

    /// Apply a confirmed merge: remove the source, upsert the returned
    /// annotation. A failed or malformed response leaves the store unchanged.
    pub fn apply(
        store: &mut RegionStore,
        plan: &MergePlan,
        response: MergeResponse,
    ) -> Result<MergedAnnotation, MergeError> {
        if !response.success {
            let message = response.error.unwrap_or_else(|| "merge failed".to_string());
            return Err(MergeError::Rejected(message));
        }
        let annotation = response
            .annotation
            .ok_or_else(|| MergeError::Rejected("response carried no annotation".to_string()))?;
        if !annotation.region.is_valid() {
            return Err(MergeError::Rejected(format!(
                "invalid merged bounds {}..{}",
                annotation.region.start, annotation.region.end
            )));
        }

        store.remove(&plan.source);
        if annotation.id != plan.target {
            store.remove(&plan.target);
        }
        store
            .add(annotation.id.clone(), annotation.region.clone())
            .map_err(|e| MergeError::Rejected(e.to_string()))?;
        Ok(annotation)
    }
}
