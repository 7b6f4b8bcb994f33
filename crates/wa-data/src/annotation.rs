//! Persisted annotation records

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wa_core::{MergedAnnotation, Region, RegionId};

/// Contents of one project's `annotations.json`: audio file id to annotations
pub type AnnotationMap = BTreeMap<String, Vec<Annotation>>;

/// One region as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: RegionId,
    pub audio_file_id: String,
    pub start: f64,
    pub end: f64,

    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whisper_text: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Annotation {
    /// New record stamped with the current time
    pub fn new(id: RegionId, audio_file_id: impl Into<String>, region: Region) -> Self {
        let now = Utc::now();
        Self {
            id,
            audio_file_id: audio_file_id.into(),
            start: region.start,
            end: region.end,
            text: region.text,
            whisper_text: region.whisper_text,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn region(&self) -> Region {
        Region {
            start: self.start,
            end: self.end,
            text: self.text.clone(),
            whisper_text: self.whisper_text.clone(),
        }
    }

    /// Take new region values, keeping `created_at` and touching `updated_at`
    /// only when something changed
    pub fn apply(&mut self, region: Region) {
        if self.region() == region {
            return;
        }
        self.start = region.start;
        self.end = region.end;
        self.text = region.text;
        self.whisper_text = region.whisper_text;
        self.updated_at = Utc::now();
    }

    pub fn into_pair(self) -> (RegionId, Region) {
        let region = self.region();
        (self.id, region)
    }
}

impl From<Annotation> for MergedAnnotation {
    fn from(annotation: Annotation) -> Self {
        let (id, region) = annotation.into_pair();
        MergedAnnotation { id, region }
    }
}

/// Rebuild the stored list for an audio file from session regions,
/// carrying over timestamps of annotations that already existed
pub fn reconcile(
    audio_file_id: &str,
    existing: Vec<Annotation>,
    regions: Vec<(RegionId, Region)>,
) -> Vec<Annotation> {
    let mut by_id: BTreeMap<RegionId, Annotation> =
        existing.into_iter().map(|a| (a.id.clone(), a)).collect();

    regions
        .into_iter()
        .map(|(id, region)| match by_id.remove(&id) {
            Some(mut annotation) => {
                annotation.apply(region);
                annotation
            }
            None => Annotation::new(id, audio_file_id, region),
        })
        .collect()
}
