//! Region store for one audio file
//!
//! Regions are time intervals with attached transcription text. The store is
//! the only owner of region data: the interaction layer proposes new values
//! and the caller commits them here.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ADJACENCY_EPSILON;
use crate::error::RegionError;

/// Unique identifier for a region within one audio file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier for a newly created region
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RegionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A labeled time interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds, always greater than `start` once stored
    pub end: f64,

    /// Annotation text
    #[serde(default)]
    pub text: String,

    /// Machine transcription kept alongside the edited text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whisper_text: Option<String>,
}

impl Region {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            whisper_text: None,
        }
    }

    pub fn with_whisper_text(mut self, whisper_text: impl Into<String>) -> Self {
        self.whisper_text = Some(whisper_text.into());
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Finite bounds with `start < end`
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start < self.end
    }

    /// Inclusive containment test
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    /// True when one region ends where the other begins
    pub fn touches(&self, other: &Region, epsilon: f64) -> bool {
        (self.end - other.start).abs() < epsilon || (other.end - self.start).abs() < epsilon
    }

    /// Inclusive interval intersection, touching counts
    pub fn intersects(&self, start: f64, end: f64) -> bool {
        (self.start >= start && self.start <= end)
            || (self.end >= start && self.end <= end)
            || (self.start <= start && self.end >= end)
    }

    /// Interiors overlap by more than `epsilon`
    pub fn overlaps_interior(&self, other: &Region, epsilon: f64) -> bool {
        self.start < other.end - epsilon && other.start < self.end - epsilon
    }

    fn check_bounds(&self) -> Result<(), RegionError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(RegionError::InvalidBounds {
                start: self.start,
                end: self.end,
            })
        }
    }
}

/// Which side of a region to look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The neighbor ending where this region starts
    Before,
    /// The neighbor starting where this region ends
    After,
}

/// Authoritative collection of one audio file's regions
#[derive(Debug, Clone)]
pub struct RegionStore {
    /// All regions indexed by ID, in insertion order
    regions: IndexMap<RegionId, Region>,

    /// Tolerance for deciding two boundaries touch
    epsilon: f64,
}

impl Default for RegionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionStore {
    /// Create an empty store using the default adjacency epsilon
    pub fn new() -> Self {
        Self::with_epsilon(ADJACENCY_EPSILON)
    }

    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            regions: IndexMap::new(),
            epsilon,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Replace the contents, skipping regions with invalid bounds
    pub fn load<I>(&mut self, regions: I) -> usize
    where
        I: IntoIterator<Item = (RegionId, Region)>,
    {
        self.regions.clear();
        for (id, region) in regions {
            if !region.is_valid() {
                warn!(
                    "Skipping region {} with invalid bounds {}..{}",
                    id, region.start, region.end
                );
                continue;
            }
            self.regions.insert(id, region);
        }
        debug!("Loaded {} regions", self.regions.len());
        self.regions.len()
    }

    /// Insert or replace a region
    pub fn add(&mut self, id: RegionId, region: Region) -> Result<(), RegionError> {
        region.check_bounds()?;
        self.regions.insert(id, region);
        Ok(())
    }

    /// Replace an existing region; never inserts
    pub fn update(&mut self, id: &RegionId, region: Region) -> Result<(), RegionError> {
        region.check_bounds()?;
        match self.regions.get_mut(id) {
            Some(existing) => {
                *existing = region;
                Ok(())
            }
            None => Err(RegionError::NotFound(id.clone())),
        }
    }

    /// Delete a region
    pub fn remove(&mut self, id: &RegionId) -> Option<Region> {
        self.regions.shift_remove(id)
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn get(&self, id: &RegionId) -> Option<&Region> {
        self.regions.get(id)
    }

    pub fn contains(&self, id: &RegionId) -> bool {
        self.regions.contains_key(id)
    }

    /// Get all regions keyed by id
    pub fn all(&self) -> &IndexMap<RegionId, Region> {
        &self.regions
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionId, &Region)> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions ordered by start time, ties broken by id
    pub fn sorted(&self) -> Vec<(&RegionId, &Region)> {
        let mut sorted: Vec<_> = self.regions.iter().collect();
        sorted.sort_by(|(a_id, a), (b_id, b)| {
            a.start.total_cmp(&b.start).then_with(|| a_id.cmp(b_id))
        });
        sorted
    }

    /// First region (by iteration order) containing `time`
    pub fn find_at_time(&self, time: f64) -> Option<(&RegionId, &Region)> {
        self.regions.iter().find(|(_, region)| region.contains(time))
    }

    /// Whether any region other than `exclude` intersects `[start, end]`
    pub fn has_overlapping(&self, start: f64, end: f64, exclude: Option<&RegionId>) -> bool {
        self.regions
            .iter()
            .filter(|(id, _)| Some(*id) != exclude)
            .any(|(_, region)| region.intersects(start, end))
    }

    /// All regions other than `exclude` intersecting `[start, end]`
    pub fn find_overlapping(
        &self,
        start: f64,
        end: f64,
        exclude: Option<&RegionId>,
    ) -> Vec<(&RegionId, &Region)> {
        self.regions
            .iter()
            .filter(|(id, _)| Some(*id) != exclude)
            .filter(|(_, region)| region.intersects(start, end))
            .collect()
    }

    /// The neighbor whose opposite boundary touches `id` on the given side
    pub fn find_adjacent(&self, id: &RegionId, side: Side) -> Option<(&RegionId, &Region)> {
        let region = self.regions.get(id)?;
        let epsilon = self.epsilon;
        self.sorted().into_iter().find(|(other_id, other)| {
            *other_id != id
                && match side {
                    Side::Before => (other.end - region.start).abs() < epsilon,
                    Side::After => (other.start - region.end).abs() < epsilon,
                }
        })
    }

    /// Pairs of regions whose interiors overlap; logged as warnings
    pub fn overlap_report(&self) -> Vec<(RegionId, RegionId)> {
        let sorted = self.sorted();
        let mut pairs = Vec::new();
        for (i, (a_id, a)) in sorted.iter().enumerate() {
            for (b_id, b) in sorted.iter().skip(i + 1) {
                if b.start >= a.end {
                    break;
                }
                if a.overlaps_interior(b, self.epsilon) {
                    warn!(
                        "Overlapping regions {} ({}..{}) and {} ({}..{})",
                        a_id, a.start, a.end, b_id, b.start, b.end
                    );
                    pairs.push(((*a_id).clone(), (*b_id).clone()));
                }
            }
        }
        pairs
    }

    /// Remove the given regions and return their union for the caller to insert
    pub fn merge_overlapping(&mut self, ids: &[RegionId]) -> Result<Region, RegionError> {
        let found: Vec<&Region> = ids.iter().filter_map(|id| self.regions.get(id)).collect();
        if found.len() < 2 {
            return Err(RegionError::NotEnoughRegions(found.len()));
        }

        let start = found.iter().map(|r| r.start).fold(f64::INFINITY, f64::min);
        let end = found.iter().map(|r| r.end).fold(f64::NEG_INFINITY, f64::max);
        let text = found
            .iter()
            .map(|r| r.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        for id in ids {
            self.regions.shift_remove(id);
        }

        Ok(Region::new(start, end, text))
    }

    /// Split a region in two at `at`; returns the ids of both halves
    pub fn split(&mut self, id: &RegionId, at: f64) -> Result<(RegionId, RegionId), RegionError> {
        let region = self
            .regions
            .get(id)
            .ok_or_else(|| RegionError::NotFound(id.clone()))?;

        if at <= region.start || at >= region.end {
            return Err(RegionError::SplitOutOfRange { id: id.clone(), at });
        }

        let first = Region {
            start: region.start,
            end: at,
            text: region.text.clone(),
            whisper_text: region.whisper_text.clone(),
        };
        let second = Region {
            start: at,
            end: region.end,
            text: region.text.clone(),
            whisper_text: region.whisper_text.clone(),
        };

        let first_id = RegionId::new(format!("{}_1", id));
        let second_id = RegionId::new(format!("{}_2", id));
        if let Some(taken) = [&first_id, &second_id]
            .into_iter()
            .find(|half| self.regions.contains_key(*half))
        {
            return Err(RegionError::IdTaken(taken.clone()));
        }

        self.regions.shift_remove(id);
        self.regions.insert(first_id.clone(), first);
        self.regions.insert(second_id.clone(), second);

        Ok((first_id, second_id))
    }
}
