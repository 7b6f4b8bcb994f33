//! Error types for the annotation core

use thiserror::Error;

use crate::merge::MergeDirection;
use crate::regions::RegionId;

/// Errors reported by region store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegionError {
    #[error("region not found: {0}")]
    NotFound(RegionId),

    #[error("invalid region bounds: start {start} must be before end {end}")]
    InvalidBounds { start: f64, end: f64 },

    #[error("split point {at} is outside region {id}")]
    SplitOutOfRange { id: RegionId, at: f64 },

    #[error("region id already in use: {0}")]
    IdTaken(RegionId),

    #[error("need at least two regions to merge, got {0}")]
    NotEnoughRegions(usize),
}

/// Errors reported by the merge protocol
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("annotation not found: {0}")]
    RegionNotFound(RegionId),

    #[error("no adjacent annotation found to the {direction} of {id}")]
    NoAdjacentRegion { id: RegionId, direction: MergeDirection },

    #[error("merge request failed: {0}")]
    Api(String),

    #[error("merge rejected by server: {0}")]
    Rejected(String),
}
