//! Pointer-driven region editing
//!
//! Raw pointer positions are mapped through a [`CoordinateTransform`] and
//! interpreted by the [`InteractionStateMachine`] relative to its current
//! [`InteractionMode`]. The machine never mutates regions; it hands back
//! [`InteractionResult`] values for the caller to commit and repaint.
//!
//! [`CoordinateTransform`]: crate::navigation::CoordinateTransform

use serde::{Deserialize, Serialize};

use crate::config::Orientation;
use crate::navigation::{CoordinateTransform, TimeRange};
use crate::regions::{Region, RegionId, RegionStore};

mod buttons;
mod drag;
mod host;
mod machine;

pub use buttons::{ActionButton, ButtonBounds, ButtonKind, ButtonLayout, ButtonTarget};
pub use drag::DragInfo;
pub use hit_test::{find_handle, BodyArea, HitTarget};
pub use host::{AnnotationEditHost, NoopHost};
pub use machine::InteractionStateMachine;

/// Pointer position relative to the drawing surface's bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,

    /// Scroll offset of the container along the time axis
    #[serde(default)]
    pub scroll_offset: f64,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            scroll_offset: 0.0,
        }
    }

    pub fn with_scroll(mut self, scroll_offset: f64) -> Self {
        self.scroll_offset = scroll_offset;
        self
    }

    /// Content coordinate along the time axis
    pub fn axis(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Vertical => self.y + self.scroll_offset,
            Orientation::Horizontal => self.x + self.scroll_offset,
        }
    }

    /// Coordinate across the time axis
    pub fn cross(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Vertical => self.x,
            Orientation::Horizontal => self.y,
        }
    }

    /// Position in content space (scroll applied), as `(x, y)`
    pub fn content_position(&self, orientation: Orientation) -> (f64, f64) {
        match orientation {
            Orientation::Vertical => (self.x, self.y + self.scroll_offset),
            Orientation::Horizontal => (self.x + self.scroll_offset, self.y),
        }
    }
}

/// Pixel size of the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Extent along the time axis
    pub fn time_extent(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Vertical => self.height,
            Orientation::Horizontal => self.width,
        }
    }

    /// Extent across the time axis
    pub fn cross_extent(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Vertical => self.width,
            Orientation::Horizontal => self.height,
        }
    }
}

/// Everything the state machine reads while handling one event
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext<'a> {
    pub store: &'a RegionStore,
    pub transform: &'a CoordinateTransform,
    pub surface: SurfaceSize,
    pub total_duration: f64,
}

/// The single source of truth for what the next pointer event means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    /// Dragging out a new selection
    Creating,
    /// Resizing one boundary of one region
    DraggingSingle,
    /// Resizing a boundary shared by two touching regions
    DraggingBoth,
    /// A region's text is being edited
    Editing,
}

impl InteractionMode {
    pub fn is_dragging(&self) -> bool {
        matches!(self, InteractionMode::DraggingSingle | InteractionMode::DraggingBoth)
    }
}

/// Which boundary of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    Start,
    End,
}

/// A resize handle under the pointer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleHit {
    pub id: RegionId,
    pub boundary: Boundary,
}

/// What the pointer is currently over while idle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HoverState {
    pub region: Option<RegionId>,
    pub handle: Option<HandleHit>,

    /// The neighbor that would move with `handle`
    pub adjacent: Option<RegionId>,

    pub button: Option<ButtonKind>,
}

impl HoverState {
    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.handle.is_none() && self.button.is_none()
    }
}

/// Cursor the surface should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Pointer,
    Resize,
}

/// Outcome of one pointer event
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionResult {
    /// A resize gesture began on a handle
    ResizeStarted {
        id: RegionId,
        boundary: Boundary,
        paired: Option<RegionId>,
    },

    /// Live resize proposal; the store is not yet updated
    Annotation {
        id: RegionId,
        region: Region,
        adjacent: Option<(RegionId, Region)>,
        snapped_to: Option<f64>,
    },

    /// A selection gesture began; any previous selection is gone
    SelectionStarted { time: f64 },

    /// Selection range, `complete` once the pointer is released
    Selection { range: TimeRange, complete: bool },

    /// An in-progress selection was abandoned
    SelectionCleared,

    Hover(HoverState),

    /// Final resize values to persist, including the paired neighbor
    Committed {
        id: RegionId,
        region: Region,
        adjacent: Option<(RegionId, Region)>,
    },

    Seek { time: f64 },

    ButtonClicked { kind: ButtonKind, target: ButtonTarget },

    TextAreaClicked { id: RegionId },
}

impl InteractionResult {
    /// Whether the caller must write regions to persistence
    pub fn needs_persist(&self) -> bool {
        matches!(self, InteractionResult::Committed { .. })
    }

    /// Updated region values carried by this result
    pub fn region_updates(&self) -> Vec<(RegionId, Region)> {
        match self {
            InteractionResult::Annotation { id, region, adjacent, .. }
            | InteractionResult::Committed { id, region, adjacent } => {
                let mut updates = vec![(id.clone(), region.clone())];
                if let Some(pair) = adjacent {
                    updates.push(pair.clone());
                }
                updates
            }
            _ => Vec::new(),
        }
    }
}
