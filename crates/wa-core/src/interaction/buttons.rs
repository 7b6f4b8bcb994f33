//! Action buttons attached to the hovered region or the current selection

use serde::{Deserialize, Serialize};

use crate::config::{Orientation, TimelineConfig};
use crate::merge::MergeDirection;
use crate::navigation::{CoordinateTransform, TimeRange};
use crate::regions::{Region, RegionId};

use super::SurfaceSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ButtonKind {
    Add,
    Edit,
    Delete,
    MergeLeft,
    MergeRight,
}

impl ButtonKind {
    pub fn merge_direction(&self) -> Option<MergeDirection> {
        match self {
            ButtonKind::MergeLeft => Some(MergeDirection::Left),
            ButtonKind::MergeRight => Some(MergeDirection::Right),
            _ => None,
        }
    }
}

/// What a button acts on
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonTarget {
    Region(RegionId),
    Selection(TimeRange),
}

/// Rectangle in content coordinates (scroll applied)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ButtonBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ButtonBounds {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionButton {
    pub kind: ButtonKind,
    pub bounds: ButtonBounds,
    pub target: ButtonTarget,
}

/// Places buttons the same way the renderer draws them
pub struct ButtonLayout<'a> {
    config: &'a TimelineConfig,
    transform: &'a CoordinateTransform,
    surface: SurfaceSize,
}

impl<'a> ButtonLayout<'a> {
    pub fn new(config: &'a TimelineConfig, transform: &'a CoordinateTransform, surface: SurfaceSize) -> Self {
        Self {
            config,
            transform,
            surface,
        }
    }

    /// Lay out the hovered region's buttons and the selection's add button.
    ///
    /// Region buttons sit right-aligned on the cross axis just after the
    /// region's leading edge: delete outermost, then edit, then the merge
    /// buttons for whichever neighbors exist.
    pub fn compute(
        &self,
        hovered: Option<(&RegionId, &Region)>,
        has_left_neighbor: bool,
        has_right_neighbor: bool,
        selection: Option<TimeRange>,
    ) -> Vec<ActionButton> {
        let mut buttons = Vec::new();
        let size = self.config.button_size;
        let padding = self.config.button_padding;
        let step = size + self.config.button_gap;

        if let Some((id, region)) = hovered {
            let axis = self.transform.pixel_from_time(region.start.min(region.end)) + padding;
            let mut cross = self.surface.cross_extent(self.config.orientation) - size - padding;

            let mut kinds = vec![ButtonKind::Delete, ButtonKind::Edit];
            if has_right_neighbor {
                kinds.push(ButtonKind::MergeRight);
            }
            if has_left_neighbor {
                kinds.push(ButtonKind::MergeLeft);
            }

            for kind in kinds {
                buttons.push(ActionButton {
                    kind,
                    bounds: self.bounds_at(axis, cross),
                    target: ButtonTarget::Region(id.clone()),
                });
                cross -= step;
            }
        }

        if let Some(range) = selection {
            let axis = self.transform.pixel_from_time(range.start) + padding;
            let cross = self.config.text_area_offset - size - padding;
            buttons.push(ActionButton {
                kind: ButtonKind::Add,
                bounds: self.bounds_at(axis, cross),
                target: ButtonTarget::Selection(range),
            });
        }

        buttons
    }

    fn bounds_at(&self, axis: f64, cross: f64) -> ButtonBounds {
        let size = self.config.button_size;
        match self.config.orientation {
            Orientation::Vertical => ButtonBounds {
                x: cross,
                y: axis,
                width: size,
                height: size,
            },
            Orientation::Horizontal => ButtonBounds {
                x: axis,
                y: cross,
                width: size,
                height: size,
            },
        }
    }
}

/// First button containing the content-space point
pub fn button_at(buttons: &[ActionButton], x: f64, y: f64) -> Option<&ActionButton> {
    buttons.iter().find(|button| button.bounds.contains(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_buttons_right_aligned() {
        let config = TimelineConfig::default();
        // 10 px per second, inset 20
        let transform = CoordinateTransform::new(0.0, 100.0, 1040.0, 20.0).unwrap();
        let layout = ButtonLayout::new(&config, &transform, SurfaceSize::new(600.0, 1040.0));
        let id = RegionId::from("a");
        let region = Region::new(10.0, 20.0, "");

        let buttons = layout.compute(Some((&id, &region)), false, true, None);
        let kinds: Vec<_> = buttons.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![ButtonKind::Delete, ButtonKind::Edit, ButtonKind::MergeRight]);

        let delete = buttons[0].bounds;
        assert_eq!(delete.x, 600.0 - 16.0 - 8.0);
        assert_eq!(delete.y, 120.0 + 8.0);
        assert_eq!(buttons[1].bounds.x, delete.x - 21.0);
        assert!(button_at(&buttons, delete.x + 1.0, delete.y + 1.0).is_some());
        assert!(button_at(&buttons, 10.0, 10.0).is_none());
    }

    #[test]
    fn test_add_button_follows_selection() {
        let config = TimelineConfig {
            orientation: Orientation::Horizontal,
            ..TimelineConfig::default()
        };
        let transform = CoordinateTransform::new(0.0, 100.0, 1040.0, 20.0).unwrap();
        let layout = ButtonLayout::new(&config, &transform, SurfaceSize::new(1040.0, 400.0));
        let buttons = layout.compute(None, false, false, Some(TimeRange::new(30.0, 40.0)));
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].kind, ButtonKind::Add);
        assert_eq!(buttons[0].bounds.x, 320.0 + 8.0);
        assert_eq!(buttons[0].bounds.y, 350.0 - 16.0 - 8.0);
        assert_eq!(buttons[0].target, ButtonTarget::Selection(TimeRange::new(30.0, 40.0)));
    }
}
