//! Timeline configuration
//!
//! Every tolerance and layout constant the interaction core depends on lives
//! here so the renderer and the hit tester agree on the same geometry.

use serde::{Deserialize, Serialize};

/// Two boundaries closer than this (in seconds) are considered touching.
pub const ADJACENCY_EPSILON: f64 = 0.01;

/// Smallest duration a region may be resized down to.
pub const MIN_REGION_DURATION: f64 = 0.1;

/// Pixel distance within which a dragged boundary lands on another boundary.
pub const SNAP_THRESHOLD_PX: f64 = 5.0;

/// Pointer displacement below which a gesture is a click, not a drag.
pub const DRAG_THRESHOLD_PX: f64 = 10.0;

/// Which screen axis carries time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Time runs top to bottom; the container scrolls vertically
    #[default]
    Vertical,
    /// Time runs left to right; the container scrolls horizontally
    Horizontal,
}

/// Configuration for the timeline interaction core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Padding before the first and after the last drawable pixel on the time axis
    pub edge_inset: f64,

    /// Pixel density used when a file is first opened
    pub default_pixels_per_second: f64,

    /// Container extent assumed before the real surface size is known
    pub initial_container_width: f64,

    /// Lower zoom bound (pixels per second)
    pub min_zoom: f64,

    /// Upper zoom bound (pixels per second)
    pub max_zoom: f64,

    /// Multiplier applied by a single zoom-in / zoom-out step
    pub zoom_factor: f64,

    /// Hit radius around a region boundary, larger than the drawn handle
    pub handle_tolerance: f64,

    /// Size of the drawn handle
    pub handle_visual_size: f64,

    pub snap_threshold: f64,
    pub drag_threshold: f64,
    pub adjacency_epsilon: f64,
    pub min_region_duration: f64,

    pub orientation: Orientation,

    /// Cross-axis coordinate where the text column of a region begins
    pub text_area_offset: f64,

    pub button_size: f64,
    pub button_padding: f64,
    pub button_gap: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            edge_inset: 20.0,
            default_pixels_per_second: 50.0,
            initial_container_width: 1000.0,
            min_zoom: 1.0,
            max_zoom: 500.0,
            zoom_factor: 1.1,
            handle_tolerance: 8.0,
            handle_visual_size: 6.0,
            snap_threshold: SNAP_THRESHOLD_PX,
            drag_threshold: DRAG_THRESHOLD_PX,
            adjacency_epsilon: ADJACENCY_EPSILON,
            min_region_duration: MIN_REGION_DURATION,
            orientation: Orientation::Vertical,
            text_area_offset: 350.0,
            button_size: 16.0,
            button_padding: 8.0,
            button_gap: 5.0,
        }
    }
}

impl TimelineConfig {
    /// Seconds visible when a file is first opened
    pub fn initial_window_seconds(&self) -> f64 {
        self.initial_container_width / self.default_pixels_per_second
    }

    /// Clamp a pixel density into the configured zoom range
    pub fn clamp_zoom(&self, pixels_per_second: f64) -> f64 {
        pixels_per_second.clamp(self.min_zoom, self.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_window_is_derived() {
        let config = TimelineConfig::default();
        assert_eq!(config.initial_window_seconds(), 20.0);
    }

    #[test]
    fn test_clamp_zoom() {
        let config = TimelineConfig::default();
        assert_eq!(config.clamp_zoom(0.2), 1.0);
        assert_eq!(config.clamp_zoom(1200.0), 500.0);
        assert_eq!(config.clamp_zoom(75.0), 75.0);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: TimelineConfig =
            serde_json::from_str(r#"{ "snap_threshold": 9.0, "orientation": "horizontal" }"#).unwrap();
        assert_eq!(config.snap_threshold, 9.0);
        assert_eq!(config.orientation, Orientation::Horizontal);
        assert_eq!(config.drag_threshold, DRAG_THRESHOLD_PX);
    }
}
