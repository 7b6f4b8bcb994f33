//! Time <-> pixel mapping for one drawing surface

use super::{TimeRange, Viewport};

/// Stateless mapping derived from the visible window and the surface extent.
///
/// Re-create it whenever the viewport or the surface size changes; it is
/// cheap to build and holds no references.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    start_time: f64,
    end_time: f64,
    pixel_width: f64,
    edge_inset: f64,
    pixels_per_second: f64,
}

impl CoordinateTransform {
    /// Returns `None` when the window is empty or the surface has no drawable extent
    pub fn new(start_time: f64, end_time: f64, pixel_width: f64, edge_inset: f64) -> Option<Self> {
        let drawable = pixel_width - 2.0 * edge_inset;
        let duration = end_time - start_time;
        if !(drawable > 0.0) || !(duration > 0.0) {
            return None;
        }
        Some(Self {
            start_time,
            end_time,
            pixel_width,
            edge_inset,
            pixels_per_second: drawable / duration,
        })
    }

    pub fn from_viewport(viewport: &Viewport, pixel_width: f64, edge_inset: f64) -> Option<Self> {
        Self::new(viewport.start_time(), viewport.end_time(), pixel_width, edge_inset)
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }

    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    pub fn edge_inset(&self) -> f64 {
        self.edge_inset
    }

    pub fn visible_range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    pub fn time_from_pixel(&self, pixel: f64) -> f64 {
        self.start_time + (pixel - self.edge_inset) / self.pixels_per_second
    }

    /// Rounded to a whole pixel so repeated redraws land on the same column
    pub fn pixel_from_time(&self, time: f64) -> f64 {
        (self.edge_inset + (time - self.start_time) * self.pixels_per_second).round()
    }

    /// Seconds covered by `pixels` at the current density
    pub fn pixels_to_duration(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_second
    }

    pub fn is_time_visible(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }
}
