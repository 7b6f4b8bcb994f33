//! Visible time window over an audio file

use tracing::{debug, warn};

use crate::config::TimelineConfig;

use super::TimeRange;

/// Tracks which part of the total duration is presented and owns zoom/pan
#[derive(Debug, Clone)]
pub struct Viewport {
    start_time: f64,
    end_time: f64,
    total_duration: f64,
    pixels_per_second: f64,
    container_width: f64,
    config: TimelineConfig,
}

impl Viewport {
    /// Create an empty viewport; nothing is visible until `set_duration`
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            start_time: 0.0,
            end_time: 0.0,
            total_duration: 0.0,
            pixels_per_second: config.default_pixels_per_second,
            container_width: config.initial_container_width,
            config,
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }

    pub fn container_width(&self) -> f64 {
        self.container_width
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    pub fn view_duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether an audio file with a usable duration is loaded
    pub fn is_loaded(&self) -> bool {
        self.total_duration > 0.0 && self.end_time > self.start_time
    }

    /// Set the total duration and show the initial window from zero
    pub fn set_duration(&mut self, total: f64) {
        if !total.is_finite() || total <= 0.0 {
            warn!("Ignoring invalid audio duration: {}", total);
            self.reset();
            return;
        }

        self.total_duration = total;
        self.pixels_per_second = self.config.default_pixels_per_second;
        self.start_time = 0.0;
        self.end_time = total.min(self.config.initial_window_seconds());
        debug!(
            "Viewport initialised: duration={} window={}..{}",
            total, self.start_time, self.end_time
        );
    }

    /// Forget the loaded file
    pub fn reset(&mut self) {
        self.start_time = 0.0;
        self.end_time = 0.0;
        self.total_duration = 0.0;
        self.pixels_per_second = self.config.default_pixels_per_second;
    }

    /// Record the current container extent along the time axis
    pub fn set_container_width(&mut self, width: f64) {
        if width > 0.0 && width.is_finite() {
            self.container_width = width;
            self.sync_density();
        }
    }

    /// Derive the density from the current window and container width
    fn sync_density(&mut self) {
        let width = self.view_duration();
        if width > 0.0 {
            self.pixels_per_second = self.container_width / width;
        }
    }

    /// Set the window directly; invalid ranges are rejected without clamping
    pub fn set_viewport(&mut self, start: f64, end: f64) -> bool {
        let finite = start.is_finite() && end.is_finite();
        if !finite || start < 0.0 || end > self.total_duration || start >= end {
            warn!(
                "Invalid viewport range: start={} end={} duration={}",
                start, end, self.total_duration
            );
            return false;
        }
        self.start_time = start;
        self.end_time = end;
        self.sync_density();
        true
    }

    /// Pan to a new start, keeping the window width and clamping into range
    pub fn move_view(&mut self, new_start: f64) -> bool {
        if !self.is_loaded() {
            return false;
        }
        if !new_start.is_finite() {
            warn!("Ignoring non-finite pan target: {}", new_start);
            return false;
        }
        let width = self.view_duration();
        let max_start = (self.total_duration - width).max(0.0);
        let start = new_start.clamp(0.0, max_start);
        let changed = start != self.start_time;
        self.start_time = start;
        self.end_time = start + width;
        changed
    }

    /// Zoom to a pixel density, keeping `focus_time` at the same relative
    /// position inside the window. Defaults to the window center.
    pub fn zoom_view(&mut self, new_pixels_per_second: f64, focus_time: Option<f64>) -> bool {
        if !self.is_loaded() || !new_pixels_per_second.is_finite() {
            return false;
        }
        if focus_time.is_some_and(|focus| !focus.is_finite()) {
            warn!("Ignoring non-finite zoom focus: {:?}", focus_time);
            return false;
        }

        let pixels_per_second = self.config.clamp_zoom(new_pixels_per_second);
        let old_width = self.view_duration();
        let focus = focus_time.unwrap_or(self.start_time + old_width / 2.0);
        let ratio = ((focus - self.start_time) / old_width).clamp(0.0, 1.0);

        let new_width = (self.container_width / pixels_per_second).min(self.total_duration);
        let max_start = self.total_duration - new_width;
        let start = (focus - ratio * new_width).clamp(0.0, max_start.max(0.0));

        self.pixels_per_second = pixels_per_second;
        self.start_time = start;
        self.end_time = (start + new_width).min(self.total_duration);
        debug!(
            "Zoomed to {} px/s around {}: window={}..{}",
            pixels_per_second, focus, self.start_time, self.end_time
        );
        true
    }

    pub fn zoom_in_view(&mut self, focus_time: Option<f64>) -> bool {
        self.zoom_view(self.pixels_per_second * self.config.zoom_factor, focus_time)
    }

    pub fn zoom_out_view(&mut self, focus_time: Option<f64>) -> bool {
        self.zoom_view(self.pixels_per_second / self.config.zoom_factor, focus_time)
    }

    pub fn is_time_in_view(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    /// Position of `time` inside the window as a 0..1 ratio
    pub fn relative_position(&self, time: f64) -> f64 {
        let width = self.view_duration();
        if width <= 0.0 {
            return 0.0;
        }
        (time - self.start_time) / width
    }

    pub fn time_at_relative(&self, position: f64) -> f64 {
        self.start_time + position * self.view_duration()
    }

    /// Keep a playing position on screen by re-centering when it leaves the window
    pub fn follow_playhead(&mut self, time: f64) -> bool {
        if !self.is_loaded() || self.is_time_in_view(time) {
            return false;
        }
        self.move_view(time - self.view_duration() / 2.0)
    }
}
