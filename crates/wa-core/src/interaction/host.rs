use crate::merge::MergeDirection;
use crate::navigation::TimeRange;
use crate::regions::RegionId;

/// Callbacks the state machine fires for gestures that leave the timeline
pub trait AnnotationEditHost {
    /// Move playback to `time`
    fn seek(&mut self, time: f64);

    fn on_add_selection(&mut self, _range: TimeRange) {}

    fn on_edit(&mut self, _id: &RegionId) {}

    fn on_delete(&mut self, _id: &RegionId) {}

    fn on_merge(&mut self, _id: &RegionId, _direction: MergeDirection) {}

    fn on_text_area_click(&mut self, _id: &RegionId) {}
}

/// Host that ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl AnnotationEditHost for NoopHost {
    fn seek(&mut self, _time: f64) {}
}
