//! Per-file annotation session tying viewport, regions and interaction together

use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::config::{Orientation, TimelineConfig};
use crate::error::{MergeError, RegionError};
use crate::events::events::{
    MergeRejected, OverlapDetected, RegionCommitted, RegionRemoved, RegionsMerged,
    SelectionChanged, ViewportChanged,
};
use crate::events::{EventBus, RedrawScheduler};
use crate::interaction::{
    AnnotationEditHost, InteractionContext, InteractionResult, InteractionStateMachine, NoopHost,
    PointerEvent, SurfaceSize,
};
use crate::merge::{MergeApi, MergeCoordinator, MergeDirection, MergedAnnotation};
use crate::navigation::{CoordinateTransform, Viewport};
use crate::persistence::AnnotationPersistence;
use crate::regions::{Region, RegionId, RegionStore};

/// Everything open for one audio file of one project
pub struct AnnotationSession<H = NoopHost> {
    project_id: String,
    audio_file_id: String,
    config: TimelineConfig,

    viewport: RwLock<Viewport>,
    store: RwLock<RegionStore>,
    machine: Mutex<InteractionStateMachine<H>>,
    surface: RwLock<SurfaceSize>,

    /// The event bus
    pub event_bus: Arc<EventBus>,

    /// Pending redraw flag shared with the renderer
    pub redraw: Arc<RedrawScheduler>,
}

impl AnnotationSession<NoopHost> {
    pub fn headless(project_id: impl Into<String>, audio_file_id: impl Into<String>, config: TimelineConfig) -> Self {
        Self::new(project_id, audio_file_id, config, NoopHost)
    }
}

impl<H: AnnotationEditHost> AnnotationSession<H> {
    pub fn new(
        project_id: impl Into<String>,
        audio_file_id: impl Into<String>,
        config: TimelineConfig,
        host: H,
    ) -> Self {
        let surface = match config.orientation {
            Orientation::Vertical => {
                SurfaceSize::new(config.text_area_offset * 2.0, config.initial_container_width)
            }
            Orientation::Horizontal => {
                SurfaceSize::new(config.initial_container_width, config.text_area_offset * 2.0)
            }
        };

        Self {
            project_id: project_id.into(),
            audio_file_id: audio_file_id.into(),
            viewport: RwLock::new(Viewport::new(config.clone())),
            store: RwLock::new(RegionStore::with_epsilon(config.adjacency_epsilon)),
            machine: Mutex::new(InteractionStateMachine::new(config.clone(), host)),
            surface: RwLock::new(surface),
            event_bus: Arc::new(EventBus::new()),
            redraw: Arc::new(RedrawScheduler::new()),
            config,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn audio_file_id(&self) -> &str {
        &self.audio_file_id
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.read().clone()
    }

    pub fn regions(&self) -> RwLockReadGuard<'_, RegionStore> {
        self.store.read()
    }

    /// Run `f` with the state machine locked
    pub fn with_machine<R>(&self, f: impl FnOnce(&mut InteractionStateMachine<H>) -> R) -> R {
        f(&mut self.machine.lock())
    }

    /// Set the audio duration once decoding has finished
    pub fn set_duration(&self, total: f64) {
        self.viewport.write().set_duration(total);
        self.viewport_changed();
    }

    pub fn set_surface(&self, surface: SurfaceSize) {
        *self.surface.write() = surface;
        self.viewport
            .write()
            .set_container_width(surface.time_extent(self.config.orientation));
        self.redraw.request();
    }

    /// Mapping for the current window and surface; `None` until audio is loaded
    pub fn transform(&self) -> Option<CoordinateTransform> {
        let extent = self.surface.read().time_extent(self.config.orientation);
        CoordinateTransform::from_viewport(&self.viewport.read(), extent, self.config.edge_inset)
    }

    /// Replace all regions; overlaps are reported, not corrected
    pub fn load_regions<I>(&self, regions: I) -> usize
    where
        I: IntoIterator<Item = (RegionId, Region)>,
    {
        let (loaded, pairs) = {
            let mut store = self.store.write();
            let loaded = store.load(regions);
            (loaded, store.overlap_report())
        };
        self.machine.lock().clear_all();
        info!(
            "Loaded {} regions for {}/{}",
            loaded, self.project_id, self.audio_file_id
        );

        if !pairs.is_empty() {
            self.event_bus.publish(OverlapDetected {
                audio_file_id: self.audio_file_id.clone(),
                pairs,
            });
        }
        self.redraw.request();
        loaded
    }

    pub async fn load_from(&self, persistence: &dyn AnnotationPersistence) -> anyhow::Result<usize> {
        let annotations = persistence
            .load_annotations(&self.project_id, &self.audio_file_id)
            .await?;
        Ok(self.load_regions(annotations))
    }

    pub async fn save_to(&self, persistence: &dyn AnnotationPersistence) -> anyhow::Result<()> {
        let snapshot = self.annotations_snapshot();
        persistence
            .save_annotations(&self.project_id, &self.audio_file_id, snapshot)
            .await
    }

    /// All regions ordered by start time, ready to persist
    pub fn annotations_snapshot(&self) -> Vec<(RegionId, Region)> {
        self.store
            .read()
            .sorted()
            .into_iter()
            .map(|(id, region)| (id.clone(), region.clone()))
            .collect()
    }

    pub fn pointer_down(&self, event: PointerEvent) -> Option<InteractionResult> {
        self.dispatch(|machine, ctx| machine.pointer_down(ctx, event))
    }

    pub fn pointer_move(&self, event: PointerEvent) -> Option<InteractionResult> {
        self.dispatch(|machine, ctx| machine.pointer_move(ctx, event))
    }

    pub fn pointer_up(&self, event: PointerEvent) -> Option<InteractionResult> {
        self.dispatch(|machine, ctx| machine.pointer_up(ctx, event))
    }

    pub fn pointer_leave(&self) -> Option<InteractionResult> {
        let result = self.machine.lock().pointer_leave();
        if let Some(result) = &result {
            self.apply_result(result);
        }
        result
    }

    fn dispatch<F>(&self, f: F) -> Option<InteractionResult>
    where
        F: FnOnce(&mut InteractionStateMachine<H>, &InteractionContext<'_>) -> Option<InteractionResult>,
    {
        let transform = self.transform()?;
        let surface = *self.surface.read();
        let total_duration = self.viewport.read().total_duration();

        let result = {
            let store = self.store.read();
            let ctx = InteractionContext {
                store: &store,
                transform: &transform,
                surface,
                total_duration,
            };
            let mut machine = self.machine.lock();
            f(&mut machine, &ctx)
        };

        if let Some(result) = &result {
            self.apply_result(result);
        }
        result
    }

    fn apply_result(&self, result: &InteractionResult) {
        match result {
            InteractionResult::Committed { .. } => {
                let updates: Vec<(RegionId, Region)> = {
                    let mut store = self.store.write();
                    result
                        .region_updates()
                        .into_iter()
                        .filter(|(id, region)| match store.update(id, region.clone()) {
                            Ok(()) => true,
                            Err(e) => {
                                warn!("Failed to commit region {}: {}", id, e);
                                false
                            }
                        })
                        .collect()
                };
                debug!("Committed {} region update(s)", updates.len());
                if !updates.is_empty() {
                    self.event_bus.publish(RegionCommitted {
                        audio_file_id: self.audio_file_id.clone(),
                        updates,
                    });
                }
            }
            InteractionResult::SelectionStarted { .. } | InteractionResult::SelectionCleared => {
                self.selection_changed();
            }
            InteractionResult::Selection { complete: true, .. } => self.selection_changed(),
            _ => {}
        }
        self.redraw.request();
    }

    fn selection_changed(&self) {
        let selection = self.machine.lock().selection();
        self.event_bus.publish(SelectionChanged {
            audio_file_id: self.audio_file_id.clone(),
            selection,
        });
    }

    fn viewport_changed(&self) {
        let (range, pixels_per_second) = {
            let viewport = self.viewport.read();
            (viewport.range(), viewport.pixels_per_second())
        };
        self.event_bus.publish(ViewportChanged {
            audio_file_id: self.audio_file_id.clone(),
            range,
            pixels_per_second,
        });
        self.redraw.request();
    }

    fn update_viewport(&self, f: impl FnOnce(&mut Viewport) -> bool) -> bool {
        let changed = f(&mut self.viewport.write());
        if changed {
            self.viewport_changed();
        }
        changed
    }

    pub fn set_viewport(&self, start: f64, end: f64) -> bool {
        self.update_viewport(|viewport| viewport.set_viewport(start, end))
    }

    pub fn move_view(&self, new_start: f64) -> bool {
        self.update_viewport(|viewport| viewport.move_view(new_start))
    }

    pub fn zoom_view(&self, pixels_per_second: f64, focus_time: Option<f64>) -> bool {
        self.update_viewport(|viewport| viewport.zoom_view(pixels_per_second, focus_time))
    }

    pub fn zoom_in(&self, focus_time: Option<f64>) -> bool {
        self.update_viewport(|viewport| viewport.zoom_in_view(focus_time))
    }

    pub fn zoom_out(&self, focus_time: Option<f64>) -> bool {
        self.update_viewport(|viewport| viewport.zoom_out_view(focus_time))
    }

    pub fn follow_playhead(&self, time: f64) -> bool {
        self.update_viewport(|viewport| viewport.follow_playhead(time))
    }

    /// Turn the completed selection into a new region.
    ///
    /// Returns `Ok(None)` when nothing is selected.
    pub fn create_region_from_selection(
        &self,
        text: impl Into<String>,
    ) -> Result<Option<(RegionId, Region)>, RegionError> {
        let Some(range) = self.machine.lock().selection() else {
            return Ok(None);
        };

        let total = self.viewport.read().total_duration();
        let mut end = range.end.max(range.start + self.config.min_region_duration);
        if total > 0.0 {
            end = end.min(total);
        }
        let id = RegionId::generate();
        let region = Region::new(range.start, end, text);
        self.store.write().add(id.clone(), region.clone())?;
        self.machine.lock().clear_selection();
        info!("Created region {} at {}..{}", id, region.start, region.end);

        self.event_bus.publish(RegionCommitted {
            audio_file_id: self.audio_file_id.clone(),
            updates: vec![(id.clone(), region.clone())],
        });
        self.selection_changed();
        self.redraw.request();
        Ok(Some((id, region)))
    }

    pub fn update_text(&self, id: &RegionId, text: impl Into<String>) -> Result<(), RegionError> {
        let region = {
            let mut store = self.store.write();
            let mut region = store
                .get(id)
                .cloned()
                .ok_or_else(|| RegionError::NotFound(id.clone()))?;
            region.text = text.into();
            store.update(id, region.clone())?;
            region
        };
        self.event_bus.publish(RegionCommitted {
            audio_file_id: self.audio_file_id.clone(),
            updates: vec![(id.clone(), region)],
        });
        self.redraw.request();
        Ok(())
    }

    pub fn remove_region(&self, id: &RegionId) -> Option<Region> {
        let removed = self.store.write().remove(id)?;
        self.machine.lock().clear_all();
        self.event_bus.publish(RegionRemoved {
            audio_file_id: self.audio_file_id.clone(),
            id: id.clone(),
        });
        self.redraw.request();
        Some(removed)
    }

    pub fn split_region(&self, id: &RegionId, at: f64) -> Result<(RegionId, RegionId), RegionError> {
        let (first, second) = self.store.write().split(id, at)?;
        let updates = {
            let store = self.store.read();
            [&first, &second]
                .into_iter()
                .filter_map(|id| store.get(id).map(|region| (id.clone(), region.clone())))
                .collect()
        };
        self.machine.lock().clear_all();
        self.event_bus.publish(RegionRemoved {
            audio_file_id: self.audio_file_id.clone(),
            id: id.clone(),
        });
        self.event_bus.publish(RegionCommitted {
            audio_file_id: self.audio_file_id.clone(),
            updates,
        });
        self.redraw.request();
        Ok((first, second))
    }

    /// Merge `source` into its neighbor in `direction`.
    ///
    /// The store changes only after `api` confirms; any failure is published
    /// as [`MergeRejected`] and returned.
    pub async fn merge(
        &self,
        source: &RegionId,
        direction: MergeDirection,
        api: &dyn MergeApi,
    ) -> Result<MergedAnnotation, MergeError> {
        let result = self.merge_inner(source, direction, api).await;
        if let Err(e) = &result {
            warn!("Merge of {} to the {} failed: {}", source, direction, e);
            self.event_bus.publish(MergeRejected {
                audio_file_id: self.audio_file_id.clone(),
                source: source.clone(),
                direction,
                reason: e.to_string(),
            });
        }
        result
    }

    async fn merge_inner(
        &self,
        source: &RegionId,
        direction: MergeDirection,
        api: &dyn MergeApi,
    ) -> Result<MergedAnnotation, MergeError> {
        let plan = {
            let store = self.store.read();
            MergeCoordinator::plan(&store, &self.project_id, &self.audio_file_id, source, direction)?
        };

        let response = api
            .merge(&plan.request)
            .await
            .map_err(|e| MergeError::Api(e.to_string()))?;

        let merged = {
            let mut store = self.store.write();
            MergeCoordinator::apply(&mut store, &plan, response)?
        };
        self.machine.lock().clear_all();
        info!("Merged {} into {}", plan.source, merged.id);

        self.event_bus.publish(RegionsMerged {
            audio_file_id: self.audio_file_id.clone(),
            surviving: merged.id.clone(),
            removed: plan.source.clone(),
            region: merged.region.clone(),
        });
        self.redraw.request();
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::handler_from_fn;
    use crate::merge::{MergeRequest, MergeResponse};
    use crate::navigation::TimeRange;
    use async_trait::async_trait;

    fn session() -> AnnotationSession {
        let session = AnnotationSession::headless("p", "f", TimelineConfig::default());
        session.set_duration(60.0);
        session.set_surface(SurfaceSize::new(600.0, 1040.0));
        session.set_viewport(0.0, 10.0);
        session.load_regions(vec![
            (RegionId::from("a"), Region::new(2.0, 5.0, "foo")),
            (RegionId::from("b"), Region::new(5.0, 8.0, "bar")),
        ]);
        session
    }

    struct ConfirmingApi;

    #[async_trait]
    impl MergeApi for ConfirmingApi {
        async fn merge(&self, request: &MergeRequest) -> anyhow::Result<MergeResponse> {
            Ok(MergeResponse::ok(MergedAnnotation {
                id: request.target_id.clone(),
                region: Region::new(2.0, 8.0, "foobar"),
            }))
        }
    }

    struct UnreachableApi;

    #[async_trait]
    impl MergeApi for UnreachableApi {
        async fn merge(&self, _request: &MergeRequest) -> anyhow::Result<MergeResponse> {
            anyhow::bail!("connection refused")
        }
    }

    #[derive(Default)]
    struct RecordingPersistence {
        saved: Mutex<Vec<(RegionId, Region)>>,
    }

    #[async_trait]
    impl AnnotationPersistence for RecordingPersistence {
        async fn load_annotations(&self, _project_id: &str, _audio_file_id: &str) -> anyhow::Result<Vec<(RegionId, Region)>> {
            Ok(self.saved.lock().clone())
        }

        async fn save_annotations(
            &self,
            _project_id: &str,
            _audio_file_id: &str,
            annotations: Vec<(RegionId, Region)>,
        ) -> anyhow::Result<()> {
            *self.saved.lock() = annotations;
            Ok(())
        }
    }

    #[test]
    fn test_drag_commit_updates_store() {
        let session = session();
        let commits = Arc::new(Mutex::new(0));
        let counter = commits.clone();
        session.event_bus.subscribe::<RegionCommitted>(handler_from_fn(move |_| {
            *counter.lock() += 1;
        }));
        session.redraw.take();

        session.pointer_down(PointerEvent::new(100.0, 520.0));
        assert!(session.redraw.take());
        session.pointer_move(PointerEvent::new(100.0, 620.0));
        // live proposals do not touch the store
        assert_eq!(session.regions().get(&"a".into()).unwrap().end, 5.0);

        let result = session.pointer_up(PointerEvent::new(100.0, 620.0)).unwrap();
        assert!(result.needs_persist());
        assert_eq!(session.regions().get(&"a".into()), Some(&Region::new(2.0, 6.0, "foo")));
        assert_eq!(session.regions().get(&"b".into()), Some(&Region::new(6.0, 8.0, "bar")));
        assert_eq!(*commits.lock(), 1);
    }

    #[test]
    fn test_commit_publishes_only_accepted_updates() {
        let session = session();
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = published.clone();
        session.event_bus.subscribe::<RegionCommitted>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<RegionCommitted>() {
                sink.lock().push(event.updates.clone());
            }
        }));

        session.apply_result(&InteractionResult::Committed {
            id: "gone".into(),
            region: Region::new(0.0, 2.0, ""),
            adjacent: Some(("b".into(), Region::new(2.0, 8.0, "bar"))),
        });
        assert_eq!(
            *published.lock(),
            vec![vec![(RegionId::from("b"), Region::new(2.0, 8.0, "bar"))]]
        );

        session.apply_result(&InteractionResult::Committed {
            id: "gone".into(),
            region: Region::new(0.0, 2.0, ""),
            adjacent: None,
        });
        assert_eq!(published.lock().len(), 1);
        assert!(!session.regions().contains(&"gone".into()));
    }

    #[test]
    fn test_selection_becomes_region() {
        let session = session();
        session.pointer_down(PointerEvent::new(100.0, 920.0));
        session.pointer_move(PointerEvent::new(100.0, 1000.0));
        session.pointer_up(PointerEvent::new(100.0, 1000.0));
        assert_eq!(
            session.with_machine(|machine| machine.selection()),
            Some(TimeRange::new(9.0, 9.8))
        );

        let (id, region) = session.create_region_from_selection("new").unwrap().unwrap();
        assert_eq!(region.start, 9.0);
        assert!(session.regions().contains(&id));
        assert!(session.with_machine(|machine| machine.selection()).is_none());
        assert_eq!(session.create_region_from_selection("again").unwrap(), None);
    }

    #[test]
    fn test_pointer_ignored_without_audio() {
        let session = AnnotationSession::headless("p", "f", TimelineConfig::default());
        assert!(session.transform().is_none());
        assert_eq!(session.pointer_down(PointerEvent::new(10.0, 10.0)), None);
    }

    #[test]
    fn test_overlaps_reported_on_load() {
        let session = AnnotationSession::headless("p", "f", TimelineConfig::default());
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();
        session.event_bus.subscribe::<OverlapDetected>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<OverlapDetected>() {
                sink.lock().extend(event.pairs.clone());
            }
        }));
        let loaded = session.load_regions(vec![
            (RegionId::from("a"), Region::new(0.0, 4.0, "")),
            (RegionId::from("b"), Region::new(3.0, 6.0, "")),
            (RegionId::from("c"), Region::new(6.0, 7.0, "")),
        ]);
        assert_eq!(loaded, 3);
        assert_eq!(*reported.lock(), vec![(RegionId::from("a"), RegionId::from("b"))]);
    }

    #[test]
    fn test_viewport_changes_are_published() {
        let session = session();
        let ranges = Arc::new(Mutex::new(Vec::new()));
        let sink = ranges.clone();
        session.event_bus.subscribe::<ViewportChanged>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<ViewportChanged>() {
                sink.lock().push(event.range);
            }
        }));

        assert!(session.move_view(20.0));
        assert!(!session.set_viewport(50.0, 75.0));
        assert_eq!(*ranges.lock(), vec![TimeRange::new(20.0, 30.0)]);
    }

    #[tokio::test]
    async fn test_merge_applies_after_confirmation() {
        let session = session();
        let merged = session
            .merge(&"a".into(), MergeDirection::Right, &ConfirmingApi)
            .await
            .unwrap();
        assert_eq!(merged.id, RegionId::from("b"));

        let snapshot = session.annotations_snapshot();
        assert_eq!(snapshot, vec![(RegionId::from("b"), Region::new(2.0, 8.0, "foobar"))]);
    }

    #[tokio::test]
    async fn test_merge_failure_leaves_store() {
        let session = session();
        let rejected = Arc::new(Mutex::new(Vec::new()));
        let sink = rejected.clone();
        session.event_bus.subscribe::<MergeRejected>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<MergeRejected>() {
                sink.lock().push(event.reason.clone());
            }
        }));

        let err = session
            .merge(&"a".into(), MergeDirection::Right, &UnreachableApi)
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::Api(_)));

        let err = session
            .merge(&"a".into(), MergeDirection::Left, &ConfirmingApi)
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::NoAdjacentRegion { .. }));

        assert_eq!(session.regions().len(), 2);
        assert_eq!(rejected.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let persistence = RecordingPersistence::default();
        let session = session();
        session.split_region(&"b".into(), 6.5).unwrap();
        session.save_to(&persistence).await.unwrap();
        assert_eq!(persistence.saved.lock().len(), 3);

        let reopened = AnnotationSession::headless("p", "f", TimelineConfig::default());
        assert_eq!(reopened.load_from(&persistence).await.unwrap(), 3);
        assert!(reopened.regions().contains(&"b_2".into()));
    }
}
