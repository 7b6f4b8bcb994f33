//! The interaction state machine

use tracing::{debug, trace};

use crate::config::TimelineConfig;
use crate::navigation::TimeRange;
use crate::regions::{RegionId, Side};

use super::buttons::{ActionButton, ButtonKind, ButtonLayout, ButtonTarget};
use super::drag::{snap_to_boundary, DragInfo};
use super::hit_test::{find_handle, hit_test, paired_neighbor, BodyArea, HitTarget};
use super::host::{AnnotationEditHost, NoopHost};
use super::{
    CursorHint, HoverState, InteractionContext, InteractionMode, InteractionResult, PointerEvent,
};

/// A selection drag between pointer down and pointer up
#[derive(Debug, Clone, PartialEq)]
struct SelectionGesture {
    anchor: f64,
    down_axis: f64,
    exceeded: bool,
    current: Option<TimeRange>,
}

/// Interprets pointer events against one audio file's regions.
///
/// The machine owns gesture state only. Region values come in through an
/// [`InteractionContext`] for every event and leave as
/// [`InteractionResult`]s; the caller commits them.
pub struct InteractionStateMachine<H = NoopHost> {
    config: TimelineConfig,
    host: H,
    mode: InteractionMode,
    drag: Option<DragInfo>,
    gesture: Option<SelectionGesture>,
    selection: Option<TimeRange>,
    hover: HoverState,
    editing: Option<RegionId>,
    buttons: Vec<ActionButton>,
    manual_buttons: bool,
}

impl InteractionStateMachine<NoopHost> {
    pub fn with_config(config: TimelineConfig) -> Self {
        Self::new(config, NoopHost)
    }
}

impl<H: AnnotationEditHost> InteractionStateMachine<H> {
    pub fn new(config: TimelineConfig, host: H) -> Self {
        Self {
            config,
            host,
            mode: InteractionMode::Idle,
            drag: None,
            gesture: None,
            selection: None,
            hover: HoverState::default(),
            editing: None,
            buttons: Vec::new(),
            manual_buttons: false,
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The completed selection, if any
    pub fn selection(&self) -> Option<TimeRange> {
        self.selection
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    pub fn drag(&self) -> Option<&DragInfo> {
        self.drag.as_ref()
    }

    pub fn editing(&self) -> Option<&RegionId> {
        self.editing.as_ref()
    }

    pub fn buttons(&self) -> &[ActionButton] {
        &self.buttons
    }

    /// Replace the computed button layout with caller-supplied buttons
    pub fn set_buttons(&mut self, buttons: Vec<ActionButton>) {
        self.buttons = buttons;
        self.manual_buttons = true;
    }

    /// Go back to laying out buttons from hover and selection
    pub fn use_computed_buttons(&mut self) {
        self.manual_buttons = false;
    }

    pub fn cursor(&self) -> CursorHint {
        if self.mode.is_dragging() || self.hover.handle.is_some() {
            CursorHint::Resize
        } else if self.hover.button.is_some() || self.hover.region.is_some() {
            CursorHint::Pointer
        } else {
            CursorHint::Default
        }
    }

    pub fn begin_editing(&mut self, id: RegionId) {
        self.drag = None;
        self.gesture = None;
        self.editing = Some(id);
        self.mode = InteractionMode::Editing;
    }

    /// Leave editing; returns the region that was being edited
    pub fn finish_editing(&mut self) -> Option<RegionId> {
        if self.mode == InteractionMode::Editing {
            self.mode = InteractionMode::Idle;
        }
        self.editing.take()
    }

    pub fn pointer_down(
        &mut self,
        ctx: &InteractionContext<'_>,
        event: PointerEvent,
    ) -> Option<InteractionResult> {
        if self.mode == InteractionMode::Editing {
            self.finish_editing();
        } else if self.mode != InteractionMode::Idle {
            // a previous gesture never saw its pointer up
            self.drag = None;
            self.gesture = None;
            self.mode = InteractionMode::Idle;
        }

        self.refresh_buttons(ctx);

        match hit_test(ctx, &self.config, &self.buttons, &event) {
            HitTarget::Button(button) => Some(self.click_button(button)),
            HitTarget::Handle(handle) => {
                let region = ctx.store.get(&handle.id)?.clone();
                let adjacent = paired_neighbor(ctx.store, &handle);
                self.mode = if adjacent.is_some() {
                    InteractionMode::DraggingBoth
                } else {
                    InteractionMode::DraggingSingle
                };
                let paired = adjacent.as_ref().map(|(id, _)| id.clone());
                debug!(
                    "Resize started on {} {:?} (paired: {:?})",
                    handle.id, handle.boundary, paired
                );
                self.drag = Some(DragInfo::new(handle.id.clone(), region, handle.boundary, adjacent));
                Some(InteractionResult::ResizeStarted {
                    id: handle.id,
                    boundary: handle.boundary,
                    paired,
                })
            }
            HitTarget::Body {
                id,
                area: BodyArea::Text,
            } => {
                self.begin_editing(id.clone());
                self.host.on_text_area_click(&id);
                Some(InteractionResult::TextAreaClicked { id })
            }
            HitTarget::Body {
                id,
                area: BodyArea::Waveform,
            } => {
                let time = ctx.store.get(&id)?.start;
                self.host.seek(time);
                Some(InteractionResult::Seek { time })
            }
            HitTarget::Empty { time } => {
                let axis = event.axis(self.config.orientation);
                let (anchor, _) = snap_to_boundary(
                    time,
                    axis,
                    ctx.store,
                    ctx.transform,
                    self.config.snap_threshold,
                    &[],
                );
                self.mode = InteractionMode::Creating;
                self.selection = None;
                self.gesture = Some(SelectionGesture {
                    anchor,
                    down_axis: axis,
                    exceeded: false,
                    current: None,
                });
                Some(InteractionResult::SelectionStarted { time: anchor })
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        ctx: &InteractionContext<'_>,
        event: PointerEvent,
    ) -> Option<InteractionResult> {
        match self.mode {
            InteractionMode::DraggingSingle | InteractionMode::DraggingBoth => {
                if self.track_drag(ctx, &event) {
                    let drag = self.drag.as_ref()?;
                    Some(InteractionResult::Annotation {
                        id: drag.id.clone(),
                        region: drag.proposed.clone(),
                        adjacent: drag.proposed_pair(),
                        snapped_to: drag.last_snap,
                    })
                } else {
                    None
                }
            }
            InteractionMode::Creating => {
                let axis = event.axis(self.config.orientation);
                let threshold = self.config.drag_threshold;
                let range = {
                    let gesture = self.gesture.as_mut()?;
                    if !gesture.exceeded {
                        if (axis - gesture.down_axis).abs() < threshold {
                            return None;
                        }
                        gesture.exceeded = true;
                    }
                    gesture.anchor
                };
                let time = self.snapped_time(ctx, axis, &[]).0;
                let range = TimeRange::normalized(range, time);
                let gesture = self.gesture.as_mut()?;
                if gesture.current == Some(range) {
                    return None;
                }
                gesture.current = Some(range);
                Some(InteractionResult::Selection {
                    range,
                    complete: false,
                })
            }
            InteractionMode::Editing => None,
            InteractionMode::Idle => {
                let hover = self.compute_hover(ctx, &event);
                if hover == self.hover {
                    return None;
                }
                trace!("Hover changed: {:?}", hover);
                self.hover = hover.clone();
                self.refresh_buttons(ctx);
                Some(InteractionResult::Hover(hover))
            }
        }
    }

    pub fn pointer_up(
        &mut self,
        ctx: &InteractionContext<'_>,
        event: PointerEvent,
    ) -> Option<InteractionResult> {
        match self.mode {
            InteractionMode::DraggingSingle | InteractionMode::DraggingBoth => {
                self.track_drag(ctx, &event);
                self.commit_drag()
            }
            InteractionMode::Creating => {
                self.mode = InteractionMode::Idle;
                let gesture = self.gesture.take()?;
                let axis = event.axis(self.config.orientation);

                let moved = gesture.exceeded
                    || (axis - gesture.down_axis).abs() >= self.config.drag_threshold;
                if !moved {
                    let time = ctx
                        .transform
                        .time_from_pixel(axis)
                        .clamp(0.0, ctx.total_duration.max(0.0));
                    self.host.seek(time);
                    return Some(InteractionResult::Seek { time });
                }

                let time = self.snapped_time(ctx, axis, &[]).0;
                let range = TimeRange::normalized(gesture.anchor, time);
                if range.duration() <= 0.0 {
                    self.selection = None;
                    return None;
                }
                debug!("Selection completed: {}..{}", range.start, range.end);
                self.selection = Some(range);
                self.refresh_buttons(ctx);
                Some(InteractionResult::Selection {
                    range,
                    complete: true,
                })
            }
            InteractionMode::Editing | InteractionMode::Idle => None,
        }
    }

    /// The pointer left the surface. An in-progress resize keeps its last
    /// proposal; an in-progress selection is dropped.
    pub fn pointer_leave(&mut self) -> Option<InteractionResult> {
        let had_hover = !self.hover.is_empty();
        self.hover = HoverState::default();

        match self.mode {
            InteractionMode::Creating => {
                self.gesture = None;
                self.selection = None;
                self.mode = InteractionMode::Idle;
                Some(InteractionResult::SelectionCleared)
            }
            InteractionMode::DraggingSingle | InteractionMode::DraggingBoth => self.commit_drag(),
            InteractionMode::Idle if had_hover => {
                if !self.manual_buttons {
                    self.buttons.retain(|b| b.kind == ButtonKind::Add);
                }
                Some(InteractionResult::Hover(HoverState::default()))
            }
            _ => None,
        }
    }

    /// Forget the selection and any selection drag
    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.gesture = None;
        if self.mode == InteractionMode::Creating {
            self.mode = InteractionMode::Idle;
        }
        if !self.manual_buttons {
            self.buttons.retain(|b| b.kind != ButtonKind::Add);
        }
    }

    /// Return to idle without touching hover state
    pub fn clear_interaction_state(&mut self) {
        self.clear_selection();
        self.drag = None;
        self.editing = None;
        self.mode = InteractionMode::Idle;
    }

    pub fn clear_all(&mut self) {
        self.clear_interaction_state();
        self.hover = HoverState::default();
        if !self.manual_buttons {
            self.buttons.clear();
        }
    }

    fn click_button(&mut self, button: ActionButton) -> InteractionResult {
        debug!("Button {:?} clicked for {:?}", button.kind, button.target);
        match (&button.kind, &button.target) {
            (ButtonKind::Add, ButtonTarget::Selection(range)) => self.host.on_add_selection(*range),
            (ButtonKind::Edit, ButtonTarget::Region(id)) => self.host.on_edit(id),
            (ButtonKind::Delete, ButtonTarget::Region(id)) => self.host.on_delete(id),
            (kind, ButtonTarget::Region(id)) => {
                if let Some(direction) = kind.merge_direction() {
                    self.host.on_merge(id, direction);
                }
            }
            _ => {}
        }
        InteractionResult::ButtonClicked {
            kind: button.kind,
            target: button.target,
        }
    }

    /// Update the drag proposal from the pointer; returns whether it changed
    fn track_drag(&mut self, ctx: &InteractionContext<'_>, event: &PointerEvent) -> bool {
        let axis = event.axis(self.config.orientation);
        let Some(drag) = self.drag.as_ref() else {
            return false;
        };
        let mut exclude = vec![drag.id.clone()];
        if let Some(id) = drag.adjacent_id() {
            exclude.push(id.clone());
        }
        let excluded: Vec<&RegionId> = exclude.iter().collect();
        let (time, snapped_to) = self.snapped_time(ctx, axis, &excluded);

        let min_duration = self.config.min_region_duration;
        match self.drag.as_mut() {
            Some(drag) => {
                drag.last_snap = snapped_to;
                drag.propose(time, ctx.total_duration, min_duration)
            }
            None => false,
        }
    }

    fn commit_drag(&mut self) -> Option<InteractionResult> {
        self.mode = InteractionMode::Idle;
        let drag = self.drag.take()?;
        if !drag.has_changed() {
            return None;
        }
        debug!(
            "Resize committed on {}: {}..{}",
            drag.id, drag.proposed.start, drag.proposed.end
        );
        let adjacent = drag.proposed_pair();
        Some(InteractionResult::Committed {
            id: drag.id,
            region: drag.proposed,
            adjacent,
        })
    }

    fn snapped_time(
        &self,
        ctx: &InteractionContext<'_>,
        axis: f64,
        exclude: &[&RegionId],
    ) -> (f64, Option<f64>) {
        let time = ctx
            .transform
            .time_from_pixel(axis)
            .clamp(0.0, ctx.total_duration.max(0.0));
        snap_to_boundary(
            time,
            axis,
            ctx.store,
            ctx.transform,
            self.config.snap_threshold,
            exclude,
        )
    }

    fn compute_hover(&self, ctx: &InteractionContext<'_>, event: &PointerEvent) -> HoverState {
        let orientation = self.config.orientation;
        let (x, y) = event.content_position(orientation);
        if let Some(button) = self.buttons.iter().find(|b| b.bounds.contains(x, y)) {
            let region = match &button.target {
                ButtonTarget::Region(id) => Some(id.clone()),
                ButtonTarget::Selection(_) => None,
            };
            return HoverState {
                region,
                button: Some(button.kind),
                ..HoverState::default()
            };
        }

        let axis = event.axis(orientation);
        let time = ctx.transform.time_from_pixel(axis);
        let body = ctx.store.find_at_time(time).map(|(id, _)| id.clone());

        match find_handle(ctx.store, ctx.transform, axis, self.config.handle_tolerance) {
            Some(handle) => HoverState {
                region: body.or_else(|| Some(handle.id.clone())),
                adjacent: paired_neighbor(ctx.store, &handle).map(|(id, _)| id),
                handle: Some(handle),
                button: None,
            },
            None => HoverState {
                region: body,
                ..HoverState::default()
            },
        }
    }

    fn refresh_buttons(&mut self, ctx: &InteractionContext<'_>) {
        if self.manual_buttons {
            return;
        }
        let layout = ButtonLayout::new(&self.config, ctx.transform, ctx.surface);
        let hovered = self
            .hover
            .region
            .as_ref()
            .and_then(|id| ctx.store.get(id).map(|region| (id, region)));
        let (left, right) = match &self.hover.region {
            Some(id) => (
                ctx.store.find_adjacent(id, Side::Before).is_some(),
                ctx.store.find_adjacent(id, Side::After).is_some(),
            ),
            None => (false, false),
        };
        self.buttons = layout.compute(hovered, left, right, self.selection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{Boundary, SurfaceSize};
    use crate::merge::MergeDirection;
    use crate::navigation::CoordinateTransform;
    use crate::regions::{Region, RegionStore};

    #[derive(Default)]
    struct RecordingHost {
        seeks: Vec<f64>,
        deleted: Vec<RegionId>,
        merged: Vec<(RegionId, MergeDirection)>,
        text_clicks: Vec<RegionId>,
        added: Vec<TimeRange>,
    }

    impl AnnotationEditHost for RecordingHost {
        fn seek(&mut self, time: f64) {
            self.seeks.push(time);
        }

        fn on_add_selection(&mut self, range: TimeRange) {
            self.added.push(range);
        }

        fn on_delete(&mut self, id: &RegionId) {
            self.deleted.push(id.clone());
        }

        fn on_merge(&mut self, id: &RegionId, direction: MergeDirection) {
            self.merged.push((id.clone(), direction));
        }

        fn on_text_area_click(&mut self, id: &RegionId) {
            self.text_clicks.push(id.clone());
        }
    }

    fn pair_store() -> RegionStore {
        let mut store = RegionStore::new();
        store.add("a".into(), Region::new(2.0, 5.0, "foo")).unwrap();
        store.add("b".into(), Region::new(5.0, 8.0, "bar")).unwrap();
        store
    }

    // 100 px per second, t=0 at y=20
    fn transform() -> CoordinateTransform {
        CoordinateTransform::new(0.0, 10.0, 1040.0, 20.0).unwrap()
    }

    fn ctx<'a>(store: &'a RegionStore, transform: &'a CoordinateTransform) -> InteractionContext<'a> {
        InteractionContext {
            store,
            transform,
            surface: SurfaceSize::new(600.0, 1040.0),
            total_duration: 60.0,
        }
    }

    fn machine() -> InteractionStateMachine<RecordingHost> {
        InteractionStateMachine::new(TimelineConfig::default(), RecordingHost::default())
    }

    fn at(y: f64) -> PointerEvent {
        PointerEvent::new(100.0, y)
    }

    #[test]
    fn test_drag_shared_boundary_moves_both() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        let started = machine.pointer_down(&ctx, at(520.0));
        assert_eq!(
            started,
            Some(InteractionResult::ResizeStarted {
                id: "a".into(),
                boundary: Boundary::End,
                paired: Some("b".into()),
            })
        );
        assert_eq!(machine.mode(), InteractionMode::DraggingBoth);

        match machine.pointer_move(&ctx, at(620.0)) {
            Some(InteractionResult::Annotation { id, region, adjacent, .. }) => {
                assert_eq!(id, RegionId::from("a"));
                assert_eq!(region, Region::new(2.0, 6.0, "foo"));
                assert_eq!(adjacent, Some((RegionId::from("b"), Region::new(6.0, 8.0, "bar"))));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(machine.pointer_move(&ctx, at(620.0)), None);

        let committed = machine.pointer_up(&ctx, at(620.0)).unwrap();
        assert!(committed.needs_persist());
        assert_eq!(
            committed.region_updates(),
            vec![
                (RegionId::from("a"), Region::new(2.0, 6.0, "foo")),
                (RegionId::from("b"), Region::new(6.0, 8.0, "bar")),
            ]
        );
        assert_eq!(machine.mode(), InteractionMode::Idle);
        assert!(machine.drag().is_none());
        // the store itself is untouched
        assert_eq!(store.get(&"a".into()).unwrap().end, 5.0);
    }

    #[test]
    fn test_drag_shared_start_moves_both() {
        let mut store = RegionStore::new();
        store.add("a".into(), Region::new(2.0, 4.992, "foo")).unwrap();
        store.add("b".into(), Region::new(5.0, 8.0, "bar")).unwrap();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        // b's start is drawn at 520, a's end one pixel earlier
        assert_eq!(
            machine.pointer_down(&ctx, at(520.0)),
            Some(InteractionResult::ResizeStarted {
                id: "b".into(),
                boundary: Boundary::Start,
                paired: Some("a".into()),
            })
        );
        assert_eq!(machine.mode(), InteractionMode::DraggingBoth);

        machine.pointer_move(&ctx, at(470.0));
        let committed = machine.pointer_up(&ctx, at(470.0)).unwrap();
        let updates = committed.region_updates();
        assert_eq!(updates.len(), 2);
        let moved = |id: &str| {
            updates
                .iter()
                .find(|(key, _)| key.as_str() == id)
                .map(|(_, region)| region.clone())
                .unwrap()
        };
        assert_eq!(moved("b"), Region::new(4.5, 8.0, "bar"));
        assert_eq!(moved("a"), Region::new(2.0, 4.5, "foo"));
        assert_eq!(moved("a").end, moved("b").start);
    }

    #[test]
    fn test_snap_at_exact_threshold() {
        let mut store = RegionStore::new();
        store.add("a".into(), Region::new(2.0, 5.0, "")).unwrap();
        store.add("c".into(), Region::new(6.0, 8.0, "")).unwrap();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        machine.pointer_down(&ctx, at(520.0));
        machine.pointer_move(&ctx, at(615.0));
        let drag = machine.drag().unwrap();
        assert_eq!(drag.proposed.end, 6.0);
        assert_eq!(drag.last_snap, Some(6.0));
    }

    #[test]
    fn test_single_drag_snaps_and_leaves_others() {
        let mut store = RegionStore::new();
        store.add("a".into(), Region::new(2.0, 5.0, "")).unwrap();
        store.add("c".into(), Region::new(6.0, 8.0, "")).unwrap();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        machine.pointer_down(&ctx, at(520.0));
        assert_eq!(machine.mode(), InteractionMode::DraggingSingle);

        match machine.pointer_move(&ctx, at(617.0)) {
            Some(InteractionResult::Annotation {
                region, adjacent, snapped_to, ..
            }) => {
                assert_eq!(region.end, 6.0);
                assert_eq!(snapped_to, Some(6.0));
                assert!(adjacent.is_none());
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let committed = machine.pointer_up(&ctx, at(617.0)).unwrap();
        let updates = committed.region_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, RegionId::from("a"));
    }

    #[test]
    fn test_snap_depends_on_zoom() {
        let mut store = RegionStore::new();
        store.add("a".into(), Region::new(1.0, 2.0, "")).unwrap();
        store.add("c".into(), Region::new(3.0, 4.0, "")).unwrap();

        // grab a's end and move to 0.04 s before c's start
        let zoomed_out = transform();
        let ctx_out = ctx(&store, &zoomed_out);
        let mut machine = machine();
        machine.pointer_down(&ctx_out, at(220.0));
        machine.pointer_move(&ctx_out, at(zoomed_out.pixel_from_time(2.96)));
        assert_eq!(machine.drag().unwrap().proposed.end, 3.0);
        machine.pointer_up(&ctx_out, at(zoomed_out.pixel_from_time(2.96)));

        // at 200 px/s the same gap is 8 px
        let zoomed_in = CoordinateTransform::new(0.0, 5.0, 1040.0, 20.0).unwrap();
        let ctx_in = ctx(&store, &zoomed_in);
        machine.pointer_down(&ctx_in, at(zoomed_in.pixel_from_time(2.0)));
        machine.pointer_move(&ctx_in, at(zoomed_in.pixel_from_time(2.96)));
        let end = machine.drag().unwrap().proposed.end;
        assert!((end - 2.96).abs() < 1e-9);
        assert_eq!(machine.drag().unwrap().last_snap, None);
    }

    #[test]
    fn test_small_gesture_seeks() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        assert_eq!(
            machine.pointer_down(&ctx, at(120.0)),
            Some(InteractionResult::SelectionStarted { time: 1.0 })
        );
        assert_eq!(machine.pointer_move(&ctx, at(125.0)), None);
        match machine.pointer_up(&ctx, at(125.0)) {
            Some(InteractionResult::Seek { time }) => assert!((time - 1.05).abs() < 1e-9),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(machine.host().seeks.len(), 1);
        assert!(machine.selection().is_none());
    }

    #[test]
    fn test_large_gesture_selects() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        machine.pointer_down(&ctx, at(120.0));
        assert_eq!(
            machine.pointer_move(&ctx, at(180.0)),
            Some(InteractionResult::Selection {
                range: TimeRange::new(1.0, 1.6),
                complete: false,
            })
        );
        assert_eq!(
            machine.pointer_up(&ctx, at(180.0)),
            Some(InteractionResult::Selection {
                range: TimeRange::new(1.0, 1.6),
                complete: true,
            })
        );
        assert_eq!(machine.selection(), Some(TimeRange::new(1.0, 1.6)));
        assert!(machine.host().seeks.is_empty());
        assert!(machine.buttons().iter().any(|b| b.kind == ButtonKind::Add));
    }

    #[test]
    fn test_gesture_at_exact_threshold_selects() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);

        let mut machine = machine();
        machine.pointer_down(&ctx, at(120.0));
        assert_eq!(
            machine.pointer_move(&ctx, at(130.0)),
            Some(InteractionResult::Selection {
                range: TimeRange::new(1.0, 1.1),
                complete: false,
            })
        );
        machine.pointer_up(&ctx, at(130.0));
        assert_eq!(machine.selection(), Some(TimeRange::new(1.0, 1.1)));
        assert!(machine.host().seeks.is_empty());

        // released without an intermediate move
        let mut machine = self::machine();
        machine.pointer_down(&ctx, at(120.0));
        assert_eq!(
            machine.pointer_up(&ctx, at(130.0)),
            Some(InteractionResult::Selection {
                range: TimeRange::new(1.0, 1.1),
                complete: true,
            })
        );
        assert!(machine.host().seeks.is_empty());
    }

    #[test]
    fn test_add_button_reports_selection() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        machine.pointer_down(&ctx, at(120.0));
        machine.pointer_up(&ctx, at(180.0));

        // add button sits at y = 120 + 8, x = 350 - 16 - 8
        let result = machine.pointer_down(&ctx, PointerEvent::new(330.0, 130.0));
        assert_eq!(
            result,
            Some(InteractionResult::ButtonClicked {
                kind: ButtonKind::Add,
                target: ButtonTarget::Selection(TimeRange::new(1.0, 1.6)),
            })
        );
        assert_eq!(machine.host().added, vec![TimeRange::new(1.0, 1.6)]);
        assert_eq!(machine.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_hover_tracks_region_and_handle() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        match machine.pointer_move(&ctx, at(320.0)) {
            Some(InteractionResult::Hover(hover)) => {
                assert_eq!(hover.region, Some("a".into()));
                assert!(hover.handle.is_none());
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(machine.pointer_move(&ctx, at(321.0)), None);
        assert_eq!(machine.cursor(), CursorHint::Pointer);

        machine.pointer_move(&ctx, at(518.0));
        let hover = machine.hover();
        assert_eq!(hover.handle.as_ref().map(|h| h.boundary), Some(Boundary::End));
        assert_eq!(hover.adjacent, Some("b".into()));
        assert_eq!(machine.cursor(), CursorHint::Resize);

        assert_eq!(
            machine.pointer_leave(),
            Some(InteractionResult::Hover(HoverState::default()))
        );
        assert_eq!(machine.cursor(), CursorHint::Default);
    }

    #[test]
    fn test_region_buttons_dispatch() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        machine.pointer_move(&ctx, at(320.0));
        let kinds: Vec<_> = machine.buttons().iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![ButtonKind::Delete, ButtonKind::Edit, ButtonKind::MergeRight]);

        // delete at x 576..592, y 228..244
        let result = machine.pointer_down(&ctx, PointerEvent::new(580.0, 230.0));
        assert_eq!(
            result,
            Some(InteractionResult::ButtonClicked {
                kind: ButtonKind::Delete,
                target: ButtonTarget::Region("a".into()),
            })
        );
        assert_eq!(machine.host().deleted, vec![RegionId::from("a")]);

        // merge right sits two steps inward, after edit
        machine.pointer_down(&ctx, PointerEvent::new(540.0, 230.0));
        assert_eq!(
            machine.host().merged,
            vec![(RegionId::from("a"), MergeDirection::Right)]
        );
    }

    #[test]
    fn test_manual_buttons_override_layout() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        machine.set_buttons(vec![ActionButton {
            kind: ButtonKind::Edit,
            bounds: crate::interaction::ButtonBounds {
                x: 0.0,
                y: 0.0,
                width: 30.0,
                height: 30.0,
            },
            target: ButtonTarget::Region("b".into()),
        }]);
        machine.pointer_move(&ctx, at(320.0));
        assert_eq!(machine.buttons().len(), 1);

        let result = machine.pointer_down(&ctx, PointerEvent::new(10.0, 10.0));
        assert!(matches!(
            result,
            Some(InteractionResult::ButtonClicked {
                kind: ButtonKind::Edit,
                ..
            })
        ));
    }

    #[test]
    fn test_body_click_seeks_to_region_start() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        assert_eq!(
            machine.pointer_down(&ctx, at(720.0)),
            Some(InteractionResult::Seek { time: 5.0 })
        );
        assert_eq!(machine.host().seeks, vec![5.0]);
        assert_eq!(machine.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_text_area_enters_editing() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        assert_eq!(
            machine.pointer_down(&ctx, PointerEvent::new(400.0, 320.0)),
            Some(InteractionResult::TextAreaClicked { id: "a".into() })
        );
        assert_eq!(machine.mode(), InteractionMode::Editing);
        assert_eq!(machine.editing(), Some(&RegionId::from("a")));
        assert_eq!(machine.pointer_move(&ctx, at(700.0)), None);

        // clicking elsewhere leaves editing and is handled normally
        assert_eq!(
            machine.pointer_down(&ctx, at(320.0)),
            Some(InteractionResult::Seek { time: 2.0 })
        );
        assert_eq!(machine.mode(), InteractionMode::Idle);
        assert!(machine.editing().is_none());
    }

    #[test]
    fn test_leave_drops_selection_but_commits_resize() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        machine.pointer_down(&ctx, at(120.0));
        machine.pointer_move(&ctx, at(180.0));
        assert_eq!(machine.pointer_leave(), Some(InteractionResult::SelectionCleared));
        assert_eq!(machine.mode(), InteractionMode::Idle);
        assert!(machine.selection().is_none());

        machine.pointer_down(&ctx, at(220.0));
        machine.pointer_move(&ctx, at(170.0));
        match machine.pointer_leave() {
            Some(InteractionResult::Committed { region, .. }) => assert_eq!(region.start, 1.5),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(machine.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_unchanged_resize_yields_nothing() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        machine.pointer_down(&ctx, at(220.0));
        assert_eq!(machine.pointer_up(&ctx, at(220.0)), None);
        assert_eq!(machine.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_clearing_levels() {
        let store = pair_store();
        let transform = transform();
        let ctx = ctx(&store, &transform);
        let mut machine = machine();

        machine.pointer_move(&ctx, at(320.0));
        machine.pointer_down(&ctx, at(120.0));
        machine.pointer_up(&ctx, at(180.0));
        assert!(machine.selection().is_some());

        machine.clear_selection();
        assert!(machine.selection().is_none());
        assert!(machine.hover().region.is_some());

        machine.pointer_down(&ctx, at(220.0));
        machine.clear_interaction_state();
        assert_eq!(machine.mode(), InteractionMode::Idle);
        assert!(machine.drag().is_none());
        assert!(machine.hover().region.is_some());

        machine.clear_all();
        assert!(machine.hover().is_empty());
        assert!(machine.buttons().is_empty());
    }
}
