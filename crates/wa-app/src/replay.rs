//! Scripted pointer sessions

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use wa_core::interaction::{ButtonTarget, InteractionResult};
use wa_core::{
    AnnotationEditHost, AnnotationPersistence, AnnotationSession, MergeApi, MergeDirection,
    PointerEvent, Region, RegionId, SurfaceSize, TimeRange,
};

/// A recorded gesture sequence against one surface
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    pub surface: SurfaceSize,

    /// Audio duration in seconds; defaults to just past the last region
    #[serde(default)]
    pub duration: Option<f64>,

    /// Initial visible window
    #[serde(default)]
    pub viewport: Option<TimeRange>,

    pub steps: Vec<ReplayStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReplayStep {
    Down(PointerEvent),
    Move(PointerEvent),
    Up(PointerEvent),
    Leave,
    /// Turn the current selection into a region
    Add {
        #[serde(default)]
        text: String,
    },
    Zoom {
        pixels_per_second: f64,
        #[serde(default)]
        focus: Option<f64>,
    },
}

/// Something the state machine asked the outside world to do
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    Seek(f64),
    AddSelection(TimeRange),
    Edit(RegionId),
    Delete(RegionId),
    Merge(RegionId, MergeDirection),
    EditText(RegionId),
}

/// Host that logs callbacks and queues them for the replay loop
#[derive(Debug, Clone, Default)]
pub struct ReplayHost {
    actions: Arc<Mutex<Vec<HostAction>>>,
}

impl ReplayHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<HostAction> {
        std::mem::take(&mut *self.actions.lock())
    }

    fn push(&self, action: HostAction) {
        debug!("Host action: {:?}", action);
        self.actions.lock().push(action);
    }
}

impl AnnotationEditHost for ReplayHost {
    fn seek(&mut self, time: f64) {
        self.push(HostAction::Seek(time));
    }

    fn on_add_selection(&mut self, range: TimeRange) {
        self.push(HostAction::AddSelection(range));
    }

    fn on_edit(&mut self, id: &RegionId) {
        self.push(HostAction::Edit(id.clone()));
    }

    fn on_delete(&mut self, id: &RegionId) {
        self.push(HostAction::Delete(id.clone()));
    }

    fn on_merge(&mut self, id: &RegionId, direction: MergeDirection) {
        self.push(HostAction::Merge(id.clone(), direction));
    }

    fn on_text_area_click(&mut self, id: &RegionId) {
        self.push(HostAction::EditText(id.clone()));
    }
}

/// Serializes fire-and-forget saves so they land in submission order
pub struct SaveQueue {
    tx: mpsc::UnboundedSender<Vec<(RegionId, Region)>>,
    handle: JoinHandle<usize>,
}

impl SaveQueue {
    pub fn spawn<P>(persistence: Arc<P>, project_id: String, audio_file_id: String) -> Self
    where
        P: AnnotationPersistence + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<(RegionId, Region)>>();
        let handle = tokio::spawn(async move {
            let mut saved = 0;
            while let Some(snapshot) = rx.recv().await {
                match persistence
                    .save_annotations(&project_id, &audio_file_id, snapshot)
                    .await
                {
                    Ok(()) => saved += 1,
                    Err(e) => error!("Failed to save annotations: {:#}", e),
                }
            }
            saved
        });
        Self { tx, handle }
    }

    pub fn submit(&self, snapshot: Vec<(RegionId, Region)>) {
        if self.tx.send(snapshot).is_err() {
            warn!("Save queue closed; dropping snapshot");
        }
    }

    /// Wait for queued saves; returns how many succeeded
    pub async fn finish(self) -> anyhow::Result<usize> {
        drop(self.tx);
        Ok(self.handle.await?)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub commits: usize,
    pub created: usize,
    pub removed: usize,
    pub merged: usize,
    pub seeks: usize,
    pub frames: usize,
}

pub struct Replayer<'a> {
    session: &'a AnnotationSession<ReplayHost>,
    host: ReplayHost,
    api: &'a dyn MergeApi,
    saves: &'a SaveQueue,
    summary: ReplaySummary,
}

impl<'a> Replayer<'a> {
    pub fn new(
        session: &'a AnnotationSession<ReplayHost>,
        host: ReplayHost,
        api: &'a dyn MergeApi,
        saves: &'a SaveQueue,
    ) -> Self {
        Self {
            session,
            host,
            api,
            saves,
            summary: ReplaySummary::default(),
        }
    }

    pub async fn run(mut self, script: ReplayScript, duration: f64) -> anyhow::Result<ReplaySummary> {
        self.session.set_surface(script.surface);
        self.session.set_duration(duration);
        if let Some(window) = script.viewport {
            self.session.set_viewport(window.start, window.end);
        }

        for step in script.steps {
            self.step(step).await?;
            self.summary.steps += 1;
            if self.session.redraw.take() {
                self.summary.frames += 1;
            }
        }
        Ok(self.summary)
    }

    async fn step(&mut self, step: ReplayStep) -> anyhow::Result<()> {
        let result = match step {
            ReplayStep::Down(event) => self.session.pointer_down(event),
            ReplayStep::Move(event) => self.session.pointer_move(event),
            ReplayStep::Up(event) => self.session.pointer_up(event),
            ReplayStep::Leave => self.session.pointer_leave(),
            ReplayStep::Add { text } => {
                self.create_from_selection(text)?;
                None
            }
            ReplayStep::Zoom {
                pixels_per_second,
                focus,
            } => {
                self.session.zoom_view(pixels_per_second, focus);
                None
            }
        };

        if let Some(result) = &result {
            self.log_result(result);
            if result.needs_persist() {
                self.summary.commits += 1;
                self.save();
            }
        }

        for action in self.host.drain() {
            self.perform(action).await?;
        }
        Ok(())
    }

    fn log_result(&self, result: &InteractionResult) {
        match result {
            InteractionResult::Committed { id, region, adjacent } => {
                info!(
                    "Committed {} {}..{}{}",
                    id,
                    region.start,
                    region.end,
                    adjacent
                        .as_ref()
                        .map(|(id, r)| format!(" with {} {}..{}", id, r.start, r.end))
                        .unwrap_or_default()
                );
            }
            InteractionResult::Selection { range, complete: true } => {
                info!("Selected {}..{}", range.start, range.end);
            }
            InteractionResult::ButtonClicked { kind, target } => {
                let target = match target {
                    ButtonTarget::Region(id) => id.to_string(),
                    ButtonTarget::Selection(range) => format!("{}..{}", range.start, range.end),
                };
                info!("Button {:?} on {}", kind, target);
            }
            other => debug!("{:?}", other),
        }
    }

    async fn perform(&mut self, action: HostAction) -> anyhow::Result<()> {
        match action {
            HostAction::Seek(time) => {
                self.summary.seeks += 1;
                info!("Seek to {:.3}s", time);
            }
            HostAction::AddSelection(_) => self.create_from_selection(String::new())?,
            HostAction::Delete(id) => {
                if self.session.remove_region(&id).is_some() {
                    info!("Deleted {}", id);
                    self.summary.removed += 1;
                    self.save();
                }
            }
            HostAction::Merge(id, direction) => {
                match self.session.merge(&id, direction, self.api).await {
                    Ok(merged) => {
                        info!("Merged {} into {}", id, merged.id);
                        self.summary.merged += 1;
                        self.save();
                    }
                    Err(e) => warn!("Merge failed: {}", e),
                }
            }
            HostAction::Edit(id) | HostAction::EditText(id) => {
                info!("Editing text of {}", id);
                self.session.with_machine(|machine| machine.finish_editing());
            }
        }
        Ok(())
    }

    fn create_from_selection(&mut self, text: String) -> anyhow::Result<()> {
        if let Some((id, region)) = self.session.create_region_from_selection(text)? {
            info!("Created {} {}..{}", id, region.start, region.end);
            self.summary.created += 1;
            self.save();
        }
        Ok(())
    }

    fn save(&self) {
        self.saves.submit(self.session.annotations_snapshot());
    }
}

/// Duration to assume when neither the script nor the command line gives one
pub fn fallback_duration(regions: &[(RegionId, Region)]) -> f64 {
    let last_end = regions
        .iter()
        .map(|(_, region)| region.end)
        .fold(0.0, f64::max);
    (last_end + 1.0).max(10.0)
}
