//! Timeline interaction core for audio annotation
//!
//! This crate maps time to pixels under a zoomable viewport, stores the
//! annotated regions of one audio file, interprets pointer gestures against
//! them and coordinates merges of touching regions.

pub mod config;
pub mod error;
pub mod events;
pub mod interaction;
pub mod merge;
pub mod navigation;
pub mod regions;
pub mod state;

// Re-export commonly used types
pub use config::{Orientation, TimelineConfig};
pub use error::{MergeError, RegionError};
pub use interaction::{
    AnnotationEditHost, InteractionMode, InteractionResult, InteractionStateMachine, PointerEvent,
    SurfaceSize,
};
pub use merge::{MergeApi, MergeCoordinator, MergeDirection, MergeRequest, MergeResponse, MergedAnnotation};
pub use navigation::{CoordinateTransform, TimeRange, Viewport};
pub use persistence::AnnotationPersistence;
pub use regions::{Region, RegionId, RegionStore, Side};
pub use state::AnnotationSession;

pub mod persistence {
    use crate::regions::{Region, RegionId};

    /// Storage for one project's annotations, keyed by audio file
    #[async_trait::async_trait]
    pub trait AnnotationPersistence: Send + Sync {
        /// Load every annotation of an audio file
        async fn load_annotations(
            &self,
            project_id: &str,
            audio_file_id: &str,
        ) -> anyhow::Result<Vec<(RegionId, Region)>>;

        /// Replace the stored annotations of an audio file
        async fn save_annotations(
            &self,
            project_id: &str,
            audio_file_id: &str,
            annotations: Vec<(RegionId, Region)>,
        ) -> anyhow::Result<()>;
    }
}
