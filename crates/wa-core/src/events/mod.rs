use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;

/// Session-wide event bus
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Annotation timeline events
pub mod events {
    use super::Event;
    use crate::merge::MergeDirection;
    use crate::navigation::TimeRange;
    use crate::regions::{Region, RegionId};

    /// A resize was committed to the store
    #[derive(Debug, Clone)]
    pub struct RegionCommitted {
        pub audio_file_id: String,
        pub updates: Vec<(RegionId, Region)>,
    }

    #[derive(Debug, Clone)]
    pub struct RegionRemoved {
        pub audio_file_id: String,
        pub id: RegionId,
    }

    /// Two regions were merged; `removed` no longer exists
    #[derive(Debug, Clone)]
    pub struct RegionsMerged {
        pub audio_file_id: String,
        pub surviving: RegionId,
        pub removed: RegionId,
        pub region: Region,
    }

    #[derive(Debug, Clone)]
    pub struct SelectionChanged {
        pub audio_file_id: String,
        pub selection: Option<TimeRange>,
    }

    #[derive(Debug, Clone)]
    pub struct ViewportChanged {
        pub audio_file_id: String,
        pub range: TimeRange,
        pub pixels_per_second: f64,
    }

    /// Overlapping regions found while loading
    #[derive(Debug, Clone)]
    pub struct OverlapDetected {
        pub audio_file_id: String,
        pub pairs: Vec<(RegionId, RegionId)>,
    }

    /// A merge could not be carried out; nothing was changed
    #[derive(Debug, Clone)]
    pub struct MergeRejected {
        pub audio_file_id: String,
        pub source: RegionId,
        pub direction: MergeDirection,
        pub reason: String,
    }

    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        RegionCommitted,
        RegionRemoved,
        RegionsMerged,
        SelectionChanged,
        ViewportChanged,
        OverlapDetected,
        MergeRejected
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_insert_with(Vec::new).push(handler);
    }

    /// Publish an event
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();

        if let Some(event_handlers) = handlers.get_mut(&type_id) {
            for handler in event_handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }

    /// Number of handlers registered for `E`
    pub fn handler_count<E: Event>(&self) -> usize {
        let type_id = std::any::TypeId::of::<E>();
        self.handlers.lock().get(&type_id).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}

/// Coalesces redraw requests into at most one pending frame
#[derive(Debug, Default)]
pub struct RedrawScheduler {
    requested: AtomicBool,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only for the request that armed the flag
    pub fn request(&self) -> bool {
        !self.requested.swap(true, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Called by the frame callback; true when a redraw was pending
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}
