//! Persistence and the merge endpoint for annotation projects

pub mod annotation;
pub mod config;
pub mod merge_service;
pub mod storage;

use tokio::task::JoinError;
use thiserror::Error;

// Re-exports
pub use annotation::{Annotation, AnnotationMap};
pub use config::{ConfigError, WorkbenchConfig};
pub use merge_service::{merge_annotations, LocalMergeApi};
pub use storage::{JsonProjectStore, MemoryAnnotationStore, ProjectStore};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Annotation not found: {0}")]
    AnnotationNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    #[error("Other error: {0}")]
    Other(String),
}
