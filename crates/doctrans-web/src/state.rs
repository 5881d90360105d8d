use doctrans_core::{DocumentPipeline, QueueConfig, TaskQueue};
use std::sync::Arc;

/// Global application state shared by every route handler.
pub struct AppState {
    /// The orchestrator; all document operations go through it
    pub pipeline: Arc<DocumentPipeline>,
    /// Background submission path for translate workflows
    pub queue: TaskQueue,
    /// Whether unauthenticated callers fall back to the anonymous owner.
    ///
    /// Off by default: the fallback is a deployment looseness inherited
    /// from the original design, acceptable only for public demo setups.
    pub allow_anonymous: bool,
}

impl AppState {
    pub fn new(pipeline: Arc<DocumentPipeline>, allow_anonymous: bool) -> Self {
        let queue = TaskQueue::new(Arc::clone(&pipeline), QueueConfig::default());
        Self {
            pipeline,
            queue,
            allow_anonymous,
        }
    }
}
