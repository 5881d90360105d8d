//! Background execution of the translate workflow.
//!
//! Alternate entry point to the same orchestrator contract: a submitted
//! workflow runs on a detached tokio task and is retried as a whole with
//! exponential backoff when it fails transiently. Callers keep a job
//! handle they can await for the final outcome.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pipeline::{DocumentPipeline, TranslateRequest, TranslatedDocument};

/// Retry policy for background workflows.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Total attempts per submitted workflow (first run included)
    pub max_attempts: u32,
    /// Base delay between attempts (exponential backoff)
    pub base_delay: Duration,
    /// Cap on the backoff delay
    pub max_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Handle to a submitted background workflow.
pub struct TranslationJob {
    pub id: Uuid,
    handle: JoinHandle<Result<TranslatedDocument>>,
}

impl TranslationJob {
    /// Wait for the workflow to finish and return its outcome.
    pub async fn wait(self) -> Result<TranslatedDocument> {
        self.handle
            .await
            .map_err(|e| Error::Storage(format!("background workflow aborted: {e}")))?
    }

    /// Whether the background task has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Submits translate workflows to the background.
pub struct TaskQueue {
    pipeline: Arc<DocumentPipeline>,
    config: QueueConfig,
}

impl TaskQueue {
    pub fn new(pipeline: Arc<DocumentPipeline>, config: QueueConfig) -> Self {
        Self { pipeline, config }
    }

    /// Run the translate workflow in the background.
    ///
    /// Transient failures (network, storage) are retried with exponential
    /// backoff up to the configured attempt cap; failures that retrying
    /// cannot fix (malformed input, missing fonts) are surfaced after the
    /// first attempt.
    pub fn submit(&self, request: TranslateRequest) -> TranslationJob {
        let id = Uuid::new_v4();
        let pipeline = Arc::clone(&self.pipeline);
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                match pipeline.translate_document(request.clone()).await {
                    Ok(outcome) => {
                        info!(job = %id, attempt, "background workflow succeeded");
                        return Ok(outcome);
                    }
                    Err(e) if e.is_transient() && attempt < config.max_attempts => {
                        let delay = config
                            .base_delay
                            .saturating_mul(1 << (attempt - 1))
                            .min(config.max_delay);
                        warn!(
                            job = %id,
                            attempt,
                            code = e.code(),
                            delay_ms = delay.as_millis() as u64,
                            "background workflow failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        warn!(job = %id, attempt, code = e.code(), "background workflow gave up");
                        return Err(e);
                    }
                }
            }
        });

        TranslationJob { id, handle }
    }
}
