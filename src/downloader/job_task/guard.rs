//! RAII accounting for active jobs.
//!
//! Every registered job owns exactly one guard. Releasing it (normally or via
//! drop) unregisters the job, so the active count cannot leak when a task
//! panics or is aborted.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::registry::JobRegistry;
use crate::types::{CompletionEvent, Event, JobId, JobState};

/// Failure kind reported when a job task ends without finalizing
pub(crate) const ABORTED_KIND: &str = "aborted";

/// Unregisters a job exactly once
pub(crate) struct ActiveJobGuard {
    id: JobId,
    registry: Arc<JobRegistry>,
    event_tx: broadcast::Sender<Event>,
    completion_sent: bool,
    released: bool,
}

impl ActiveJobGuard {
    pub(crate) fn new(
        id: JobId,
        registry: Arc<JobRegistry>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            id,
            registry,
            event_tx,
            completion_sent: false,
            released: false,
        }
    }

    /// Record that the job's completion event has been emitted
    pub(crate) fn mark_completion_sent(&mut self) {
        self.completion_sent = true;
    }

    /// Unregister the job after normal finalization
    pub(crate) fn release(mut self) {
        self.released = true;
        self.unregister();
    }

    fn unregister(&self) {
        if self.registry.unregister(self.id) {
            self.event_tx.send(Event::Idle).ok();
        }
    }
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        tracing::error!(job_id = self.id.0, "job task ended without finalizing");

        if !self.completion_sent {
            let message = "job task aborted".to_string();
            self.registry.update(self.id, |job| {
                job.state = JobState::Failed;
                job.workspace = None;
                job.error_message = Some(message.clone());
                job.finished_at = Some(Utc::now());
            });
            self.event_tx
                .send(Event::StateChanged {
                    id: self.id,
                    state: JobState::Failed,
                })
                .ok();
            self.event_tx
                .send(Event::Completion(CompletionEvent {
                    job_id: self.id,
                    success: false,
                    result_file_name: None,
                    error_message: Some(message),
                    error_kind: Some(ABORTED_KIND.to_string()),
                }))
                .ok();
        }

        self.unregister();
    }
}
