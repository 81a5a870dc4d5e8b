//! Job task context -- shared state, state transitions and progress tracking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::destination::DestinationWriter;
use crate::engine::{EngineProgress, ExtractionEngine};
use crate::registry::JobRegistry;
use crate::types::{Event, JobId, JobRequest, JobState, ProgressEvent};

/// Everything a job task needs, detached from the `MediaDownloader` handle
pub(crate) struct JobTaskContext {
    pub(crate) id: JobId,
    pub(crate) request: JobRequest,
    pub(crate) config: Arc<Config>,
    pub(crate) engine: Arc<dyn ExtractionEngine>,
    pub(crate) registry: Arc<JobRegistry>,
    pub(crate) writer: DestinationWriter,
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl JobTaskContext {
    pub(super) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Move the job to a non-terminal state and announce it
    pub(super) fn transition(&self, state: JobState, workspace: Option<PathBuf>) {
        self.registry.update(self.id, |job| {
            job.state = state;
            job.workspace = workspace;
        });
        tracing::debug!(job_id = self.id.0, %state, "job state changed");
        self.emit(Event::StateChanged { id: self.id, state });
    }

    /// Attach the freshly created workspace to the snapshot
    pub(super) fn record_workspace(&self, path: &Path) {
        self.registry.update(self.id, |job| {
            job.workspace = Some(path.to_path_buf());
        });
    }

    /// Record the terminal state in the snapshot and announce it
    pub(super) fn mark_terminal(
        &self,
        state: JobState,
        result_file_name: Option<String>,
        error_message: Option<String>,
    ) {
        self.registry.update(self.id, |job| {
            job.state = state;
            job.workspace = None;
            job.eta_seconds = None;
            job.result_file_name = result_file_name;
            job.error_message = error_message;
            job.finished_at = Some(Utc::now());
        });
        self.emit(Event::StateChanged { id: self.id, state });
    }

    /// Forward an engine tick if the tracker accepts it
    pub(super) fn report_progress(&self, tracker: &mut ProgressTracker, raw: EngineProgress) {
        let Some((percent, eta_seconds)) = tracker.accept(raw) else {
            return;
        };
        self.registry.update(self.id, |job| {
            job.progress_percent = percent;
            job.eta_seconds = eta_seconds;
        });
        self.emit(Event::Progress(ProgressEvent::new(
            self.id,
            percent,
            eta_seconds,
        )));
    }
}

/// Normalizes engine ticks into a non-decreasing progress sequence
///
/// Values are clamped to 0..=100, a value below the last accepted one is raised
/// to it, and a tick identical to the last one is dropped.
#[derive(Debug, Default)]
pub(super) struct ProgressTracker {
    last: Option<(f32, Option<u64>)>,
}

impl ProgressTracker {
    pub(super) fn accept(&mut self, raw: EngineProgress) -> Option<(f32, Option<u64>)> {
        let mut percent = if raw.percent.is_nan() {
            0.0
        } else {
            raw.percent.clamp(0.0, 100.0)
        };

        if let Some((last_percent, last_eta)) = self.last {
            percent = percent.max(last_percent);
            if percent == last_percent && raw.eta_seconds == last_eta {
                return None;
            }
        }

        self.last = Some((percent, raw.eta_seconds));
        Some((percent, raw.eta_seconds))
    }
}
