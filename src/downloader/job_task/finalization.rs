//! Job finalization -- workspace teardown and terminal events.

use crate::error::JobError;
use crate::types::{CompletionEvent, Event, JobState};
use crate::workspace::Workspace;

use super::context::JobTaskContext;
use super::guard::ActiveJobGuard;

/// Tear down the workspace, then record and announce the outcome.
///
/// The workspace is gone before the terminal state becomes observable, and the
/// completion event is the last per-job event emitted.
pub(super) async fn finalize_job(
    ctx: &JobTaskContext,
    outcome: Result<String, JobError>,
    workspace: Option<Workspace>,
    guard: &mut ActiveJobGuard,
) {
    let id = ctx.id;

    if let Some(workspace) = workspace {
        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.destroy().await {
            tracing::error!(
                job_id = id.0,
                workspace = %path.display(),
                error = %e,
                "Failed to remove workspace"
            );
        }
    }

    let completion = match outcome {
        Ok(file_name) => {
            tracing::info!(job_id = id.0, file = %file_name, "Job completed");
            ctx.mark_terminal(JobState::Completed, Some(file_name.clone()), None);
            CompletionEvent::completed(id, file_name)
        }
        Err(error) => {
            tracing::warn!(
                job_id = id.0,
                kind = error.kind(),
                error = %error,
                "Job failed"
            );
            ctx.mark_terminal(JobState::Failed, None, Some(error.to_string()));
            CompletionEvent::failed(id, &error)
        }
    };

    ctx.emit(Event::Completion(completion));
    guard.mark_completion_sent();
}
