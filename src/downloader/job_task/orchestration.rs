//! Job task orchestration -- top-level lifecycle for a single job.

use crate::destination::MediaKind;
use crate::engine::{EngineProgress, EngineRequest};
use crate::error::JobError;
use crate::types::JobState;
use crate::workspace::Workspace;

use super::context::{JobTaskContext, ProgressTracker};
use super::finalization::finalize_job;
use super::guard::ActiveJobGuard;

/// Core job task -- orchestrates the full lifecycle of a single job.
///
/// Phases:
/// 1. Move to Running, then create the private workspace
/// 2. Run the extraction engine, forwarding progress
/// 3. Locate the produced file
/// 4. Transfer it to the destination
/// 5. Destroy the workspace and emit the terminal events
pub(crate) async fn run_job_task(ctx: JobTaskContext, mut guard: ActiveJobGuard) {
    let mut workspace = None;
    let outcome = execute_job(&ctx, &mut workspace).await;
    finalize_job(&ctx, outcome, workspace, &mut guard).await;
    guard.release();
}

/// Phases 1-4; the workspace is handed back through `workspace` so it is
/// destroyed on every path.
async fn execute_job(
    ctx: &JobTaskContext,
    workspace: &mut Option<Workspace>,
) -> Result<String, JobError> {
    let id = ctx.id;
    let selector = ctx.request.engine_selector();

    // Phase 1: Workspace; the directory must never exist while Pending
    ctx.transition(JobState::Running, None);
    let ws = workspace.insert(Workspace::create(ctx.config.temp_dir(), id).await?);
    ctx.record_workspace(ws.path());

    // Phase 2: Engine
    let engine_request = EngineRequest {
        url: ctx.request.source_url.clone(),
        selector,
        output_dir: ws.path().to_path_buf(),
        output_template: ctx.config.download.output_template.clone(),
    };
    tracing::info!(
        job_id = id.0,
        engine = ctx.engine.name(),
        selector = %engine_request.selector,
        workspace = %ws.path().display(),
        "Starting extraction"
    );

    let mut tracker = ProgressTracker::default();
    ctx.engine
        .run(&engine_request, &mut |raw: EngineProgress| {
            ctx.report_progress(&mut tracker, raw)
        })
        .await
        .map_err(|e| {
            tracing::debug!(job_id = id.0, error = %e, "Extraction failed");
            JobError::Engine {
                message: e.to_string(),
            }
        })?;

    // Phase 3: Output lookup
    let output = ws
        .find_output(&ctx.config.download.partial_extensions)
        .await
        .map_err(|source| JobError::Workspace {
            path: ws.path().to_path_buf(),
            source,
        })?
        .ok_or_else(|| JobError::NoOutputProduced {
            workspace: ws.path().to_path_buf(),
        })?;
    let kind = MediaKind::classify(&output, ctx.request.is_audio_only());
    tracing::debug!(job_id = id.0, output = %output.display(), ?kind, "Extraction produced file");

    // Phase 4: Transfer
    ctx.transition(JobState::Transferring, Some(ws.path().to_path_buf()));
    ctx.writer
        .transfer(&output, ctx.request.destination.as_ref(), kind)
        .await
}
