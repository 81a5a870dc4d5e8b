//! Job task execution -- one job from workspace creation to cleanup.
//!
//! Split into focused submodules:
//! - [`context`] - Shared state, state transitions, progress tracking
//! - [`guard`] - Active-job accounting that survives panics and aborts
//! - [`orchestration`] - Top-level job lifecycle
//! - [`finalization`] - Workspace teardown and terminal events

mod context;
mod finalization;
mod guard;
mod orchestration;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub(crate) use context::JobTaskContext;
pub(crate) use guard::ActiveJobGuard;
pub(crate) use orchestration::run_job_task;
