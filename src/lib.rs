//! # media-dl
//!
//! Concurrent download orchestrator for remote media.
//!
//! A caller submits a source URL together with a video/audio stream pair and a
//! destination. Each submission becomes an independent job running on its own
//! task: the job gets a private workspace directory, drives the extraction
//! engine (by default the external `yt-dlp` binary), picks the produced file and
//! copies it into the destination, replacing any entry with the same name.
//!
//! ## Design Philosophy
//!
//! - **Non-blocking submission** - `submit` validates input and returns a job id immediately
//! - **Scoped workspaces** - a job's temporary directory is removed on every exit path
//! - **Event-driven** - consumers subscribe to progress and completion events
//! - **Host-aware** - an idle observer fires when the last active job finishes
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, DirectoryDestination, Event, MediaDownloader};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::from_config(Config::default()).await?;
//!
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let Event::Progress(progress) = event {
//!                 println!("#{}: {}", progress.job_id, progress.message);
//!             }
//!         }
//!     });
//!
//!     let destination = Arc::new(DirectoryDestination::new("downloads"));
//!     downloader.submit("https://example.com/watch?v=abc", "137", "140", destination)?;
//!
//!     media_dl::run_until_idle(downloader).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Preference persistence
pub mod db;
/// Destination storage and transfer
pub mod destination;
/// Download orchestrator (decomposed into focused submodules)
pub mod downloader;
/// Extraction engine contract and the yt-dlp adapter
pub mod engine;
/// Error types
pub mod error;
/// Job registry and active-job accounting
pub mod registry;
/// Core types and events
pub mod types;
/// Release feed and version comparison
pub mod update;
/// Per-job temporary workspaces
pub mod workspace;

// Re-export commonly used types
pub use config::Config;
pub use db::{Database, Selection};
pub use destination::{Destination, DestinationWriter, DirectoryDestination, MediaKind};
pub use downloader::MediaDownloader;
pub use engine::{
    EngineProgress, EngineRequest, EngineUpdate, ExtractionEngine, FormatCatalog, MediaFormat,
    MediaInfo, YtDlpEngine,
};
pub use error::{Error, JobError, Result};
pub use registry::JobRegistry;
pub use types::{CompletionEvent, DownloadJob, Event, JobId, JobRequest, JobState, ProgressEvent};
pub use update::{ReleaseInfo, UpdateChecker, UpdateStatus, is_newer};
pub use workspace::Workspace;

/// Why [`run_until_idle`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostExit {
    /// The last active job finished
    Idle,
    /// A termination signal arrived first; carries the signal name
    Signal(&'static str),
}

/// Keep the host alive while jobs are active.
///
/// Returns once the downloader has no active jobs, or earlier if a termination
/// signal arrives. Jobs still running at that point keep running on the runtime
/// until it is dropped.
///
/// - **Unix:** listens for SIGTERM and SIGINT. A signal whose handler cannot be
///   registered is ignored; if neither can be, Ctrl+C is used instead.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// If no signal source is available at all, only job completion ends the wait.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, HostExit, MediaDownloader, run_until_idle};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::from_config(Config::default()).await?;
///     // ... submit jobs ...
///     if let HostExit::Signal(name) = run_until_idle(downloader).await {
///         eprintln!("interrupted by {name}");
///     }
///     Ok(())
/// }
/// ```
pub async fn run_until_idle(downloader: MediaDownloader) -> HostExit {
    tokio::select! {
        _ = downloader.wait_until_idle() => {
            tracing::info!("No active jobs left, host may shut down");
            HostExit::Idle
        }
        name = termination_signal() => {
            tracing::info!(
                signal = name,
                active_jobs = downloader.active_count(),
                "Termination requested while jobs were active"
            );
            HostExit::Signal(name)
        }
    }
}

#[cfg(unix)]
async fn termination_signal() -> &'static str {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    async fn next(stream: Option<&mut Signal>) {
        if let Some(stream) = stream
            && stream.recv().await.is_some()
        {
            return;
        }
        std::future::pending::<()>().await
    }

    // Registration may fail in restricted environments (containers, tests)
    let mut sigterm = signal(SignalKind::terminate())
        .inspect_err(|e| tracing::warn!(error = %e, "Could not register SIGTERM handler"))
        .ok();
    let mut sigint = signal(SignalKind::interrupt())
        .inspect_err(|e| tracing::warn!(error = %e, "Could not register SIGINT handler"))
        .ok();

    if sigterm.is_none() && sigint.is_none() {
        return ctrl_c().await;
    }

    tokio::select! {
        _ = next(sigterm.as_mut()) => "SIGTERM",
        _ = next(sigint.as_mut()) => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C, waiting for jobs only");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
