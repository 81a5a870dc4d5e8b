//! Download orchestrator split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`submit`] - Input validation, registration and task spawning
//! - [`status`] - Snapshots, active-job accounting and idle notification
//! - [`discovery`] - Format listing and engine self-update
//! - [`job_task`] - Execution of one job from workspace creation to cleanup

mod discovery;
mod job_task;
mod status;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::Config;
use crate::destination::DestinationWriter;
use crate::engine::{ExtractionEngine, YtDlpEngine};
use crate::error::{Error, Result};
use crate::registry::JobRegistry;
use crate::types::Event;

/// Main orchestrator instance (cloneable - all fields are Arc-wrapped or cheap handles)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Extraction engine shared by all jobs
    pub(crate) engine: Arc<dyn ExtractionEngine>,
    /// Job table and active-job count
    pub(crate) registry: Arc<JobRegistry>,
    /// Copies finished files into destinations
    pub(crate) writer: DestinationWriter,
    /// Runtime jobs are spawned on, captured at construction
    pub(crate) runtime: tokio::runtime::Handle,
}

impl MediaDownloader {
    /// Create a new MediaDownloader with an explicit engine
    ///
    /// This validates the configuration, creates the workspace root directory
    /// and sets up the event broadcast channel. Jobs are spawned on the Tokio
    /// runtime this is called from.
    pub async fn new(config: Config, engine: Arc<dyn ExtractionEngine>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.temp_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create temp directory '{}': {}",
                        config.download.temp_dir.display(),
                        e
                    ),
                ))
            })?;

        // Each subscriber receives all events independently
        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.download.event_buffer);

        tracing::info!(
            engine = engine.name(),
            temp_dir = %config.download.temp_dir.display(),
            "Media downloader initialized"
        );

        Ok(Self {
            event_tx,
            config: Arc::new(config),
            engine,
            registry: Arc::new(JobRegistry::new()),
            writer: DestinationWriter,
            runtime: tokio::runtime::Handle::current(),
        })
    }

    /// Create a new MediaDownloader using the yt-dlp engine from configuration
    ///
    /// Uses `tools.ytdlp_path` when set, otherwise searches PATH if
    /// `tools.search_path` is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] if no yt-dlp binary can be located.
    pub async fn from_config(config: Config) -> Result<Self> {
        let engine = if let Some(ref path) = config.tools.ytdlp_path {
            YtDlpEngine::new(path.clone())
        } else if config.tools.search_path {
            YtDlpEngine::from_path().ok_or_else(|| {
                Error::ExternalTool("yt-dlp not found in PATH".to_string())
            })?
        } else {
            return Err(Error::ExternalTool(
                "no yt-dlp path configured and PATH search disabled".to_string(),
            ));
        };
        let engine = engine.with_extra_args(config.tools.extra_args.clone());
        Self::new(config, Arc::new(engine)).await
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than
    /// `download.event_buffer` events, it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, Event, MediaDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MediaDownloader::from_config(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             if let Event::Completion(done) = event {
    ///                 println!("job {} finished: {}", done.job_id, done.success);
    ///             }
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Job events as a `Stream`
    ///
    /// Same delivery as [`subscribe`](Self::subscribe); events a lagging consumer
    /// missed are skipped with a warning.
    pub fn event_stream(&self) -> impl futures::Stream<Item = Event> + Send + 'static {
        use tokio_stream::StreamExt;
        use tokio_stream::wrappers::BroadcastStream;
        use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

        BroadcastStream::new(self.subscribe()).filter_map(|result| match result {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event stream consumer lagged, events dropped");
                None
            }
        })
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
