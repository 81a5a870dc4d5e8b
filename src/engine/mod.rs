//! Extraction engine contract
//!
//! The engine is a black box: given a URL and a stream selector it places one
//! media file in the supplied directory, reporting progress along the way. The
//! orchestrator only trusts the engine's return value; progress is for display.
//!
//! Engines can also list the formats a URL offers and update themselves. Both
//! are optional and default to [`crate::Error::NotSupported`].

mod formats;
mod progress;
mod ytdlp;

pub use formats::{FormatCatalog, MediaFormat, MediaInfo};
pub use progress::parse_progress_line;
pub use ytdlp::YtDlpEngine;

use async_trait::async_trait;
use std::path::PathBuf;

/// One engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    /// Remote media URL
    pub url: String,
    /// Engine-facing selector, e.g. "137+140" or "140"
    pub selector: String,
    /// Directory the output must be written into (the job workspace)
    pub output_dir: PathBuf,
    /// Output naming template relative to `output_dir`
    pub output_template: String,
}

/// Progress report from the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineProgress {
    /// Percent complete as reported; may fall outside 0..=100
    pub percent: f32,
    /// Estimated seconds remaining, if known
    pub eta_seconds: Option<u64>,
}

/// Outcome of an engine self-update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineUpdate {
    /// A newer engine was installed; carries the engine's summary line
    Updated(String),
    /// The engine was already current; carries the engine's summary line
    UpToDate(String),
}

/// Trait for media extraction engines
///
/// `on_progress` may be called zero or more times, always on the task running
/// `run`, and never after `run` returns.
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::{EngineRequest, ExtractionEngine, YtDlpEngine};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// let request = EngineRequest {
///     url: "https://example.com/watch?v=abc".to_string(),
///     selector: "137+140".to_string(),
///     output_dir: "/tmp/job".into(),
///     output_template: "%(title)s.%(ext)s".to_string(),
/// };
/// engine
///     .run(&request, &mut |p: media_dl::EngineProgress| println!("{:.1}%", p.percent))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Fetch the selected streams into `request.output_dir`
    ///
    /// # Errors
    ///
    /// Returns an error on network or format failures, or when the engine
    /// itself cannot be executed.
    async fn run(
        &self,
        request: &EngineRequest,
        on_progress: &mut (dyn FnMut(EngineProgress) + Send),
    ) -> crate::Result<()>;

    /// Fetch metadata, including every available format, for `url`
    ///
    /// Nothing is downloaded.
    async fn list_formats(&self, _url: &str) -> crate::Result<MediaInfo> {
        Err(crate::Error::NotSupported(format!(
            "{} engine cannot list formats",
            self.name()
        )))
    }

    /// Update the engine itself to its latest release
    async fn update(&self) -> crate::Result<EngineUpdate> {
        Err(crate::Error::NotSupported(format!(
            "{} engine cannot update itself",
            self.name()
        )))
    }

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
