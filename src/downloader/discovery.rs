//! Format discovery and engine maintenance.

use crate::engine::{EngineUpdate, FormatCatalog};
use crate::error::{Error, JobError, Result};

use super::MediaDownloader;

impl MediaDownloader {
    /// List the video-only and audio-only formats `url` offers
    ///
    /// The `format_id` of a returned format is what [`submit`](Self::submit)
    /// accepts as a selector.
    ///
    /// # Errors
    ///
    /// - [`JobError::EmptyInput`] if `url` is blank
    /// - [`Error::NotFound`] if the engine reports no formats
    /// - the engine's error if metadata cannot be fetched
    pub async fn fetch_formats(&self, url: &str) -> Result<FormatCatalog> {
        let url = url.trim();
        if url.is_empty() {
            return Err(JobError::EmptyInput {
                field: "source_url",
            }
            .into());
        }

        let info = self.engine.list_formats(url).await.inspect_err(|e| {
            tracing::warn!(url, error = %e, "format listing failed");
        })?;
        let catalog = FormatCatalog::from_info(url, info)?;

        tracing::debug!(
            url,
            video = catalog.video.len(),
            audio = catalog.audio.len(),
            "formats listed"
        );
        Ok(catalog)
    }

    /// Update the extraction engine to its latest release
    ///
    /// Refused while jobs are running, since a job's engine process may be
    /// using the binary being replaced.
    pub async fn update_engine(&self) -> Result<EngineUpdate> {
        let active = self.active_count();
        if active > 0 {
            return Err(Error::Other(format!(
                "cannot update {} while {active} job(s) are active",
                self.engine.name()
            )));
        }
        self.engine.update().await
    }
}
