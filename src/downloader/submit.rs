//! Job submission: validation, registration and task spawning.

use std::sync::Arc;

use crate::destination::Destination;
use crate::error::{JobError, Result};
use crate::types::{DownloadJob, Event, JobId, JobRequest};

use super::MediaDownloader;
use super::job_task::{ActiveJobGuard, JobTaskContext, run_job_task};

impl MediaDownloader {
    /// Submit a job
    ///
    /// Returns immediately with a fresh job id; the job runs on its own task.
    /// Submission never waits on network or disk I/O.
    ///
    /// `video_selector` may be `"none"` to fetch the audio stream only.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::EmptyInput`] if the URL or a selector is empty.
    /// No job is created in that case.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use media_dl::{Config, DirectoryDestination, MediaDownloader};
    /// # use std::sync::Arc;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let downloader = MediaDownloader::from_config(Config::default()).await?;
    /// let destination = Arc::new(DirectoryDestination::new("/home/me/Music"));
    ///
    /// // Audio only
    /// let id = downloader.submit("https://example.com/watch?v=abc", "none", "140", destination)?;
    /// println!("submitted job {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn submit(
        &self,
        source_url: impl Into<String>,
        video_selector: impl Into<String>,
        audio_selector: impl Into<String>,
        destination: Arc<dyn Destination>,
    ) -> Result<JobId> {
        self.submit_request(JobRequest::new(
            source_url,
            video_selector,
            audio_selector,
            destination,
        ))
    }

    /// Submit a prepared [`JobRequest`]
    ///
    /// See [`submit`](Self::submit).
    pub fn submit_request(&self, request: JobRequest) -> Result<JobId> {
        validate_request(&request)?;

        let id = self.registry.allocate_id();
        self.registry.register(DownloadJob::pending(id, &request));

        tracing::info!(
            job_id = id.0,
            url = %request.source_url,
            selector = %request.engine_selector(),
            destination = %request.destination.describe(),
            "Job submitted"
        );
        self.emit_event(Event::Submitted {
            id,
            url: request.source_url.clone(),
        });

        // Created before spawning so the job is released even if the task never runs
        let guard = ActiveJobGuard::new(id, self.registry.clone(), self.event_tx.clone());
        let ctx = JobTaskContext {
            id,
            request,
            config: self.config.clone(),
            engine: self.engine.clone(),
            registry: self.registry.clone(),
            writer: self.writer,
            event_tx: self.event_tx.clone(),
        };
        self.runtime.spawn(run_job_task(ctx, guard));

        Ok(id)
    }
}

fn validate_request(request: &JobRequest) -> std::result::Result<(), JobError> {
    let fields = [
        ("source_url", &request.source_url),
        ("video_selector", &request.video_selector),
        ("audio_selector", &request.audio_selector),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(JobError::EmptyInput { field });
        }
    }
    Ok(())
}
