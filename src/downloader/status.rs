//! Status queries, active-job accounting and host idle notification.

use std::sync::Arc;

use crate::types::{DownloadJob, JobId};

use super::MediaDownloader;

impl MediaDownloader {
    /// Current snapshot of a job, or `None` if unknown or pruned
    pub fn snapshot(&self, id: JobId) -> Option<DownloadJob> {
        self.registry.snapshot(id)
    }

    /// Snapshots of all known jobs, ordered by id
    pub fn jobs(&self) -> Vec<DownloadJob> {
        self.registry.jobs()
    }

    /// Number of jobs submitted and not yet finalized
    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Drop snapshots of finished jobs; returns how many were removed
    pub fn prune_finished(&self) -> usize {
        self.registry.prune_finished()
    }

    /// Register a host observer fired whenever the last active job finishes
    ///
    /// The callback runs on the task that finalized the job, so it should return
    /// quickly (e.g. flip a flag or send on a channel).
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use media_dl::{Config, MediaDownloader};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let downloader = MediaDownloader::from_config(Config::default()).await?;
    /// downloader.on_idle(|| tracing::info!("releasing keep-alive"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn on_idle<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.registry.on_idle(Arc::new(callback));
    }

    /// Wait until no job is active
    ///
    /// Resolves immediately if nothing is running.
    pub async fn wait_until_idle(&self) {
        self.registry.wait_until_idle().await;
    }
}
