//! Shared test helpers: a scripted extraction engine and downloader factory.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::engine::{EngineProgress, EngineRequest, EngineUpdate, ExtractionEngine, MediaInfo};
use crate::types::{CompletionEvent, Event, JobId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::{Barrier, broadcast};

/// One action the scripted engine performs
#[derive(Clone)]
pub(crate) enum Step {
    /// Report a progress tick
    Progress(f32, Option<u64>),
    /// Write a file with the given name and contents into the output directory
    Write(String, Vec<u8>),
    /// Sleep before the next step
    Sleep(Duration),
    /// Wait on a barrier shared with other jobs or the test itself
    Barrier(Arc<Barrier>),
    /// Fail with the given message
    Fail(String),
    /// Panic inside the job task
    Panic,
}

impl Step {
    pub(crate) fn write(name: &str, contents: &[u8]) -> Self {
        Step::Write(name.to_string(), contents.to_vec())
    }
}

/// Engine that replays a per-URL script instead of running a real binary
///
/// URLs without a script write a single `default.mp4`.
#[derive(Default)]
pub(crate) struct ScriptedEngine {
    scripts: Mutex<HashMap<String, Vec<Step>>>,
    requests: Mutex<Vec<EngineRequest>>,
    formats: Mutex<HashMap<String, MediaInfo>>,
    updates: Mutex<usize>,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(self, url: &str, steps: Vec<Step>) -> Self {
        self.scripts.lock().unwrap().insert(url.to_string(), steps);
        self
    }

    /// Metadata returned when listing formats for `url`
    pub(crate) fn formats(self, url: &str, info: MediaInfo) -> Self {
        self.formats.lock().unwrap().insert(url.to_string(), info);
        self
    }

    /// Number of self-update calls received
    pub(crate) fn update_calls(&self) -> usize {
        *self.updates.lock().unwrap()
    }

    /// Requests received so far, in call order
    pub(crate) fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionEngine for ScriptedEngine {
    async fn run(
        &self,
        request: &EngineRequest,
        on_progress: &mut (dyn FnMut(EngineProgress) + Send),
    ) -> crate::Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| vec![Step::write("default.mp4", b"default")]);

        for step in steps {
            match step {
                Step::Progress(percent, eta_seconds) => on_progress(EngineProgress {
                    percent,
                    eta_seconds,
                }),
                Step::Write(name, contents) => {
                    tokio::fs::write(request.output_dir.join(name), contents).await?
                }
                Step::Sleep(duration) => tokio::time::sleep(duration).await,
                Step::Barrier(barrier) => {
                    barrier.wait().await;
                }
                Step::Fail(message) => return Err(crate::Error::ExternalTool(message)),
                Step::Panic => panic!("scripted engine panic"),
            }
        }
        Ok(())
    }

    async fn list_formats(&self, url: &str) -> crate::Result<MediaInfo> {
        self.formats
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| crate::Error::ExternalTool(format!("Unsupported URL: {url}")))
    }

    async fn update(&self) -> crate::Result<EngineUpdate> {
        *self.updates.lock().unwrap() += 1;
        Ok(EngineUpdate::UpToDate("scripted engine is up to date".to_string()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Helper to create a test MediaDownloader backed by `engine`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    engine: Arc<ScriptedEngine>,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.download.temp_dir = temp_dir.path().join("temp");
    config.persistence.database_path = temp_dir.path().join("test.db");

    let downloader = MediaDownloader::new(config, engine).await.unwrap();
    (downloader, temp_dir)
}

/// Collect events for `id` until its completion event arrives
pub(crate) async fn events_until_completion(
    rx: &mut broadcast::Receiver<Event>,
    id: JobId,
) -> (Vec<Event>, CompletionEvent) {
    let mut seen = Vec::new();
    let deadline = Duration::from_secs(10);
    loop {
        let event = tokio::time::timeout(deadline, rx.recv())
            .await
            .expect("timed out waiting for completion")
            .expect("event channel closed");
        if event.job_id() != Some(id) {
            continue;
        }
        if let Event::Completion(done) = &event {
            let done = done.clone();
            seen.push(event);
            return (seen, done);
        }
        seen.push(event);
    }
}

/// Number of entries left under the workspace root
pub(crate) fn workspace_entries(downloader: &MediaDownloader) -> usize {
    std::fs::read_dir(downloader.get_config().temp_dir())
        .map(|dir| dir.count())
        .unwrap_or(0)
}
