//! Common test utilities for media-dl integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use media_dl::destination::EntryWriter;
use media_dl::{
    CompletionEvent, Config, Destination, EngineProgress, EngineRequest, Event, ExtractionEngine,
    MediaDownloader, MediaKind,
};
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncWrite;
use tokio::sync::Barrier;

/// Engine keyed by URL path segment: `/ok/<name>` writes `<name>`, `/fail` fails.
///
/// Every job waits on `barrier` first so all jobs are in flight together.
pub struct PathEngine {
    pub barrier: Arc<Barrier>,
}

#[async_trait]
impl ExtractionEngine for PathEngine {
    async fn run(
        &self,
        request: &EngineRequest,
        on_progress: &mut (dyn FnMut(EngineProgress) + Send),
    ) -> media_dl::Result<()> {
        self.barrier.wait().await;
        on_progress(EngineProgress {
            percent: 50.0,
            eta_seconds: Some(1),
        });

        if request.url.ends_with("/fail") {
            return Err(media_dl::Error::ExternalTool("simulated network error".to_string()));
        }

        let name = request.url.rsplit('/').next().unwrap_or("out.mp4");
        tokio::fs::write(request.output_dir.join(name), request.url.as_bytes()).await?;
        on_progress(EngineProgress {
            percent: 100.0,
            eta_seconds: None,
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "path"
    }
}

/// In-memory destination, standing in for an opaque storage handle
#[derive(Default)]
pub struct MemoryDestination {
    entries: Arc<Mutex<HashMap<String, (MediaKind, Vec<u8>)>>>,
}

impl MemoryDestination {
    pub fn entry(&self, name: &str) -> Option<(MediaKind, Vec<u8>)> {
        self.entries.lock().unwrap().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

struct MemoryWriter {
    name: String,
    kind: MediaKind,
    buffer: Vec<u8>,
    entries: Arc<Mutex<HashMap<String, (MediaKind, Vec<u8>)>>>,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buffer.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.entries.lock().unwrap().insert(
            this.name.clone(),
            (this.kind, std::mem::take(&mut this.buffer)),
        );
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn check_writable(&self) -> io::Result<()> {
        Ok(())
    }

    async fn entry_exists(&self, name: &str) -> io::Result<bool> {
        Ok(self.entries.lock().unwrap().contains_key(name))
    }

    async fn remove_entry(&self, name: &str) -> io::Result<()> {
        self.entries.lock().unwrap().remove(name);
        Ok(())
    }

    async fn create_entry(&self, name: &str, kind: MediaKind) -> io::Result<EntryWriter> {
        Ok(Box::new(MemoryWriter {
            name: name.to_string(),
            kind,
            buffer: Vec::new(),
            entries: self.entries.clone(),
        }))
    }
}

/// Create a downloader with its workspace root inside a fresh tempdir
pub async fn create_downloader(engine: Arc<dyn ExtractionEngine>) -> (MediaDownloader, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.temp_dir = temp_dir.path().join("temp");
    let downloader = MediaDownloader::new(config, engine).await.unwrap();
    (downloader, temp_dir)
}

/// Collect completion events until the downloader reports idle
pub async fn completions_until_idle(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
) -> Vec<CompletionEvent> {
    let mut completions = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for idle")
            .expect("event channel closed");
        match event {
            Event::Completion(done) => completions.push(done),
            Event::Idle => return completions,
            _ => {}
        }
    }
}
