use super::test_helpers::{
    ScriptedEngine, Step, create_test_downloader, events_until_completion, workspace_entries,
};
use super::*;
use crate::destination::{Destination, DirectoryDestination};
use crate::error::JobError;
use crate::types::{JobId, JobState};
use std::time::Duration;

mod discovery;

/// Destination directory under the test tempdir
fn destination_in(temp_dir: &tempfile::TempDir, name: &str) -> Arc<DirectoryDestination> {
    let path = temp_dir.path().join(name);
    std::fs::create_dir_all(&path).unwrap();
    Arc::new(DirectoryDestination::new(path))
}

/// Wait for the next `Idle` event
async fn wait_for_idle_event(rx: &mut tokio::sync::broadcast::Receiver<Event>) {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for idle")
            .unwrap();
        if matches!(event, Event::Idle) {
            return;
        }
    }
}
