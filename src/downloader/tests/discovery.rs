use super::*;
use crate::engine::{EngineUpdate, MediaInfo};

fn clip_info() -> MediaInfo {
    serde_json::from_value(serde_json::json!({
        "id": "abc",
        "title": "Clip",
        "formats": [
            {"format_id": "18", "vcodec": "avc1", "acodec": "mp4a.40.2", "height": 360},
            {"format_id": "136", "vcodec": "avc1", "acodec": "none", "height": 720},
            {"format_id": "137", "vcodec": "avc1", "acodec": "none", "height": 1080},
            {"format_id": "139", "vcodec": "none", "acodec": "mp4a.40.5", "filesize": 100},
            {"format_id": "140", "vcodec": "none", "acodec": "mp4a.40.2", "filesize": 400}
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_fetch_formats_splits_catalog() {
    let engine = Arc::new(ScriptedEngine::new().formats("https://example.com/v", clip_info()));
    let (downloader, _temp_dir) = create_test_downloader(engine).await;

    let catalog = downloader
        .fetch_formats("  https://example.com/v ")
        .await
        .unwrap();

    assert_eq!(catalog.title.as_deref(), Some("Clip"));
    let video: Vec<&str> = catalog.video.iter().map(|f| f.format_id.as_str()).collect();
    let audio: Vec<&str> = catalog.audio.iter().map(|f| f.format_id.as_str()).collect();
    assert_eq!(video, ["137", "136"]);
    assert_eq!(audio, ["140", "139"]);
}

#[tokio::test]
async fn test_fetch_formats_errors() {
    let engine = Arc::new(ScriptedEngine::new().formats(
        "https://example.com/empty",
        MediaInfo {
            title: Some("Nothing here".to_string()),
            ..Default::default()
        },
    ));
    let (downloader, _temp_dir) = create_test_downloader(engine).await;

    let err = downloader.fetch_formats("   ").await.unwrap_err();
    assert_eq!(err.code(), "empty_input");

    let err = downloader
        .fetch_formats("https://example.com/empty")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");

    let err = downloader
        .fetch_formats("https://example.com/unknown")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExternalTool(_)));

    // discovery never creates jobs
    assert!(downloader.jobs().is_empty());
}

#[tokio::test]
async fn test_update_engine_when_idle() {
    let engine = Arc::new(ScriptedEngine::new());
    let (downloader, _temp_dir) = create_test_downloader(engine.clone()).await;

    let outcome = downloader.update_engine().await.unwrap();
    assert!(matches!(outcome, EngineUpdate::UpToDate(_)));
    assert_eq!(engine.update_calls(), 1);
}

#[tokio::test]
async fn test_update_engine_refused_while_jobs_active() {
    let gate = Arc::new(tokio::sync::Barrier::new(2));
    let engine = Arc::new(ScriptedEngine::new().script(
        "https://example.com/slow",
        vec![Step::Barrier(gate.clone()), Step::write("clip.mp4", b"x")],
    ));
    let (downloader, temp_dir) = create_test_downloader(engine.clone()).await;
    let mut rx = downloader.subscribe();

    let id = downloader
        .submit(
            "https://example.com/slow",
            "137",
            "140",
            destination_in(&temp_dir, "out"),
        )
        .unwrap();

    let err = downloader.update_engine().await.unwrap_err();
    assert!(err.to_string().contains("1 job(s) are active"), "{err}");
    assert_eq!(engine.update_calls(), 0);

    gate.wait().await;
    events_until_completion(&mut rx, id).await;
    wait_for_idle_event(&mut rx).await;
    downloader.update_engine().await.unwrap();
    assert_eq!(engine.update_calls(), 1);
}

#[tokio::test]
async fn test_default_engine_capabilities_are_unsupported() {
    struct RunOnly;

    #[async_trait::async_trait]
    impl ExtractionEngine for RunOnly {
        async fn run(
            &self,
            _request: &crate::engine::EngineRequest,
            _on_progress: &mut (dyn FnMut(crate::engine::EngineProgress) + Send),
        ) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "run-only"
        }
    }

    let err = RunOnly.list_formats("https://example.com/v").await.unwrap_err();
    assert_eq!(err.code(), "not_supported");
    assert!(err.to_string().contains("run-only"));
    assert!(RunOnly.update().await.is_err());
}
