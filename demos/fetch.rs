//! Fetch example
//!
//! This example plays the role of a host application:
//! - Loading the last-used destination and stream selection
//! - Creating a downloader backed by yt-dlp and updating yt-dlp itself
//! - Listing formats to pick the best streams when none were given
//! - Printing progress and completion events
//! - Staying alive until every submitted job has finished
//!
//! Usage:
//!
//! ```bash
//! cargo run --example fetch -- <url> [video_selector] [audio_selector] [destination]
//! ```
//!
//! Use `none` as the video selector to fetch audio only.

use media_dl::{
    Config, Database, DirectoryDestination, EngineUpdate, Event, HostExit, MediaDownloader,
    UpdateChecker, UpdateStatus, run_until_idle,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("usage: fetch <url> [video_selector] [audio_selector] [destination]");
        std::process::exit(2);
    };

    let config = Config::default();

    // Preferences fill in anything not given on the command line
    let db = Database::new(&config.persistence.database_path).await?;
    let last = db.last_selection().await?;
    let video = args
        .next()
        .or_else(|| last.as_ref().map(|s| s.video_selector.clone()));
    let audio = args
        .next()
        .or_else(|| last.as_ref().map(|s| s.audio_selector.clone()));
    let destination = match args.next() {
        Some(dir) => dir,
        None => db
            .last_destination()
            .await?
            .unwrap_or_else(|| "downloads".to_string()),
    };
    std::fs::create_dir_all(&destination)?;

    // Non-fatal: a failed update check only prints a note
    match UpdateChecker::new(config.update.clone())?
        .check(env!("CARGO_PKG_VERSION"))
        .await
    {
        Ok(UpdateStatus::Available(release)) => {
            println!("Update available: {} ({})", release.version, release.download_url);
        }
        Ok(UpdateStatus::UpToDate { .. }) => {}
        Err(e) => println!("Update check skipped: {}", e),
    }

    let downloader = MediaDownloader::from_config(config).await?;

    // Non-fatal as well: a packaged yt-dlp cannot update itself
    match downloader.update_engine().await {
        Ok(EngineUpdate::Updated(summary)) => println!("{}", summary),
        Ok(EngineUpdate::UpToDate(_)) => {}
        Err(e) => println!("yt-dlp update skipped: {}", e),
    }

    // Without a saved or given choice, take the tallest video and largest audio stream
    let (video, audio) = match (video, audio) {
        (Some(video), Some(audio)) => (video, audio),
        (video, audio) => {
            let catalog = downloader.fetch_formats(&url).await?;
            println!(
                "{}: {} video / {} audio formats",
                catalog.title.as_deref().unwrap_or("untitled"),
                catalog.video.len(),
                catalog.audio.len()
            );
            let best_video = catalog
                .video
                .first()
                .map(|f| f.format_id.clone())
                .unwrap_or_else(|| "none".to_string());
            let best_audio = catalog
                .audio
                .first()
                .map(|f| f.format_id.clone())
                .unwrap_or_else(|| "bestaudio".to_string());
            (video.unwrap_or(best_video), audio.unwrap_or(best_audio))
        }
    };

    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Submitted { id, url } => println!("Queued #{}: {}", id, url),
                Event::StateChanged { id, state } => println!("#{} is {}", id, state),
                Event::Progress(progress) => println!("#{}: {}", progress.job_id, progress.message),
                Event::Completion(done) if done.success => println!(
                    "#{} saved as {}",
                    done.job_id,
                    done.result_file_name.unwrap_or_default()
                ),
                Event::Completion(done) => println!(
                    "#{} failed: {}",
                    done.job_id,
                    done.error_message.unwrap_or_default()
                ),
                Event::Idle => println!("All jobs finished"),
            }
        }
    });

    let id = downloader.submit(
        url,
        video.clone(),
        audio.clone(),
        Arc::new(DirectoryDestination::new(&destination)),
    )?;
    println!("Submitted job #{}", id);

    db.set_last_selection(&video, &audio).await?;
    db.set_last_destination(&destination).await?;

    if let HostExit::Signal(name) = run_until_idle(downloader).await {
        println!("Stopped by {}; unfinished jobs were abandoned", name);
    }
    db.close().await;
    Ok(())
}
