//! Media type classification by file extension

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions that are always audio containers
const AUDIO_EXTENSIONS: &[&str] = &["m4a", "mp3", "aac", "opus", "ogg", "flac", "wav"];

/// Broad media type of a produced file, used as the MIME hint for destinations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio-only container
    Audio,
    /// Video container
    Video,
}

impl MediaKind {
    /// Classify a file from its extension
    ///
    /// `webm` holds either audio or video, so it counts as audio only when the
    /// job asked for the audio stream alone.
    pub fn classify(path: &Path, audio_only: bool) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if AUDIO_EXTENSIONS.contains(&ext.as_str()) || (ext == "webm" && audio_only) {
            MediaKind::Audio
        } else {
            MediaKind::Video
        }
    }

    /// MIME type handed to the destination
    pub fn mime(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/*",
            MediaKind::Video => "video/mp4",
        }
    }
}
