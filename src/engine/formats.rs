//! Stream format discovery
//!
//! The engine's metadata dump lists every format a URL offers. Hosts pick the
//! video and audio selectors for [`crate::MediaDownloader::submit`] from the
//! split produced by [`FormatCatalog::from_info`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Codec value the engine uses for a missing stream
const NO_CODEC: &str = "none";

/// One format entry from the engine's metadata dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFormat {
    /// Selector accepted by the engine (e.g. "137")
    pub format_id: String,
    /// Container extension
    #[serde(default)]
    pub ext: Option<String>,
    /// Video codec, `"none"` for audio-only formats
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Audio codec, `"none"` for video-only formats
    #[serde(default)]
    pub acodec: Option<String>,
    /// Frame height in pixels
    #[serde(default)]
    pub height: Option<u32>,
    /// Exact size in bytes
    #[serde(default)]
    pub filesize: Option<u64>,
    /// Estimated size in bytes, used when the exact size is unknown
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    /// Free-form quality note (e.g. "1080p", "medium")
    #[serde(default)]
    pub format_note: Option<String>,
}

fn has_codec(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| c != NO_CODEC)
}

impl MediaFormat {
    /// Video stream without audio
    pub fn is_video_only(&self) -> bool {
        has_codec(&self.vcodec) && !has_codec(&self.acodec)
    }

    /// Audio stream without video
    pub fn is_audio_only(&self) -> bool {
        has_codec(&self.acodec) && !has_codec(&self.vcodec)
    }

    /// Best known size in bytes
    pub fn size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// Metadata returned by [`crate::ExtractionEngine::list_formats`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Engine-side media id
    #[serde(default)]
    pub id: Option<String>,
    /// Media title
    #[serde(default)]
    pub title: Option<String>,
    /// Every available format; absent when the engine found none
    #[serde(default)]
    pub formats: Option<Vec<MediaFormat>>,
}

/// Formats split into the two selector lists a host offers
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCatalog {
    /// Media title, if the engine reported one
    pub title: Option<String>,
    /// Video-only formats, tallest first
    pub video: Vec<MediaFormat>,
    /// Audio-only formats, largest first
    pub audio: Vec<MediaFormat>,
}

impl FormatCatalog {
    /// Split `info` into video-only and audio-only lists
    ///
    /// Formats that carry both streams, or neither, are left out. Formats with
    /// an unknown height or size sort after the known ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when `info` lists no formats at all.
    pub fn from_info(url: &str, info: MediaInfo) -> Result<Self> {
        let formats = info
            .formats
            .filter(|formats| !formats.is_empty())
            .ok_or_else(|| Error::NotFound(format!("no formats available for {url}")))?;

        let (mut video, mut audio): (Vec<_>, Vec<_>) = formats
            .into_iter()
            .filter(|f| f.is_video_only() || f.is_audio_only())
            .partition(MediaFormat::is_video_only);

        // Option orders None first, so reversing puts unknowns last
        video.sort_by(|a, b| b.height.cmp(&a.height));
        audio.sort_by(|a, b| b.size().cmp(&a.size()));

        Ok(Self {
            title: info.title,
            video,
            audio,
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn info(json: serde_json::Value) -> MediaInfo {
        serde_json::from_value(json).unwrap()
    }

    fn ids(formats: &[MediaFormat]) -> Vec<&str> {
        formats.iter().map(|f| f.format_id.as_str()).collect()
    }

    #[test]
    fn test_catalog_splits_and_sorts() {
        let catalog = FormatCatalog::from_info(
            "https://example.com/v",
            info(serde_json::json!({
                "id": "abc",
                "title": "Clip",
                "formats": [
                    {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"},
                    {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "filesize": 3000},
                    {"format_id": "136", "ext": "mp4", "vcodec": "avc1", "acodec": "none", "height": 720},
                    {"format_id": "18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a.40.2", "height": 360},
                    {"format_id": "251", "ext": "webm", "vcodec": "none", "acodec": "opus", "filesize_approx": 5000},
                    {"format_id": "137", "ext": "mp4", "vcodec": "avc1", "acodec": "none", "height": 1080},
                    {"format_id": "249", "ext": "webm", "vcodec": "none", "acodec": "opus"},
                    {"format_id": "160", "ext": "mp4", "vcodec": "avc1", "acodec": "none"}
                ]
            })),
        )
        .unwrap();

        assert_eq!(catalog.title.as_deref(), Some("Clip"));
        assert_eq!(ids(&catalog.video), ["137", "136", "160"]);
        assert_eq!(ids(&catalog.audio), ["251", "140", "249"]);
    }

    #[test]
    fn test_missing_codec_counts_as_absent() {
        let catalog = FormatCatalog::from_info(
            "https://example.com/v",
            info(serde_json::json!({
                "formats": [
                    {"format_id": "a", "acodec": "opus"},
                    {"format_id": "v", "vcodec": "vp9"},
                    {"format_id": "unknown"}
                ]
            })),
        )
        .unwrap();
        assert_eq!(ids(&catalog.video), ["v"]);
        assert_eq!(ids(&catalog.audio), ["a"]);
    }

    #[test]
    fn test_no_formats_is_not_found() {
        for empty in [
            serde_json::json!({"title": "Live"}),
            serde_json::json!({"formats": []}),
        ] {
            let err = FormatCatalog::from_info("https://example.com/live", info(empty)).unwrap_err();
            assert_eq!(err.code(), "not_found");
            assert!(err.to_string().contains("https://example.com/live"));
        }
    }
}
