//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Job execution settings (workspace root, engine naming, event buffering)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root under which per-job workspaces are created (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Output naming template handed to the engine (default: "%(title)s.%(ext)s")
    #[serde(default = "default_output_template")]
    pub output_template: String,

    /// Capacity of the event broadcast channel (default: 1000)
    ///
    /// Subscribers that fall further behind receive `RecvError::Lagged`.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// File extensions in a workspace that are never picked as the job output
    #[serde(default = "default_partial_extensions")]
    pub partial_extensions: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            output_template: default_output_template(),
            event_buffer: default_event_buffer(),
            partial_extensions: default_partial_extensions(),
        }
    }
}

/// External tool settings for the yt-dlp engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Extra arguments appended to every engine invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            extra_args: Vec::new(),
        }
    }
}

/// Release feed settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// "Latest release" endpoint returning `tag_name`, `body` and `assets`
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Only offer release assets whose download URL ends with this suffix (empty = any)
    #[serde(default)]
    pub asset_suffix: String,

    /// User-Agent header sent with feed requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            asset_suffix: String::new(),
            user_agent: default_user_agent(),
        }
    }
}

/// Data storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Preference database path (default: "./media-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for MediaDownloader
///
/// Fields are organized into sub-configs:
/// - [`download`](DownloadConfig) - workspace root, naming template, event buffering
/// - [`tools`](ToolsConfig) - yt-dlp location and arguments
/// - [`update`](UpdateConfig) - release feed
/// - [`persistence`](PersistenceConfig) - preference database
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Job execution settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Release feed settings
    #[serde(default)]
    pub update: UpdateConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Workspace root directory
    pub fn temp_dir(&self) -> &PathBuf {
        &self.download.temp_dir
    }

    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.output_template.trim().is_empty() {
            return Err(Error::Config {
                message: "output_template must not be empty".to_string(),
                key: Some("output_template".to_string()),
            });
        }
        if self.download.event_buffer == 0 {
            return Err(Error::Config {
                message: "event_buffer must be at least 1".to_string(),
                key: Some("event_buffer".to_string()),
            });
        }
        Ok(())
    }
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_output_template() -> String {
    "%(title)s.%(ext)s".to_string()
}

fn default_event_buffer() -> usize {
    1000
}

fn default_partial_extensions() -> Vec<String> {
    vec![
        "part".to_string(),
        "ytdl".to_string(),
        "temp".to_string(),
        "tmp".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_feed_url() -> String {
    "https://api.github.com/repos/media-dl/media-dl/releases/latest".to_string()
}

fn default_user_agent() -> String {
    concat!("media-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./media-dl.db")
}
