//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::destination::Destination;

/// Video selector value meaning "no video stream, audio only"
pub const AUDIO_ONLY: &str = "none";

/// Unique identifier for a job
///
/// Assigned at submission from a process-wide counter; never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<JobId> for u64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Job state
///
/// `Pending -> Running -> Transferring -> Completed`; any step may move to
/// `Failed` instead. `Completed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Submitted, task not started yet
    Pending,
    /// Workspace exists, engine is running
    Running,
    /// Copying the produced file into the destination
    Transferring,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobState {
    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Whether the job's workspace is allowed to exist in this state
    pub fn holds_workspace(&self) -> bool {
        matches!(self, JobState::Running | JobState::Transferring)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Transferring => "transferring",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A submission: what to fetch and where to put it
#[derive(Clone)]
pub struct JobRequest {
    /// Remote media URL, passed to the engine untouched
    pub source_url: String,
    /// Video stream identifier, or [`AUDIO_ONLY`]
    pub video_selector: String,
    /// Audio stream identifier
    pub audio_selector: String,
    /// Where the finished file is stored
    pub destination: Arc<dyn Destination>,
}

impl JobRequest {
    /// Create a request
    pub fn new(
        source_url: impl Into<String>,
        video_selector: impl Into<String>,
        audio_selector: impl Into<String>,
        destination: Arc<dyn Destination>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            video_selector: video_selector.into(),
            audio_selector: audio_selector.into(),
            destination,
        }
    }

    /// Whether the request asks for the audio stream only
    pub fn is_audio_only(&self) -> bool {
        self.video_selector == AUDIO_ONLY
    }

    /// Selector string handed to the extraction engine
    ///
    /// `"none"` + `"140"` gives `"140"`; `"137"` + `"140"` gives `"137+140"`.
    pub fn engine_selector(&self) -> String {
        if self.is_audio_only() {
            self.audio_selector.clone()
        } else {
            format!("{}+{}", self.video_selector, self.audio_selector)
        }
    }
}

impl std::fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRequest")
            .field("source_url", &self.source_url)
            .field("video_selector", &self.video_selector)
            .field("audio_selector", &self.audio_selector)
            .field("destination", &self.destination.describe())
            .finish()
    }
}

/// Point-in-time view of a job, as kept in the registry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Job ID
    pub id: JobId,
    /// Source URL
    pub source_url: String,
    /// Video stream identifier
    pub video_selector: String,
    /// Audio stream identifier
    pub audio_selector: String,
    /// Description of the destination
    pub destination: String,
    /// Workspace path while the job holds one
    pub workspace: Option<PathBuf>,
    /// Current state
    pub state: JobState,
    /// Progress percentage (0.0 to 100.0), never decreasing
    pub progress_percent: f32,
    /// Estimated seconds remaining, as reported by the engine
    pub eta_seconds: Option<u64>,
    /// Name of the stored file once completed
    pub result_file_name: Option<String>,
    /// Error message once failed
    pub error_message: Option<String>,
    /// When the job was submitted
    pub submitted_at: DateTime<Utc>,
    /// When the job reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadJob {
    /// Fresh `Pending` snapshot for a request
    pub fn pending(id: JobId, request: &JobRequest) -> Self {
        Self {
            id,
            source_url: request.source_url.clone(),
            video_selector: request.video_selector.clone(),
            audio_selector: request.audio_selector.clone(),
            destination: request.destination.describe(),
            workspace: None,
            state: JobState::Pending,
            progress_percent: 0.0,
            eta_seconds: None,
            result_file_name: None,
            error_message: None,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Progress update for one job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Job ID
    pub job_id: JobId,
    /// Progress percentage (0.0 to 100.0)
    pub percent: f32,
    /// Estimated seconds remaining
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
    /// Human-readable progress line, e.g. "42.5% (ETA: 17 s)"
    pub message: String,
}

impl ProgressEvent {
    /// Build an event with the standard message format
    pub fn new(job_id: JobId, percent: f32, eta_seconds: Option<u64>) -> Self {
        let message = match eta_seconds {
            Some(eta) => format!("{percent:.1}% (ETA: {eta} s)"),
            None => format!("{percent:.1}%"),
        };
        Self {
            job_id,
            percent,
            eta_seconds,
            message,
        }
    }
}

/// Terminal outcome of one job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Job ID
    pub job_id: JobId,
    /// Whether the job completed
    pub success: bool,
    /// Stored file name on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_file_name: Option<String>,
    /// Error message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Machine-readable failure kind (see [`crate::JobError::kind`])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl CompletionEvent {
    /// Successful completion
    pub fn completed(job_id: JobId, result_file_name: impl Into<String>) -> Self {
        Self {
            job_id,
            success: true,
            result_file_name: Some(result_file_name.into()),
            error_message: None,
            error_kind: None,
        }
    }

    /// Failed completion
    pub fn failed(job_id: JobId, error: &crate::error::JobError) -> Self {
        Self {
            job_id,
            success: false,
            result_file_name: None,
            error_message: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
        }
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted
    Submitted {
        /// Job ID
        id: JobId,
        /// Source URL
        url: String,
    },

    /// Job moved to a new state
    StateChanged {
        /// Job ID
        id: JobId,
        /// New state
        state: JobState,
    },

    /// Engine progress update
    Progress(ProgressEvent),

    /// Job finished; exactly one per job
    Completion(CompletionEvent),

    /// The last active job finished
    Idle,
}

impl Event {
    /// Job this event belongs to, if any
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Event::Submitted { id, .. } | Event::StateChanged { id, .. } => Some(*id),
            Event::Progress(p) => Some(p.job_id),
            Event::Completion(c) => Some(c.job_id),
            Event::Idle => None,
        }
    }
}
