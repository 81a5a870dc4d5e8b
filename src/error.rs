//! Error types for media-dl
//!
//! This module provides error handling for the library:
//! - A crate-wide [`Error`] with contextual variants for config, I/O, database and network
//! - The job-scoped [`JobError`] taxonomy surfaced through completion events
//! - Stable machine-readable codes for subscribers that branch on failure kind

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "output_template")
        key: Option<String>,
    },

    /// A job-scoped failure (rejected submission or failed job step)
    #[error(transparent)]
    Job(#[from] JobError),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (yt-dlp missing, unexpected exit, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Requested entity not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not supported by the configured component
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Job(job) => job.kind(),
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotFound(_) => "not_found",
            Error::NotSupported(_) => "not_supported",
            Error::Other(_) => "internal_error",
        }
    }
}

/// Job-scoped failures
///
/// Every variant is terminal for the job it belongs to and never affects other
/// jobs. None of them are retried; a caller retries by submitting again.
#[derive(Debug, Error)]
pub enum JobError {
    /// A required submission field was empty; the job is never created
    #[error("empty input: {field} is required")]
    EmptyInput {
        /// Name of the missing field (e.g., "source_url")
        field: &'static str,
    },

    /// The job workspace could not be created
    #[error("failed to create workspace {path}: {source}")]
    Workspace {
        /// Workspace path that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The extraction engine reported a network or format failure
    #[error("extraction engine failed: {message}")]
    Engine {
        /// Engine-specific error description
        message: String,
    },

    /// The engine finished but left no usable file in the workspace
    #[error("no output file produced in {workspace}")]
    NoOutputProduced {
        /// Workspace that was scanned
        workspace: PathBuf,
    },

    /// The destination handle is invalid or an entry could not be created
    #[error("destination {destination} is not writable: {reason}")]
    DestinationUnwritable {
        /// Description of the destination
        destination: String,
        /// Why the destination rejected the write
        reason: String,
    },

    /// I/O failure while copying into the destination
    ///
    /// A partially written destination entry may remain and must be treated as
    /// untrustworthy.
    #[error("copy of {file_name} failed: {source}")]
    Copy {
        /// Name of the destination entry being written
        file_name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl JobError {
    /// Stable machine-readable failure kind, carried in completion events
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::EmptyInput { .. } => "empty_input",
            JobError::Workspace { .. } => "workspace_error",
            JobError::Engine { .. } => "engine_error",
            JobError::NoOutputProduced { .. } => "no_output_produced",
            JobError::DestinationUnwritable { .. } => "destination_unwritable",
            JobError::Copy { .. } => "copy_error",
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}
