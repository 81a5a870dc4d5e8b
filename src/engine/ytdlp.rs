//! yt-dlp engine driven through the external binary

use super::progress::{PROGRESS_TEMPLATE, parse_progress_line};
use super::{EngineProgress, EngineRequest, EngineUpdate, ExtractionEngine, MediaInfo};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Number of trailing stderr lines kept for error messages
const STDERR_TAIL_LINES: usize = 20;

/// Engine that runs the external `yt-dlp` binary
///
/// Progress is read line by line from stdout using a custom progress template.
/// The engine is always asked to overwrite files inside the output directory.
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::YtDlpEngine;
/// use std::path::PathBuf;
///
/// // Explicit path
/// let engine = YtDlpEngine::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary_path: PathBuf,
    extra_args: Vec<String>,
}

impl YtDlpEngine {
    /// Create an engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            extra_args: Vec::new(),
        }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Returns `None` if the binary cannot be found.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Append extra arguments to every invocation
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Binary this engine executes
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    fn build_args(&self, request: &EngineRequest) -> Vec<String> {
        let output = request.output_dir.join(&request.output_template);
        let mut args = vec![
            "-f".to_string(),
            request.selector.clone(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            "--force-overwrites".to_string(),
            "--newline".to_string(),
            "--no-color".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        // URL goes last so extra args cannot be mistaken for it
        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }
}

/// Decode one output line; engines on some platforms emit non-UTF-8 bytes
fn decode_line(bytes: &[u8]) -> String {
    let line = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(line).into_owned()
}

/// Most useful line of stderr for an error message
fn failure_reason<'a>(lines: impl IntoIterator<Item = &'a String>) -> String {
    let lines: Vec<&String> = lines.into_iter().collect();
    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR"))
        .or_else(|| lines.last())
        .map(|line| line.to_string())
        .unwrap_or_else(|| "no error output".to_string())
}

impl YtDlpEngine {
    /// Run yt-dlp to completion and return its stdout
    async fn run_to_completion(&self, args: &[&str]) -> crate::Result<Vec<u8>> {
        let output = Command::new(&self.binary_path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr: Vec<String> = output.stderr.split(|b| *b == b'\n').map(decode_line).collect();
        let reason = failure_reason(stderr.iter().filter(|line| !line.trim().is_empty()));
        Err(crate::Error::ExternalTool(format!(
            "yt-dlp exited with {}: {}",
            output.status, reason
        )))
    }

    /// Update the yt-dlp binary in place (`yt-dlp -U`)
    ///
    /// Only works for release builds of yt-dlp; package-manager installs report
    /// an error.
    pub async fn self_update(&self) -> crate::Result<EngineUpdate> {
        tracing::info!(binary = %self.binary_path.display(), "updating yt-dlp");
        let stdout = self.run_to_completion(&["-U", "--no-color"]).await?;

        let lines: Vec<String> = stdout.split(|b| *b == b'\n').map(decode_line).collect();
        let summary = lines
            .iter()
            .rev()
            .find(|line| !line.trim().is_empty())
            .cloned()
            .unwrap_or_default();

        if lines.iter().any(|line| line.contains("is up to date")) {
            tracing::debug!(summary = %summary, "yt-dlp already current");
            Ok(EngineUpdate::UpToDate(summary))
        } else {
            tracing::info!(summary = %summary, "yt-dlp updated");
            Ok(EngineUpdate::Updated(summary))
        }
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    async fn run(
        &self,
        request: &EngineRequest,
        on_progress: &mut (dyn FnMut(EngineProgress) + Send),
    ) -> crate::Result<()> {
        let mut child = Command::new(&self.binary_path)
            .args(self.build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| crate::Error::ExternalTool("yt-dlp stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| crate::Error::ExternalTool("yt-dlp stderr not captured".to_string()))?;

        // Drain stderr concurrently so a chatty engine cannot block on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut segments = BufReader::new(stderr).split(b'\n');
            while let Ok(Some(segment)) = segments.next_segment().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(decode_line(&segment));
            }
            tail
        });

        let mut segments = BufReader::new(stdout).split(b'\n');
        while let Some(segment) = segments.next_segment().await? {
            let line = decode_line(&segment);
            match parse_progress_line(&line) {
                Some(progress) => on_progress(progress),
                None => tracing::trace!(line = %line, "yt-dlp output"),
            }
        }

        let status = child.wait().await?;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        Err(crate::Error::ExternalTool(format!(
            "yt-dlp exited with {}: {}",
            status,
            failure_reason(stderr_tail.iter())
        )))
    }

    async fn list_formats(&self, url: &str) -> crate::Result<MediaInfo> {
        tracing::debug!(url, "listing formats");
        let stdout = self
            .run_to_completion(&[
                "-J",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "--",
                url,
            ])
            .await?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    async fn update(&self) -> crate::Result<EngineUpdate> {
        self.self_update().await
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
