//! Per-job temporary workspaces
//!
//! A [`Workspace`] is a directory owned by exactly one job. It is created fresh
//! when the job starts running and removed recursively when the job ends, on
//! success and failure alike. If a workspace is dropped without being destroyed
//! (a panicking task, for example) the directory is removed synchronously in
//! `Drop`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::error::JobError;
use crate::types::JobId;

/// Job-exclusive temporary directory
#[derive(Debug)]
pub struct Workspace {
    job_id: JobId,
    path: PathBuf,
    destroyed: bool,
}

impl Workspace {
    /// Create a fresh workspace for `job_id` under `root`
    ///
    /// The root is created if missing. The job directory itself must not exist
    /// yet; an existing directory is reported as a workspace error rather than
    /// reused.
    pub async fn create(root: &Path, job_id: JobId) -> Result<Self, JobError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| JobError::Workspace {
                path: root.to_path_buf(),
                source,
            })?;

        let dir_name = format!(
            "job_{}_{}",
            job_id.0,
            chrono::Utc::now().timestamp_millis()
        );
        let path = root.join(dir_name);
        tokio::fs::create_dir(&path)
            .await
            .map_err(|source| JobError::Workspace {
                path: path.clone(),
                source,
            })?;

        debug!(job_id = job_id.0, ?path, "workspace created");
        Ok(Self {
            job_id,
            path,
            destroyed: false,
        })
    }

    /// Workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pick the file the engine produced
    ///
    /// Considers regular files directly inside the workspace, skipping any whose
    /// extension is listed in `partial_extensions` (case-insensitive). The
    /// newest-modified file wins; equal modification times fall back to the
    /// lexicographically smallest name so the choice is deterministic.
    pub async fn find_output(&self, partial_extensions: &[String]) -> std::io::Result<Option<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let path = entry.path();
            if is_partial(&path, partial_extensions) {
                debug!(job_id = self.job_id.0, ?path, "ignoring partial file");
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            candidates.push((modified, path));
        }

        candidates.sort_by(|(a_time, a_path), (b_time, b_path)| {
            b_time.cmp(a_time).then_with(|| a_path.cmp(b_path))
        });
        Ok(candidates.into_iter().next().map(|(_, path)| path))
    }

    /// Remove the workspace directory and everything in it
    ///
    /// A directory that is already gone counts as success.
    pub async fn destroy(mut self) -> std::io::Result<()> {
        self.destroyed = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                debug!(job_id = self.job_id.0, path = ?self.path, "workspace removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(job_id = self.job_id.0, path = ?self.path, error = %e, "failed to remove workspace on drop");
        }
    }
}

fn is_partial(path: &Path, partial_extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            partial_extensions
                .iter()
                .any(|partial| partial.eq_ignore_ascii_case(ext))
        })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn partials() -> Vec<String> {
        vec!["part".to_string(), "ytdl".to_string()]
    }

    #[tokio::test]
    async fn test_create_and_destroy() {
        let root = tempdir().unwrap();
        let workspace = Workspace::create(root.path(), JobId(1)).await.unwrap();
        let path = workspace.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path.starts_with(root.path()));

        tokio::fs::write(path.join("clip.mp4"), b"data").await.unwrap();
        tokio::fs::create_dir(path.join("nested")).await.unwrap();

        workspace.destroy().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_create_makes_missing_root() {
        let root = tempdir().unwrap();
        let nested_root = root.path().join("a").join("b");
        let workspace = Workspace::create(&nested_root, JobId(2)).await.unwrap();
        assert!(workspace.path().starts_with(&nested_root));
        workspace.destroy().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_fails_when_root_is_a_file() {
        let root = tempdir().unwrap();
        let file_root = root.path().join("not-a-dir");
        std::fs::write(&file_root, b"x").unwrap();

        let err = Workspace::create(&file_root, JobId(3)).await.unwrap_err();
        assert_eq!(err.kind(), "workspace_error");
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = tempdir().unwrap();
        let path = {
            let workspace = Workspace::create(root.path(), JobId(4)).await.unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_destroy_tolerates_missing_directory() {
        let root = tempdir().unwrap();
        let workspace = Workspace::create(root.path(), JobId(5)).await.unwrap();
        std::fs::remove_dir_all(workspace.path()).unwrap();
        assert!(workspace.destroy().await.is_ok());
    }

    #[tokio::test]
    async fn test_find_output_empty() {
        let root = tempdir().unwrap();
        let workspace = Workspace::create(root.path(), JobId(6)).await.unwrap();
        assert!(workspace.find_output(&partials()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_output_skips_partials_and_dirs() {
        let root = tempdir().unwrap();
        let workspace = Workspace::create(root.path(), JobId(7)).await.unwrap();
        let dir = workspace.path();
        std::fs::write(dir.join("video.f137.mp4.part"), b"partial").unwrap();
        std::fs::write(dir.join("video.mp4.YTDL"), b"state").unwrap();
        std::fs::create_dir(dir.join("fragments")).unwrap();
        std::fs::write(dir.join("video.mp4"), b"merged").unwrap();

        let picked = workspace.find_output(&partials()).await.unwrap().unwrap();
        assert_eq!(picked.file_name().unwrap(), "video.mp4");
    }

    #[tokio::test]
    async fn test_find_output_prefers_newest() {
        let root = tempdir().unwrap();
        let workspace = Workspace::create(root.path(), JobId(8)).await.unwrap();
        let dir = workspace.path();

        let older = dir.join("a-older.webm");
        std::fs::write(&older, b"old").unwrap();
        let file = std::fs::File::options().write(true).open(&older).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();
        drop(file);

        std::fs::write(dir.join("z-newer.mp4"), b"new").unwrap();

        let picked = workspace.find_output(&partials()).await.unwrap().unwrap();
        assert_eq!(picked.file_name().unwrap(), "z-newer.mp4");
    }
}
