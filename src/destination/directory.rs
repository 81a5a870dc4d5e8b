//! Local directory destination

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{Destination, EntryWriter, MediaKind};

/// Destination backed by a directory on the local filesystem
///
/// The directory must already exist; it is never created on the caller's behalf.
#[derive(Debug, Clone)]
pub struct DirectoryDestination {
    root: PathBuf,
}

impl DirectoryDestination {
    /// Wrap an existing directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory entries are written to
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> std::io::Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid entry name: {name:?}"),
            )),
        }
    }
}

#[async_trait]
impl Destination for DirectoryDestination {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn check_writable(&self) -> std::io::Result<()> {
        let metadata = tokio::fs::metadata(&self.root).await?;
        if !metadata.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("{} is not a directory", self.root.display()),
            ));
        }
        if metadata.permissions().readonly() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} is read-only", self.root.display()),
            ));
        }
        Ok(())
    }

    async fn entry_exists(&self, name: &str) -> std::io::Result<bool> {
        tokio::fs::try_exists(self.entry_path(name)?).await
    }

    async fn remove_entry(&self, name: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.entry_path(name)?).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    async fn create_entry(&self, name: &str, _kind: MediaKind) -> std::io::Result<EntryWriter> {
        // truncate: a writer outside this process may have recreated the entry
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.entry_path(name)?)
            .await?;
        Ok(Box::new(file))
    }
}
