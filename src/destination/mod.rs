//! Destination storage and the overwrite-on-conflict transfer
//!
//! A [`Destination`] is an opaque, caller-provided handle to a place that holds
//! named entries. The orchestrator never creates or validates it beyond what
//! [`DestinationWriter::transfer`] needs.
//!
//! The transfer is delete-then-create-then-copy. It is not atomic: when the
//! copy fails midway, a partially written entry may remain and the caller
//! should treat it as untrustworthy.
//!
//! Transfers that target the same entry name in the same destination run one
//! at a time, so the entry always ends up holding the bytes of whichever job
//! transferred last.

mod directory;
mod media;

pub use directory::DirectoryDestination;
pub use media::MediaKind;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use crate::error::JobError;

/// Writable handle returned by [`Destination::create_entry`]
pub type EntryWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Storage location capable of holding named entries
///
/// Implementations can target a local directory, a document tree exposed by a
/// platform storage API, an object store, and so on.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Human-readable description for logs and job snapshots
    fn describe(&self) -> String;

    /// Check that the handle points at something that can receive entries
    async fn check_writable(&self) -> std::io::Result<()>;

    /// Whether an entry with `name` exists
    async fn entry_exists(&self, name: &str) -> std::io::Result<bool>;

    /// Delete the entry with `name`
    async fn remove_entry(&self, name: &str) -> std::io::Result<()>;

    /// Create a new, empty entry and open it for writing
    async fn create_entry(&self, name: &str, kind: MediaKind) -> std::io::Result<EntryWriter>;
}

type EntryKey = (String, String);

/// Per-entry transfer locks shared by every writer in the process
static ENTRY_LOCKS: LazyLock<Mutex<HashMap<EntryKey, Arc<tokio::sync::Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Exclusive hold on one destination entry for the length of a transfer
///
/// Dropping it releases the entry and forgets the lock once nobody else waits on it.
struct EntryLease {
    key: EntryKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl EntryLease {
    async fn acquire(destination: &dyn Destination, name: &str) -> Self {
        let key = (destination.describe(), name.to_string());
        let lock = ENTRY_LOCKS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        Self {
            key,
            guard: Some(guard),
        }
    }
}

impl Drop for EntryLease {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = ENTRY_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters clone the Arc under this map lock, so a count of one means none remain
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Copies finished files into a [`Destination`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DestinationWriter;

impl DestinationWriter {
    /// Transfer `local_file` into `destination`, replacing any entry of the same name
    ///
    /// Returns the final entry name.
    ///
    /// # Errors
    ///
    /// - [`JobError::DestinationUnwritable`] if the handle is invalid, an
    ///   existing entry cannot be removed, or the new entry cannot be created
    /// - [`JobError::Copy`] if reading the local file or writing the entry fails
    pub async fn transfer(
        &self,
        local_file: &Path,
        destination: &dyn Destination,
        kind: MediaKind,
    ) -> Result<String, JobError> {
        let unwritable = |reason: String| JobError::DestinationUnwritable {
            destination: destination.describe(),
            reason,
        };

        let name = local_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| unwritable(format!("{} has no file name", local_file.display())))?;

        destination
            .check_writable()
            .await
            .map_err(|e| unwritable(e.to_string()))?;

        let _lease = EntryLease::acquire(destination, &name).await;
        let exists = destination
            .entry_exists(&name)
            .await
            .map_err(|e| unwritable(e.to_string()))?;
        if exists {
            debug!(entry = %name, destination = %destination.describe(), "replacing existing entry");
            destination
                .remove_entry(&name)
                .await
                .map_err(|e| unwritable(format!("failed to remove existing {name}: {e}")))?;
        }

        let mut writer = destination
            .create_entry(&name, kind)
            .await
            .map_err(|e| unwritable(format!("failed to create {name}: {e}")))?;

        let copy_error = |source: std::io::Error| JobError::Copy {
            file_name: name.clone(),
            source,
        };
        let mut reader = tokio::fs::File::open(local_file).await.map_err(copy_error)?;
        let bytes = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(copy_error)?;
        writer.shutdown().await.map_err(copy_error)?;

        info!(
            entry = %name,
            bytes,
            mime = kind.mime(),
            destination = %destination.describe(),
            "transferred file to destination"
        );
        Ok(name)
    }
}
