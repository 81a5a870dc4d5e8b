//! Job registry and active-job accounting
//!
//! The registry is the only state shared between job tasks. It owns:
//! - the active-job count, which drives host lifecycle decisions
//! - a table of job snapshots for status polling
//! - the observers notified when the active count drops from 1 to 0
//!
//! Job ids come from a process-wide counter, so two registries in the same
//! process never hand out the same id.
//!
//! The snapshot table is advisory. Terminal entries can be pruned at any time
//! without affecting the active count.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::types::{DownloadJob, JobId};

/// Next job id for the whole process; ids are never reused
static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Observer invoked when the registry becomes idle
pub type IdleCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Table {
    jobs: HashMap<JobId, DownloadJob>,
    active: HashSet<JobId>,
}

/// Concurrency-safe table of jobs plus the active-job count
pub struct JobRegistry {
    active_count: AtomicUsize,
    table: Mutex<Table>,
    idle_callbacks: Mutex<Vec<IdleCallback>>,
    idle_notify: Notify,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("active_count", &self.active_count())
            .finish_non_exhaustive()
    }
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            active_count: AtomicUsize::new(0),
            table: Mutex::new(Table::default()),
            idle_callbacks: Mutex::new(Vec::new()),
            idle_notify: Notify::new(),
        }
    }

    /// Allocate a job id that is unique within the process
    pub fn allocate_id(&self) -> JobId {
        JobId(NEXT_JOB_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Add a job and count it as active
    ///
    /// Registering an id that is already active replaces its snapshot but does
    /// not count it twice.
    pub fn register(&self, job: DownloadJob) {
        let id = job.id;
        let mut table = self.lock_table();
        table.jobs.insert(id, job);
        if table.active.insert(id) {
            // counter moves under the table lock so it always matches the active set
            let active = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(job_id = id.0, active, "job registered");
        } else {
            tracing::error!(job_id = id.0, "job registered twice");
        }
    }

    /// Stop counting a job as active
    ///
    /// The job's snapshot stays available until [`prune_finished`](Self::prune_finished).
    /// Returns `true` when this call took the active count from 1 to 0, in which
    /// case the idle observers have been notified.
    ///
    /// Calling this twice for the same id is a programming error; the second
    /// call is logged and ignored so the count never goes negative.
    pub fn unregister(&self, id: JobId) -> bool {
        let previous = {
            let mut table = self.lock_table();
            if !table.active.remove(&id) {
                drop(table);
                tracing::error!(job_id = id.0, "unregister called for a job that is not active");
                return false;
            }
            self.active_count
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .unwrap_or(0)
        };
        tracing::debug!(job_id = id.0, active = previous.saturating_sub(1), "job unregistered");

        if previous == 1 {
            self.fire_idle();
            true
        } else {
            false
        }
    }

    /// Apply `f` to a job's snapshot; returns `false` if the job is unknown
    pub fn update(&self, id: JobId, f: impl FnOnce(&mut DownloadJob)) -> bool {
        match self.lock_table().jobs.get_mut(&id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// Copy of a job's current snapshot
    pub fn snapshot(&self, id: JobId) -> Option<DownloadJob> {
        self.lock_table().jobs.get(&id).cloned()
    }

    /// All known jobs ordered by id
    pub fn jobs(&self) -> Vec<DownloadJob> {
        let mut jobs: Vec<DownloadJob> = self.lock_table().jobs.values().cloned().collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    }

    /// Number of jobs that have been registered and not yet unregistered
    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Drop snapshots of jobs that are no longer active; returns how many were removed
    pub fn prune_finished(&self) -> usize {
        let mut table = self.lock_table();
        let Table { jobs, active } = &mut *table;
        let before = jobs.len();
        jobs.retain(|id, job| active.contains(id) || !job.state.is_terminal());
        before - jobs.len()
    }

    /// Register an observer fired on every 1 → 0 transition of the active count
    pub fn on_idle(&self, callback: IdleCallback) {
        self.idle_callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    /// Wait until no job is active
    ///
    /// Resolves immediately when nothing is active.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.idle_notify.notified();
            tokio::pin!(notified);
            // Register interest before checking so a concurrent transition is not missed
            notified.as_mut().enable();

            if self.active_count() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn fire_idle(&self) {
        tracing::info!("all jobs finished");
        let callbacks: Vec<IdleCallback> = self
            .idle_callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in callbacks {
            callback();
        }
        self.idle_notify.notify_waiters();
    }

    fn lock_table(&self) -> MutexGuard<'_, Table> {
        // A panic while holding the lock cannot leave the table half-updated
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
