//! Download queue with bounded concurrency and stall recovery.
//!
//! A [`DownloadQueue`] owns an ordered list of [`Task`]s and lets at most
//! `max_active` of them transfer at once. Tasks beyond the ceiling wait in
//! list order and are promoted as slots free up.
//!
//! # Overview
//!
//! - [`DownloadQueue`] - cloneable handle, the only way to touch tasks
//! - [`Task`] / [`TaskStatus`] - value snapshots of the task list
//! - [`TaskEvent`] - broadcast on every status or progress change
//! - [`QueueConfig`] - concurrency ceiling and stall timeout tuning
//!
//! Files are streamed to `<target>.downloading` and renamed into place only
//! once the body is complete, so a crash never leaves a truncated file under
//! the final name.
//!
//! All bookkeeping happens under one lock acquisition per operation; the
//! lock is never held across an await.
//!
//! # Example
//!
//! ```no_run
//! use papergrab_core::queue::{DownloadQueue, QueueConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = DownloadQueue::new(QueueConfig::default())?;
//! queue.add_task("https://papers.gceguide.com/IGCSE/Physics%20(0625)/2021/0625_s21_qp_12.pdf", "./papers");
//! queue.wait_until_idle().await;
//! for task in queue.task_list() {
//!     println!("{} {}", task.filename, task.status);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod filename;
mod task;
mod transfer;

use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Notify, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use config::{
    DEFAULT_MAX_ACTIVE, DEFAULT_STAGING_SUFFIX, DEFAULT_STALL_FLOOR, DEFAULT_STALL_PER_ACTIVE,
    MAX_ACTIVE, MIN_ACTIVE, QueueConfig,
};
pub use error::{QueueError, TransferError};
pub use filename::{FALLBACK_FILENAME, filename_from_url, sanitize_filename};
pub use task::{Task, TaskEvent, TaskStatus};

use crate::crawl::Resource;
use crate::fetch::HttpClient;
use transfer::TransferJob;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 1024;

/// Handle to a download queue.
///
/// Cheap to clone; clones share the same task list.
#[derive(Debug, Clone)]
pub struct DownloadQueue {
    shared: Arc<Shared>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<QueueState>,
    config: QueueConfig,
    client: HttpClient,
    runtime: Handle,
    events: broadcast::Sender<TaskEvent>,
    idle: Notify,
    next_id: AtomicU64,
}

#[derive(Debug, Default)]
struct QueueState {
    tasks: Vec<TaskSlot>,
    active_count: usize,
    aborting_all: bool,
    next_generation: u64,
}

#[derive(Debug)]
struct TaskSlot {
    task: Task,
    transfer: Option<TransferHandle>,
}

/// Identifies the transfer currently owning a loading task.
#[derive(Debug)]
struct TransferHandle {
    token: CancellationToken,
    generation: u64,
}

impl DownloadQueue {
    /// Creates a queue with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if `config` is invalid or no Tokio runtime is
    /// running.
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        Self::with_client(config, HttpClient::new())
    }

    /// Creates a queue that transfers through `client`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if `config` is invalid or no Tokio runtime is
    /// running.
    pub fn with_client(config: QueueConfig, client: HttpClient) -> Result<Self, QueueError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        debug!(max_active = config.max_active, "download queue created");
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                config,
                client,
                runtime,
                events,
                idle: Notify::new(),
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Creates a task for `url` in `target_directory` and admits it.
    ///
    /// The task starts loading right away if a slot is free, otherwise it
    /// waits. Returns a snapshot taken after admission.
    #[instrument(skip(self, target_directory))]
    pub fn add_task(&self, url: &str, target_directory: impl AsRef<Path>) -> Task {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Task::new(
            id,
            url,
            target_directory.as_ref(),
            &self.shared.config.staging_suffix,
        );

        let mut state = self.shared.lock();
        state.tasks.push(TaskSlot {
            task,
            transfer: None,
        });
        let index = state.tasks.len() - 1;
        self.shared.resume_locked(&mut state, index);
        state.tasks[index].task.clone()
    }

    /// Adds one task per resource, in order.
    pub fn add_resources(
        &self,
        resources: &[Resource],
        target_directory: impl AsRef<Path>,
    ) -> Vec<Task> {
        let target_directory = target_directory.as_ref();
        resources
            .iter()
            .map(|resource| self.add_task(&resource.url, target_directory))
            .collect()
    }

    /// Starts or queues a task that is not loading or finished.
    ///
    /// A no-op on `loading` and `success` tasks.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::TaskNotFound`] for an unknown id.
    pub fn resume(&self, id: u64) -> Result<(), QueueError> {
        let mut state = self.shared.lock();
        let index = find(&state, id)?;
        self.shared.resume_locked(&mut state, index);
        Ok(())
    }

    /// Stops a loading or waiting task.
    ///
    /// A loading task gives up its slot to the earliest waiting task and its
    /// staging file is deleted. No effect on finished tasks.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::TaskNotFound`] for an unknown id.
    pub fn abort(&self, id: u64) -> Result<(), QueueError> {
        let mut state = self.shared.lock();
        let index = find(&state, id)?;
        self.shared.abort_locked(&mut state, index);
        Ok(())
    }

    /// Aborts a task and removes it from the list.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::TaskNotFound`] for an unknown id.
    pub fn remove_task(&self, id: u64) -> Result<Task, QueueError> {
        let mut state = self.shared.lock();
        let index = find(&state, id)?;
        self.shared.abort_locked(&mut state, index);
        let removed = state.tasks.remove(index).task;
        self.shared.idle.notify_waiters();
        Ok(removed)
    }

    /// Aborts every task without promoting any waiting task.
    pub fn abort_all(&self) {
        let mut state = self.shared.lock();
        self.shared.abort_all_locked(&mut state);
    }

    /// Resumes every task in list order.
    pub fn resume_all(&self) {
        let mut state = self.shared.lock();
        for index in 0..state.tasks.len() {
            self.shared.resume_locked(&mut state, index);
        }
    }

    /// Aborts every task and empties the list.
    pub fn clear_task_list(&self) {
        let mut state = self.shared.lock();
        self.shared.abort_all_locked(&mut state);
        state.tasks.clear();
        self.shared.idle.notify_waiters();
    }

    /// Snapshots of every task, in creation order.
    #[must_use]
    pub fn task_list(&self) -> Vec<Task> {
        self.shared
            .lock()
            .tasks
            .iter()
            .map(|slot| slot.task.clone())
            .collect()
    }

    /// Snapshot of one task.
    #[must_use]
    pub fn task(&self, id: u64) -> Option<Task> {
        let state = self.shared.lock();
        state
            .tasks
            .iter()
            .find(|slot| slot.task.id == id)
            .map(|slot| slot.task.clone())
    }

    /// Number of tasks currently loading.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.shared.lock().active_count
    }

    /// The concurrency ceiling.
    #[must_use]
    pub fn max_active(&self) -> usize {
        self.shared.config.max_active
    }

    /// Subscribes to task events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.shared.events.subscribe()
    }

    /// Resolves once no task is loading or waiting.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

fn find(state: &QueueState, id: u64) -> Result<usize, QueueError> {
    state
        .tasks
        .iter()
        .position(|slot| slot.task.id == id)
        .ok_or(QueueError::TaskNotFound { id })
}

/// Deletes `path`, treating a missing file as success.
fn remove_staging(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "staging file removed"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove staging file"),
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_idle(&self) -> bool {
        !self
            .lock()
            .tasks
            .iter()
            .any(|slot| slot.task.status.is_pending())
    }

    fn publish(&self, task: &Task) {
        // No receivers is fine.
        let _ = self.events.send(task.event());
        self.idle.notify_waiters();
    }

    fn resume_locked(self: &Arc<Self>, state: &mut QueueState, index: usize) {
        let status = state.tasks[index].task.status;
        match status {
            TaskStatus::Loading | TaskStatus::Success => {}
            _ if state.active_count < self.config.max_active => {
                self.start_locked(state, index);
            }
            _ => {
                let task = &mut state.tasks[index].task;
                if task.status != TaskStatus::Waiting {
                    task.status = TaskStatus::Waiting;
                    task.error = None;
                    debug!(task_id = task.id, "task waiting for a slot");
                    self.publish(task);
                }
            }
        }
    }

    fn start_locked(self: &Arc<Self>, state: &mut QueueState, index: usize) {
        state.next_generation += 1;
        state.active_count += 1;
        let generation = state.next_generation;
        let token = CancellationToken::new();

        let slot = &mut state.tasks[index];
        slot.task.status = TaskStatus::Loading;
        slot.task.progress = 0;
        slot.task.restarts = 0;
        slot.task.error = None;
        slot.transfer = Some(TransferHandle {
            token: token.clone(),
            generation,
        });

        let job = TransferJob {
            id: slot.task.id,
            generation,
            token,
            url: slot.task.url.clone(),
            target_directory: slot.task.target_directory.clone(),
            staging_path: slot.task.staging_path.clone(),
        };
        debug!(task_id = job.id, generation, url = %job.url, "task loading");
        self.publish(&slot.task);

        self.runtime.spawn(transfer::run(Arc::clone(self), job));
    }

    fn abort_locked(self: &Arc<Self>, state: &mut QueueState, index: usize) {
        let slot = &mut state.tasks[index];
        match slot.task.status {
            TaskStatus::Loading => {
                if let Some(handle) = slot.transfer.take() {
                    handle.token.cancel();
                }
                slot.task.status = TaskStatus::Aborted;
                // Removed under the lock so a resume can't recreate the
                // staging file before this delete lands.
                remove_staging(&slot.task.staging_path);
                info!(task_id = slot.task.id, "task aborted");
                self.publish(&slot.task);

                state.active_count = state.active_count.saturating_sub(1);
                if !state.aborting_all {
                    self.promote_locked(state);
                }
            }
            TaskStatus::New | TaskStatus::Waiting => {
                slot.task.status = TaskStatus::Aborted;
                debug!(task_id = slot.task.id, "waiting task aborted");
                self.publish(&slot.task);
            }
            TaskStatus::Aborted | TaskStatus::Success | TaskStatus::Fail => {}
        }
    }

    fn abort_all_locked(self: &Arc<Self>, state: &mut QueueState) {
        state.aborting_all = true;
        for index in 0..state.tasks.len() {
            self.abort_locked(state, index);
        }
        state.aborting_all = false;
    }

    /// Starts waiting tasks, earliest first, until the ceiling is reached.
    fn promote_locked(self: &Arc<Self>, state: &mut QueueState) {
        while state.active_count < self.config.max_active {
            let Some(index) = state
                .tasks
                .iter()
                .position(|slot| slot.task.status == TaskStatus::Waiting)
            else {
                break;
            };
            self.start_locked(state, index);
        }
    }

    /// Index of the task `job` belongs to, if that transfer still owns it.
    fn current_index(state: &QueueState, job: &TransferJob) -> Option<usize> {
        state.tasks.iter().position(|slot| {
            slot.task.id == job.id
                && slot.task.status == TaskStatus::Loading
                && slot
                    .transfer
                    .as_ref()
                    .is_some_and(|handle| handle.generation == job.generation)
        })
    }

    /// Stall timeout at the current load.
    pub(crate) fn stall_timeout(&self) -> Duration {
        let active = self.lock().active_count;
        self.config.stall_timeout(active)
    }

    pub(crate) fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Resets progress for a new attempt; false if the transfer is stale.
    pub(crate) fn begin_attempt(&self, job: &TransferJob, restart: bool) -> bool {
        let mut state = self.lock();
        let Some(index) = Self::current_index(&state, job) else {
            return false;
        };
        let task = &mut state.tasks[index].task;
        let changed = task.progress != 0;
        task.progress = 0;
        if restart {
            task.restarts += 1;
        }
        if changed {
            self.publish(task);
        }
        true
    }

    pub(crate) fn report_progress(&self, job: &TransferJob, progress: u8) {
        let mut state = self.lock();
        let Some(index) = Self::current_index(&state, job) else {
            return;
        };
        let task = &mut state.tasks[index].task;
        if progress > task.progress {
            task.progress = progress;
            self.publish(task);
        }
    }

    /// Resolves a transfer: renames or removes the staging file, records the
    /// terminal status and frees the slot.
    pub(crate) fn finish(self: &Arc<Self>, job: &TransferJob, result: Result<(), TransferError>) {
        let mut state = self.lock();
        let Some(index) = Self::current_index(&state, job) else {
            debug!(task_id = job.id, generation = job.generation, "stale transfer finished");
            Self::discard_locked(&state, job);
            return;
        };

        let slot = &mut state.tasks[index];
        slot.transfer = None;
        let task = &mut slot.task;
        // Blocking rename under the lock: the file becomes final in the
        // same step as `success`, so no abort or resume can slip between.
        // A same-directory rename is a single metadata update.
        let result = result.and_then(|()| {
            std::fs::rename(&task.staging_path, &task.target_file_path)
                .map_err(|e| TransferError::io(&task.target_file_path, e))
        });
        match result {
            Ok(()) => {
                task.status = TaskStatus::Success;
                task.progress = 100;
                info!(
                    task_id = task.id,
                    path = %task.target_file_path.display(),
                    restarts = task.restarts,
                    "download complete"
                );
            }
            Err(error) => {
                remove_staging(&task.staging_path);
                task.status = TaskStatus::Fail;
                warn!(task_id = task.id, url = %task.url, error = %error, "download failed");
                task.error = Some(error.to_string());
            }
        }
        self.publish(task);

        state.active_count = state.active_count.saturating_sub(1);
        if !state.aborting_all {
            self.promote_locked(&mut state);
        }
    }

    /// Cleans up after a transfer that lost ownership of its task.
    pub(crate) fn discard(&self, job: &TransferJob) {
        let state = self.lock();
        Self::discard_locked(&state, job);
    }

    /// Removes the staging file unless another loading transfer writes to
    /// the same path.
    fn discard_locked(state: &QueueState, job: &TransferJob) {
        let in_use = state.tasks.iter().any(|slot| {
            slot.task.status == TaskStatus::Loading
                && slot.task.staging_path == job.staging_path
                && slot
                    .transfer
                    .as_ref()
                    .is_some_and(|handle| handle.generation != job.generation)
        });
        if !in_use {
            remove_staging(&job.staging_path);
        }
    }
}
