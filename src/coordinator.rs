//! Run orchestration: bootstrap, batching, bounded concurrency and
//! per-task field updates.
//!
//! One [`SyncCoordinator::sync`] call is one run. The coordinator
//! resolves project metadata once, snapshots the member directory and
//! the remote task index, then walks the source tasks in sequential
//! batches. Tasks inside a batch run concurrently under a semaphore;
//! per-field failures are folded into the run's [`SyncStats`] without
//! stopping other fields or tasks. Cancellation is cooperative and
//! observed at batch boundaries and per-task starts.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::matcher;
use crate::plan::{PlannedTime, PlannedTimeUpdate, TaskUpdatePlan};
use crate::progress::{LogLevel, ProgressEvent, ProgressSink};
use crate::remote::{project_id_from_reference, RemoteApi, RemoteClient};
use crate::types::{MemberDirectory, RemoteTask, SourceTask, SyncStats};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};

/// Orchestrates sync runs against one remote backend.
///
/// The coordinator owns the run's statistics, the bootstrap snapshots
/// and the cancellation state; none of these persist across runs.
pub struct SyncCoordinator {
    config: SyncConfig,
    remote: Arc<dyn RemoteApi>,
    is_running: AtomicBool,
    cancelled: AtomicBool,
    progress: Option<ProgressSink>,
}

impl SyncCoordinator {
    /// Build a coordinator with an HTTP-backed [`RemoteClient`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Http`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: SyncConfig) -> Result<Self> {
        let remote: Arc<dyn RemoteApi> = Arc::new(RemoteClient::new(&config)?);
        Ok(Self::with_remote(config, remote))
    }

    /// Build a coordinator over an arbitrary [`RemoteApi`] backend.
    /// This is the seam used by tests and custom transports.
    pub fn with_remote(config: SyncConfig, remote: Arc<dyn RemoteApi>) -> Self {
        Self {
            config,
            remote,
            is_running: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            progress: None,
        }
    }

    /// Attach a progress sink receiving every `(message, level)` event.
    #[must_use]
    pub fn on_progress(mut self, sink: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// Request a cooperative stop. Non-blocking; the run halts at the
    /// next batch boundary and in-flight tasks drain.
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Execute one sync run over `tasks`.
    ///
    /// Rejects immediately with [`SyncError::AlreadyRunning`] if a run
    /// is in flight (no queueing). Bootstrap failures abort the run as a
    /// single structured error; per-field failures are recorded in the
    /// returned [`SyncStats`] instead. A run stopped via [`Self::stop`]
    /// still returns its statistics.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadyRunning`], [`SyncError::Config`] or
    /// [`SyncError::Bootstrap`].
    pub async fn sync(&self, tasks: &[SourceTask]) -> Result<SyncStats> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(SyncError::AlreadyRunning);
        }
        self.cancelled.store(false, Ordering::SeqCst);

        let result = self.run(tasks).await;

        self.remote.clear_cache().await;
        self.is_running.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self, tasks: &[SourceTask]) -> Result<SyncStats> {
        self.config.validate()?;

        self.emit(ProgressEvent::info("resolving project metadata"));
        let project_id = project_id_from_reference(&self.config.project)?;
        let organization_id = self
            .remote
            .resolve_organization(&project_id)
            .await
            .map_err(|e| bootstrap_context("organization lookup", &e))?;
        let lists = self
            .remote
            .resolve_tasklists(&project_id)
            .await
            .map_err(|e| bootstrap_context("tasklist lookup", &e))?;
        let members = self
            .remote
            .fetch_members(&project_id, &organization_id)
            .await
            .map_err(|e| bootstrap_context("member roster fetch", &e))?;
        let index = self
            .remote
            .fetch_task_index(&project_id, &lists)
            .await
            .map_err(|e| bootstrap_context("task index fetch", &e))?;
        self.emit(ProgressEvent::info(format!(
            "bootstrap complete: {} members, {} remote tasks",
            members.len(),
            index.len()
        )));

        let stats = Mutex::new(SyncStats::new(tasks.len()));
        let semaphore = Semaphore::new(self.config.max_concurrent);
        let total_batches = tasks.len().div_ceil(self.config.batch_size);

        for (batch_index, batch) in tasks.chunks(self.config.batch_size).enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                self.emit(ProgressEvent::warn(format!(
                    "stop requested, halting before batch {} of {total_batches}",
                    batch_index + 1
                )));
                break;
            }
            self.emit(ProgressEvent::info(format!(
                "batch {} of {total_batches}: {} tasks",
                batch_index + 1,
                batch.len()
            )));

            let batch_futures: Vec<_> = batch
                .iter()
                .map(|task| self.process_task(task, &members, &index, &semaphore, &stats))
                .collect();
            futures::future::join_all(batch_futures).await;
        }

        let stats = stats.into_inner();
        let level = if stats.failed == 0 {
            LogLevel::Success
        } else {
            LogLevel::Warn
        };
        self.emit(ProgressEvent::new(
            level,
            format!(
                "sync finished: {} total, {} updated, {} failed, {} skipped",
                stats.total, stats.success, stats.failed, stats.skipped
            ),
        ));
        Ok(stats)
    }

    /// Resolve one task and attempt each populated field independently.
    async fn process_task(
        &self,
        task: &SourceTask,
        members: &MemberDirectory,
        index: &[RemoteTask],
        semaphore: &Semaphore,
        stats: &Mutex<SyncStats>,
    ) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let Ok(_permit) = semaphore.acquire().await else {
            // The semaphore is never closed during a run.
            return;
        };

        let name = task.display_name();
        let Some(remote_task) = matcher::resolve(&name, index) else {
            stats.lock().await.record_skipped();
            self.emit(ProgressEvent::warn(format!(
                "row {}: no remote task matches {name:?}, skipped",
                task.origin_row
            )));
            return;
        };

        let plan = TaskUpdatePlan::build(task, members, self.config.manager_id.as_deref());
        if let Some(unresolved) = &plan.unresolved_executor {
            tracing::warn!(
                row = task.origin_row,
                executor = %unresolved,
                "executor name not in member directory, field skipped"
            );
        }
        if !plan.unresolved_involvers.is_empty() {
            tracing::warn!(
                row = task.origin_row,
                dropped = ?plan.unresolved_involvers,
                "unresolved involver names filtered out"
            );
        }

        let mut attempted = 0usize;
        let mut failures: Vec<String> = Vec::new();

        if let Some(schedule) = &plan.schedule {
            attempted += 1;
            if let Err(e) = self
                .remote
                .update_schedule(&remote_task.id, schedule.start, schedule.due)
                .await
            {
                failures.push(format!("schedule: {e}"));
            }
        }

        if let Some(reminder) = &plan.reminder {
            attempted += 1;
            if let Err(e) = self.remote.set_reminder(&remote_task.id, reminder.rule).await {
                failures.push(format!("reminder: {e}"));
            }
        }

        if let Some(executor) = &plan.executor {
            attempted += 1;
            if let Err(e) = self
                .remote
                .set_executor(&remote_task.id, &executor.member_id)
                .await
            {
                failures.push(format!("executor: {e}"));
            }
        }

        if let Some(involvers) = &plan.involvers {
            attempted += 1;
            if let Err(e) = self
                .remote
                .add_involvers(&remote_task.id, &involvers.member_ids)
                .await
            {
                failures.push(format!("involvers: {e}"));
            }
        }

        match &plan.planned_time {
            Some(PlannedTime::Ready(update)) => {
                attempted += 1;
                if let Err(e) = self.top_up_planned_time(&remote_task.id, update).await {
                    failures.push(format!("planned time: {e}"));
                }
            }
            Some(PlannedTime::Blocked(reason)) => {
                attempted += 1;
                failures.push(format!("planned time: {reason}"));
            }
            None => {}
        }

        if failures.is_empty() {
            stats.lock().await.record_success();
            let detail = if attempted == 0 {
                "nothing to update".to_string()
            } else {
                format!("{attempted} field(s) updated")
            };
            self.emit(ProgressEvent::success(format!(
                "row {}: {name}: {detail}",
                task.origin_row
            )));
        } else {
            let summary = failures.join("; ");
            stats
                .lock()
                .await
                .record_failure(task.origin_row, name.clone(), summary.clone());
            self.emit(ProgressEvent::error(format!(
                "row {}: {name}: {summary}",
                task.origin_row
            )));
        }
    }

    /// Read the current allocation and submit only a positive delta.
    /// Planned time never decreases within a run.
    async fn top_up_planned_time(&self, task_id: &str, update: &PlannedTimeUpdate) -> Result<()> {
        let current = self.remote.planned_millis(task_id, &update.member_id).await?;
        let delta = update.millis - current;
        if delta <= 0 {
            tracing::debug!(
                task_id,
                current,
                requested = update.millis,
                "planned time already satisfied"
            );
            return Ok(());
        }
        let submitter = self
            .config
            .manager_id
            .as_deref()
            .ok_or_else(|| SyncError::Field("manager identity not configured".into()))?;
        self.remote
            .add_planned_millis(task_id, &update.member_id, delta, submitter)
            .await
    }

    fn emit(&self, event: ProgressEvent) {
        match event.level {
            LogLevel::Info | LogLevel::Success => tracing::info!("{}", event.message),
            LogLevel::Warn => tracing::warn!("{}", event.message),
            LogLevel::Error => tracing::error!("{}", event.message),
        }
        if let Some(sink) = &self.progress {
            sink(event);
        }
    }
}

fn bootstrap_context(stage: &str, error: &SyncError) -> SyncError {
    match error {
        SyncError::Bootstrap(message) => SyncError::Bootstrap(format!("{stage}: {message}")),
        other => SyncError::Bootstrap(format!("{stage}: {other}")),
    }
}
