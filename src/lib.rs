//! Task reconciliation and synchronisation engine.
//!
//! `tasksync` pushes locally described work items into a remote
//! project-management backend. A run matches each source task to a
//! remote task record by name (exact first, then fuzzy edit-distance),
//! then applies the populated fields: schedule dates, reminder rule,
//! executor, involvers and planned effort. Remote calls flow through a
//! sliding-window rate limiter and a retrying HTTP transport; tasks are
//! processed in sequential batches with bounded in-batch concurrency.
//!
//! # Quick start
//!
//! ```no_run
//! use tasksync::{SourceTask, SyncConfig};
//!
//! # async fn run() -> tasksync::Result<()> {
//! let config = SyncConfig::new(
//!     "https://pm.example.com",
//!     "https://pm.example.com/project/5f1a2b3c4d",
//!     "SESSION=abc123",
//! );
//! let tasks: Vec<SourceTask> = Vec::new();
//! let stats = tasksync::sync(&tasks, config).await?;
//! println!("{} updated, {} failed", stats.success, stats.failed);
//! # Ok(())
//! # }
//! ```
//!
//! For progress reporting or cooperative cancellation, build a
//! [`SyncCoordinator`] directly.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod matcher;
pub mod plan;
pub mod progress;
pub mod rate_limit;
pub mod remote;
pub mod types;

pub use config::SyncConfig;
pub use coordinator::SyncCoordinator;
pub use error::{Result, SyncError};
pub use progress::{LogLevel, ProgressEvent};
pub use types::{
    FailedTask, MemberDirectory, ReminderRule, RemoteTask, SourceTask, SyncStats, TasklistIds,
};

/// Run a one-shot sync with the default HTTP backend.
///
/// Convenience wrapper over [`SyncCoordinator`]; events go to `tracing`
/// only.
///
/// # Errors
///
/// Returns [`SyncError::Config`] for invalid configuration,
/// [`SyncError::Bootstrap`] when project metadata cannot be resolved, or
/// [`SyncError::Http`] if the HTTP client cannot be built.
pub async fn sync(tasks: &[SourceTask], config: SyncConfig) -> Result<SyncStats> {
    let coordinator = SyncCoordinator::new(config)?;
    coordinator.sync(tasks).await
}
