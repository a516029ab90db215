//! Core types for source tasks, remote task records and run statistics.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;

/// Name → member id directory merged from the project's member rosters.
pub type MemberDirectory = HashMap<String, String>;

/// One locally-authored work item, produced by the (external) spreadsheet
/// ingestion component. Immutable input to the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTask {
    /// Optional task number prefixed to the title when composing the
    /// display name (e.g. `"1.2"`).
    pub task_number: Option<String>,
    /// Task title as authored in the sheet.
    pub title: String,
    /// Planned start date.
    pub start_date: Option<NaiveDate>,
    /// Planned due date.
    pub due_date: Option<NaiveDate>,
    /// Human-readable reminder rule label (e.g. `"1 day before due"`).
    pub reminder: Option<String>,
    /// Display name of the person responsible for the task.
    pub executor_name: Option<String>,
    /// Display names of additional participants.
    pub involver_names: Vec<String>,
    /// Planned effort in hours for the executor.
    pub planned_hours: Option<f64>,
    /// 1-based row number in the source sheet, for error reporting.
    pub origin_row: usize,
}

impl SourceTask {
    /// Composed display name used for matching against remote tasks:
    /// `"{task_number} {title}"`, trimmed.
    pub fn display_name(&self) -> String {
        match &self.task_number {
            Some(number) => format!("{} {}", number, self.title).trim().to_string(),
            None => self.title.trim().to_string(),
        }
    }
}

/// An existing work item record in the remote service, snapshotted once
/// per run. Kept in fetch order so name collisions resolve to the first
/// occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTask {
    /// Remote task identifier.
    pub id: String,
    /// Current display name of the task.
    pub name: String,
}

/// Tasklist identifiers resolved during bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasklistIds {
    /// The project's default tasklist; task updates are scoped to it.
    pub tasklist_id: String,
    /// The global smart-group id used to query the task index in a
    /// stable order.
    pub smart_group_id: String,
}

/// Reminder rules the sheet can request, mapped to the service's
/// rule-string syntax. Unrecognised labels map to [`ReminderRule::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderRule {
    /// Remind when the task starts.
    OnStart,
    /// Remind five minutes before the start date.
    FiveMinutesBeforeStart,
    /// Remind when the task is due.
    OnDue,
    /// Remind one day before the due date.
    OneDayBeforeDue,
    /// No reminder; clears any existing rule.
    None,
}

impl ReminderRule {
    /// Parse a human-readable rule label from the sheet. Matching is
    /// case-insensitive; anything unrecognised means no reminder.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "on start" => Self::OnStart,
            "5 minutes before start" => Self::FiveMinutesBeforeStart,
            "on due" => Self::OnDue,
            "1 day before due" => Self::OneDayBeforeDue,
            _ => Self::None,
        }
    }

    /// The service's rule-string for this reminder, or `None` for no
    /// reminder (the service expects an empty rule list).
    pub fn rule_string(&self) -> Option<&'static str> {
        match self {
            Self::OnStart => Some("startDate"),
            Self::FiveMinutesBeforeStart => Some("startDate:-PT5M"),
            Self::OnDue => Some("dueDate"),
            Self::OneDayBeforeDue => Some("dueDate:-P1D"),
            Self::None => None,
        }
    }
}

impl fmt::Display for ReminderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::OnStart => "on start",
            Self::FiveMinutesBeforeStart => "5 minutes before start",
            Self::OnDue => "on due",
            Self::OneDayBeforeDue => "1 day before due",
            Self::None => "none",
        };
        f.write_str(label)
    }
}

/// A task that failed at least one attempted field update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTask {
    /// Source sheet row of the failing task.
    pub row: usize,
    /// Composed display name of the task.
    pub task_name: String,
    /// Summary of the per-field failures.
    pub error: String,
}

/// Outcome statistics for one sync run. Created fresh per run and
/// returned at completion or after a cooperative stop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Number of source tasks handed to the run.
    pub total: usize,
    /// Tasks whose attempted field updates all succeeded.
    pub success: usize,
    /// Tasks with at least one failed attempted field.
    pub failed: usize,
    /// Tasks with no acceptable remote match.
    pub skipped: usize,
    /// Detail rows for every failed task.
    pub failed_tasks: Vec<FailedTask>,
}

impl SyncStats {
    /// Fresh statistics for a run over `total` source tasks.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Record a task whose attempted fields all succeeded.
    pub fn record_success(&mut self) {
        self.success += 1;
    }

    /// Record a task that could not be matched to a remote record.
    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Record a task with at least one failed field update.
    pub fn record_failure(&mut self, row: usize, task_name: impl Into<String>, error: impl Into<String>) {
        self.failed += 1;
        self.failed_tasks.push(FailedTask {
            row,
            task_name: task_name.into(),
            error: error.into(),
        });
    }

    /// Number of tasks accounted for so far. Less than `total` when a
    /// run is stopped before the last batch.
    pub fn processed(&self) -> usize {
        self.success + self.failed + self.skipped
    }
}
