//! Per-task update plans: one tagged struct per field category.
//!
//! A [`TaskUpdatePlan`] is built once per source task from the task's
//! populated fields and the resolved member directory. Each field is
//! explicitly optional; the coordinator attempts exactly the fields that
//! are present and treats the rest as skipped.

use crate::types::{MemberDirectory, ReminderRule, SourceTask};
use chrono::NaiveDate;

/// Combined start/due date update, posted as one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleUpdate {
    /// New start date, if the sheet provided one.
    pub start: Option<NaiveDate>,
    /// New due date, if the sheet provided one.
    pub due: Option<NaiveDate>,
}

/// Reminder rule update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderUpdate {
    /// Parsed rule; unrecognised sheet labels arrive as
    /// [`ReminderRule::None`].
    pub rule: ReminderRule,
}

/// Sole-executor update. Only built when the executor name resolved to a
/// known member id; an unresolved name skips the field silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorUpdate {
    /// Resolved member id of the executor.
    pub member_id: String,
}

/// Additive participant update. Unresolved names are filtered out; the
/// update is only built when at least one name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvolverUpdate {
    /// Resolved member ids to add as participants.
    pub member_ids: Vec<String>,
}

/// Planned-effort top-up for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTimeUpdate {
    /// Member the effort is allocated to (the resolved executor).
    pub member_id: String,
    /// Requested total allocation in milliseconds.
    pub millis: i64,
}

/// Planned effort has hard prerequisites (resolved executor, both dates,
/// a configured manager identity). When the sheet requests it but a
/// prerequisite is missing, the field is a recorded failure rather than
/// a silent skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedTime {
    /// All prerequisites present; the update can be attempted.
    Ready(PlannedTimeUpdate),
    /// Requested but unattemptable; carries the reason for the failure
    /// record.
    Blocked(String),
}

/// Everything to do for one matched task, one optional entry per field
/// category.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdatePlan {
    /// Combined start/due update.
    pub schedule: Option<ScheduleUpdate>,
    /// Reminder rule update.
    pub reminder: Option<ReminderUpdate>,
    /// Executor update.
    pub executor: Option<ExecutorUpdate>,
    /// Additive participants update.
    pub involvers: Option<InvolverUpdate>,
    /// Planned-effort update or its blocking reason.
    pub planned_time: Option<PlannedTime>,
    /// Executor name that was present in the sheet but absent from the
    /// member directory, kept for a warning log.
    pub unresolved_executor: Option<String>,
    /// Involver names dropped because they did not resolve.
    pub unresolved_involvers: Vec<String>,
}

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

impl TaskUpdatePlan {
    /// Build the plan for `task` against the resolved member directory.
    ///
    /// `manager_id` is the planned-effort submitter from config; without
    /// it a requested planned-effort field is blocked.
    pub fn build(task: &SourceTask, members: &MemberDirectory, manager_id: Option<&str>) -> Self {
        let mut plan = Self::default();

        if task.start_date.is_some() || task.due_date.is_some() {
            plan.schedule = Some(ScheduleUpdate {
                start: task.start_date,
                due: task.due_date,
            });
        }

        if let Some(label) = &task.reminder {
            plan.reminder = Some(ReminderUpdate {
                rule: ReminderRule::from_label(label),
            });
        }

        let executor_id = task
            .executor_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| (name, members.get(name)));
        match executor_id {
            Some((_, Some(id))) => {
                plan.executor = Some(ExecutorUpdate {
                    member_id: id.clone(),
                });
            }
            Some((name, None)) => plan.unresolved_executor = Some(name.to_string()),
            None => {}
        }

        let mut resolved_involvers = Vec::new();
        for name in &task.involver_names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            match members.get(name) {
                Some(id) => resolved_involvers.push(id.clone()),
                None => plan.unresolved_involvers.push(name.to_string()),
            }
        }
        if !resolved_involvers.is_empty() {
            plan.involvers = Some(InvolverUpdate {
                member_ids: resolved_involvers,
            });
        }

        if let Some(hours) = task.planned_hours {
            plan.planned_time = Some(Self::plan_effort(&plan, task, hours, manager_id));
        }

        plan
    }

    fn plan_effort(
        plan: &Self,
        task: &SourceTask,
        hours: f64,
        manager_id: Option<&str>,
    ) -> PlannedTime {
        let Some(executor) = &plan.executor else {
            return PlannedTime::Blocked("executor did not resolve to a member id".into());
        };
        if task.start_date.is_none() || task.due_date.is_none() {
            return PlannedTime::Blocked("both start and due dates are required".into());
        }
        if manager_id.is_none() {
            return PlannedTime::Blocked("manager identity not configured".into());
        }
        PlannedTime::Ready(PlannedTimeUpdate {
            member_id: executor.member_id.clone(),
            millis: (hours * MILLIS_PER_HOUR).round() as i64,
        })
    }

    /// `true` when no field category has anything to do.
    pub fn is_empty(&self) -> bool {
        self.schedule.is_none()
            && self.reminder.is_none()
            && self.executor.is_none()
            && self.involvers.is_none()
            && self.planned_time.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn members() -> MemberDirectory {
        let mut map = HashMap::new();
        map.insert("Alice".to_string(), "m-alice".to_string());
        map.insert("Bob".to_string(), "m-bob".to_string());
        map
    }

    fn full_task() -> SourceTask {
        SourceTask {
            task_number: Some("1".into()),
            title: "Design Review".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 2),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 6),
            reminder: Some("on due".into()),
            executor_name: Some("Alice".into()),
            involver_names: vec!["Bob".into(), "Mallory".into()],
            planned_hours: Some(3.0),
            origin_row: 2,
        }
    }

    #[test]
    fn full_task_produces_all_fields() {
        let plan = TaskUpdatePlan::build(&full_task(), &members(), Some("m-manager"));

        assert!(plan.schedule.is_some());
        assert_eq!(
            plan.reminder,
            Some(ReminderUpdate {
                rule: ReminderRule::OnDue
            })
        );
        assert_eq!(
            plan.executor.as_ref().map(|e| e.member_id.as_str()),
            Some("m-alice")
        );
        assert_eq!(
            plan.involvers.as_ref().map(|i| i.member_ids.clone()),
            Some(vec!["m-bob".to_string()])
        );
        assert_eq!(plan.unresolved_involvers, vec!["Mallory".to_string()]);
        match plan.planned_time {
            Some(PlannedTime::Ready(update)) => {
                assert_eq!(update.member_id, "m-alice");
                assert_eq!(update.millis, 10_800_000);
            }
            other => panic!("expected ready planned time, got {other:?}"),
        }
    }

    #[test]
    fn empty_task_produces_empty_plan() {
        let task = SourceTask {
            task_number: None,
            title: "Bare".into(),
            start_date: None,
            due_date: None,
            reminder: None,
            executor_name: None,
            involver_names: vec![],
            planned_hours: None,
            origin_row: 3,
        };
        let plan = TaskUpdatePlan::build(&task, &members(), None);
        assert!(plan.is_empty());
    }

    #[test]
    fn start_date_alone_builds_schedule() {
        let task = SourceTask {
            due_date: None,
            reminder: None,
            executor_name: None,
            involver_names: vec![],
            planned_hours: None,
            ..full_task()
        };
        let plan = TaskUpdatePlan::build(&task, &members(), None);
        let schedule = plan.schedule.expect("schedule present");
        assert!(schedule.start.is_some());
        assert!(schedule.due.is_none());
    }

    #[test]
    fn unresolved_executor_is_silently_skipped() {
        let task = SourceTask {
            executor_name: Some("Mallory".into()),
            planned_hours: None,
            ..full_task()
        };
        let plan = TaskUpdatePlan::build(&task, &members(), Some("m-manager"));
        assert!(plan.executor.is_none());
        assert_eq!(plan.unresolved_executor.as_deref(), Some("Mallory"));
    }

    #[test]
    fn all_involvers_unresolved_drops_field() {
        let task = SourceTask {
            involver_names: vec!["Mallory".into(), "Trent".into()],
            ..full_task()
        };
        let plan = TaskUpdatePlan::build(&task, &members(), Some("m-manager"));
        assert!(plan.involvers.is_none());
        assert_eq!(plan.unresolved_involvers.len(), 2);
    }

    #[test]
    fn planned_time_blocked_without_executor() {
        let task = SourceTask {
            executor_name: Some("Mallory".into()),
            ..full_task()
        };
        let plan = TaskUpdatePlan::build(&task, &members(), Some("m-manager"));
        match plan.planned_time {
            Some(PlannedTime::Blocked(reason)) => assert!(reason.contains("executor")),
            other => panic!("expected blocked planned time, got {other:?}"),
        }
    }

    #[test]
    fn planned_time_blocked_without_both_dates() {
        let task = SourceTask {
            due_date: None,
            ..full_task()
        };
        let plan = TaskUpdatePlan::build(&task, &members(), Some("m-manager"));
        match plan.planned_time {
            Some(PlannedTime::Blocked(reason)) => assert!(reason.contains("dates")),
            other => panic!("expected blocked planned time, got {other:?}"),
        }
    }

    #[test]
    fn planned_time_blocked_without_manager() {
        let plan = TaskUpdatePlan::build(&full_task(), &members(), None);
        match plan.planned_time {
            Some(PlannedTime::Blocked(reason)) => assert!(reason.contains("manager")),
            other => panic!("expected blocked planned time, got {other:?}"),
        }
    }

    #[test]
    fn fractional_hours_round_to_millis() {
        let task = SourceTask {
            planned_hours: Some(1.5),
            involver_names: vec![],
            ..full_task()
        };
        let plan = TaskUpdatePlan::build(&task, &members(), Some("m-manager"));
        match plan.planned_time {
            Some(PlannedTime::Ready(update)) => assert_eq!(update.millis, 5_400_000),
            other => panic!("expected ready planned time, got {other:?}"),
        }
    }
}
