//! Domain operations against the remote project-management service.
//!
//! [`RemoteApi`] is the seam between the coordinator and the wire: the
//! HTTP-backed [`RemoteClient`] implements it for production, and tests
//! drive the coordinator through mock implementations. The client owns a
//! run-scoped response cache that deduplicates bootstrap reads; the
//! coordinator clears it at run end.
//!
//! Every operation is idempotent except the additive participant call
//! and the planned-effort top-up, both safe to re-run: participant
//! addition is a set union and top-ups never decrease an allocation.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::http::Transport;
use crate::types::{MemberDirectory, ReminderRule, RemoteTask, TasklistIds};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, SecondsFormat, Utc};
use moka::future::Cache;
use reqwest::Method;
use serde_json::{json, Value};

/// UTC hour start dates are anchored to (09:00 in the service's home
/// UTC+8 timezone).
const START_HOUR: u32 = 1;

/// UTC hour due dates are anchored to (18:00 in the service's home
/// UTC+8 timezone).
const DUE_HOUR: u32 = 10;

/// Bootstrap responses cached per run; a handful of distinct URLs.
const CACHE_CAPACITY: u64 = 32;

/// Remote operations the sync engine depends on.
///
/// Implementations must be `Send + Sync`; the coordinator calls them
/// from concurrently running task futures.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Resolve the organization id owning the project.
    async fn resolve_organization(&self, project_id: &str) -> Result<String>;

    /// Resolve the default tasklist id and the global smart-group id.
    async fn resolve_tasklists(&self, project_id: &str) -> Result<TasklistIds>;

    /// Fetch and merge the project's member rosters into a name → id
    /// directory. The linked external roster degrades to empty on
    /// failure instead of aborting the run.
    async fn fetch_members(
        &self,
        project_id: &str,
        organization_id: &str,
    ) -> Result<MemberDirectory>;

    /// Snapshot the remote task index (id and display name) for the
    /// default tasklist, in stable fetch order.
    async fn fetch_task_index(
        &self,
        project_id: &str,
        lists: &TasklistIds,
    ) -> Result<Vec<RemoteTask>>;

    /// Update a task's start and/or due date in one call.
    async fn update_schedule(
        &self,
        task_id: &str,
        start: Option<NaiveDate>,
        due: Option<NaiveDate>,
    ) -> Result<()>;

    /// Set a task's reminder rule; [`ReminderRule::None`] clears it.
    async fn set_reminder(&self, task_id: &str, rule: ReminderRule) -> Result<()>;

    /// Set the task's sole executor.
    async fn set_executor(&self, task_id: &str, member_id: &str) -> Result<()>;

    /// Add members as additional participants (set union, never
    /// replaces existing participants).
    async fn add_involvers(&self, task_id: &str, member_ids: &[String]) -> Result<()>;

    /// Currently recorded planned effort for one person on one task, in
    /// milliseconds. Absence of any entry reads as zero.
    async fn planned_millis(&self, task_id: &str, member_id: &str) -> Result<i64>;

    /// Record an additional planned-effort entry. `millis` must be the
    /// positive delta to add, never a total or a decrease.
    async fn add_planned_millis(
        &self,
        task_id: &str,
        member_id: &str,
        millis: i64,
        submitter_id: &str,
    ) -> Result<()>;

    /// Drop the run-scoped response cache.
    async fn clear_cache(&self);
}

/// Extract the project id from a project reference: either a bare id or
/// a full project URL. In a URL the id is the segment following
/// `project`/`projects`, or the last non-empty path segment when no such
/// marker is present.
pub fn project_id_from_reference(reference: &str) -> Result<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(SyncError::Config("project reference must not be empty".into()));
    }
    if !reference.contains("://") {
        return Ok(reference.to_string());
    }
    let url = url::Url::parse(reference)
        .map_err(|e| SyncError::Config(format!("invalid project URL {reference:?}: {e}")))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let after_marker = segments
        .iter()
        .position(|s| *s == "project" || *s == "projects")
        .and_then(|i| segments.get(i + 1));
    after_marker
        .or_else(|| segments.last())
        .map(|s| (*s).to_string())
        .ok_or_else(|| {
            SyncError::Config(format!("project URL {reference:?} has no path segments"))
        })
}

/// RFC 3339 timestamp for `date` anchored at `hour:00:00` UTC.
fn anchored_timestamp(date: NaiveDate, hour: u32) -> String {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse `{name, id}` pairs out of a roster response array. Entries use
/// `userId` where present, falling back to `_id`; entries without a name
/// or id are dropped.
fn roster_entries(body: &Value) -> Vec<(String, String)> {
    let Some(items) = body.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            let id = item
                .get("userId")
                .and_then(Value::as_str)
                .or_else(|| item.get("_id").and_then(Value::as_str))?;
            Some((name.to_string(), id.to_string()))
        })
        .collect()
}

/// Merge rosters into the member directory. The secondary roster is
/// inserted last and overwrites the primary on name collision (plain
/// object-spread union semantics).
fn merge_rosters(
    primary: Vec<(String, String)>,
    secondary: Vec<(String, String)>,
) -> MemberDirectory {
    let mut directory = MemberDirectory::new();
    for (name, id) in primary.into_iter().chain(secondary) {
        directory.insert(name, id);
    }
    directory
}

/// Sum one person's recorded planned time out of a work-time entry
/// listing. Non-array bodies and malformed entries read as zero.
fn sum_planned(body: &Value, member_id: &str) -> i64 {
    let entries = body
        .as_array()
        .or_else(|| body.get("result").and_then(Value::as_array));
    let Some(entries) = entries else {
        return 0;
    };
    entries
        .iter()
        .filter(|entry| entry.get("userId").and_then(Value::as_str) == Some(member_id))
        .filter_map(|entry| entry.get("planTime").and_then(Value::as_i64))
        .sum()
}

/// Pick the default tasklist id out of the tasklist listing: the entry
/// flagged `isDefault`, or the first entry.
fn default_tasklist_id(body: &Value) -> Option<String> {
    let lists = body.as_array()?;
    let chosen = lists
        .iter()
        .find(|list| list.get("isDefault").and_then(Value::as_bool) == Some(true))
        .or_else(|| lists.first())?;
    chosen
        .get("_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// HTTP-backed implementation of [`RemoteApi`].
pub struct RemoteClient {
    base_url: String,
    page_size: usize,
    transport: Transport,
    bootstrap_cache: Cache<String, Value>,
}

impl RemoteClient {
    /// Build the client from config.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Http`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            transport: Transport::new(config)?,
            bootstrap_cache: Cache::builder().max_capacity(CACHE_CAPACITY).build(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET with write-once-per-key dedup through the run-scoped cache.
    async fn get_cached(&self, url: &str) -> Result<Value> {
        if let Some(hit) = self.bootstrap_cache.get(url).await {
            tracing::debug!(%url, "bootstrap cache hit");
            return Ok(hit);
        }
        let body = self.transport.request(Method::GET, url, None).await?;
        self.bootstrap_cache
            .insert(url.to_string(), body.clone())
            .await;
        Ok(body)
    }
}

#[async_trait]
impl RemoteApi for RemoteClient {
    async fn resolve_organization(&self, project_id: &str) -> Result<String> {
        let url = self.endpoint(&format!("/api/projects/{project_id}"));
        let body = self.get_cached(&url).await?;
        body.get("_organizationId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                SyncError::Bootstrap("project response carried no organization id".into())
            })
    }

    async fn resolve_tasklists(&self, project_id: &str) -> Result<TasklistIds> {
        let url = self.endpoint(&format!("/api/projects/{project_id}/tasklists"));
        let body = self.get_cached(&url).await?;
        let tasklist_id = default_tasklist_id(&body)
            .ok_or_else(|| SyncError::Bootstrap("project has no tasklists".into()))?;

        let url = self.endpoint(&format!("/api/projects/{project_id}/smartgroups?type=global"));
        let body = self.get_cached(&url).await?;
        let smart_group_id = body
            .as_array()
            .and_then(|groups| groups.first())
            .and_then(|group| group.get("_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SyncError::Bootstrap("project has no global smart group".into()))?;

        Ok(TasklistIds {
            tasklist_id,
            smart_group_id,
        })
    }

    async fn fetch_members(
        &self,
        project_id: &str,
        organization_id: &str,
    ) -> Result<MemberDirectory> {
        let url = self.endpoint(&format!("/api/projects/{project_id}/members"));
        let primary = roster_entries(&self.get_cached(&url).await?);

        let url = self.endpoint(&format!(
            "/api/organizations/{organization_id}/members/links?projectId={project_id}"
        ));
        let linked = match self.get_cached(&url).await {
            Ok(body) => roster_entries(&body),
            Err(e) => {
                tracing::warn!(error = %e, "linked member roster unavailable, continuing without it");
                Vec::new()
            }
        };

        Ok(merge_rosters(primary, linked))
    }

    async fn fetch_task_index(
        &self,
        _project_id: &str,
        lists: &TasklistIds,
    ) -> Result<Vec<RemoteTask>> {
        let mut index = Vec::new();
        let mut page = 1usize;
        loop {
            let url = self.endpoint(&format!(
                "/api/smartgroups/{}/tasks?tasklistId={}&pageSize={}&page={page}",
                lists.smart_group_id, lists.tasklist_id, self.page_size
            ));
            let body = self.transport.request(Method::GET, &url, None).await?;
            let Some(items) = body.as_array() else {
                return Err(SyncError::Bootstrap("task listing was not an array".into()));
            };

            let fetched = items.len();
            for item in items {
                let id = item.get("_id").and_then(Value::as_str);
                let name = item.get("content").and_then(Value::as_str);
                if let (Some(id), Some(name)) = (id, name) {
                    index.push(RemoteTask {
                        id: id.to_string(),
                        name: name.to_string(),
                    });
                }
            }
            if fetched < self.page_size {
                break;
            }
            page += 1;
        }
        Ok(index)
    }

    async fn update_schedule(
        &self,
        task_id: &str,
        start: Option<NaiveDate>,
        due: Option<NaiveDate>,
    ) -> Result<()> {
        let mut body = json!({});
        if let Some(start) = start {
            body["startDate"] = json!(anchored_timestamp(start, START_HOUR));
        }
        if let Some(due) = due {
            body["dueDate"] = json!(anchored_timestamp(due, DUE_HOUR));
        }
        let url = self.endpoint(&format!("/api/tasks/{task_id}/dates"));
        self.transport
            .request(Method::PUT, &url, Some(&body))
            .await
            .map(|_| ())
    }

    async fn set_reminder(&self, task_id: &str, rule: ReminderRule) -> Result<()> {
        let rules: Vec<&str> = rule.rule_string().into_iter().collect();
        let url = self.endpoint(&format!("/api/tasks/{task_id}/reminder"));
        self.transport
            .request(Method::PUT, &url, Some(&json!({ "rules": rules })))
            .await
            .map(|_| ())
    }

    async fn set_executor(&self, task_id: &str, member_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/api/tasks/{task_id}/executor"));
        self.transport
            .request(Method::PUT, &url, Some(&json!({ "executorId": member_id })))
            .await
            .map(|_| ())
    }

    async fn add_involvers(&self, task_id: &str, member_ids: &[String]) -> Result<()> {
        let url = self.endpoint(&format!("/api/tasks/{task_id}/involvers"));
        self.transport
            .request(
                Method::PUT,
                &url,
                Some(&json!({ "addInvolvers": member_ids })),
            )
            .await
            .map(|_| ())
    }

    async fn planned_millis(&self, task_id: &str, member_id: &str) -> Result<i64> {
        let url = self.endpoint(&format!("/api/tasks/{task_id}/worktimes"));
        let body = self.transport.request(Method::GET, &url, None).await?;
        Ok(sum_planned(&body, member_id))
    }

    async fn add_planned_millis(
        &self,
        task_id: &str,
        member_id: &str,
        millis: i64,
        submitter_id: &str,
    ) -> Result<()> {
        let body = json!({
            "taskId": task_id,
            "userId": member_id,
            "planTime": millis,
            "submitterId": submitter_id,
            "date": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        let url = self.endpoint("/api/worktimes");
        self.transport
            .request(Method::POST, &url, Some(&body))
            .await
            .map(|_| ())
    }

    async fn clear_cache(&self) {
        self.bootstrap_cache.invalidate_all();
    }
}
