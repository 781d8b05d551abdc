//! Caller-facing task operations.
//!
//! [`TaskService`] composes the pure engine with a [`TaskStore`]. Every
//! operation validates its input before touching a record, so a returned
//! [`HiveError`] means nothing was written.

use crate::config::Config;
use crate::engine::lifecycle::{self, TransitionOutcome, auto_complete_parent, child_depth};
use crate::engine::{
    CompletionCheck, Settlement, Sleeper, TaskIndex, TokioSleeper, filter_ready, find_stale,
    find_stranded, reaper, stranded, validate_depth, wait_for_settlement,
};
use crate::error::HiveError;
use crate::store::{Partition, TaskStore};
use crate::types::{
    BlockedOn, HumanInput, LogEvent, PROJECT_STATUS_ACTIVE, Project, ProjectTask, StatusCounts,
    Task, TaskStatus,
};
use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Characters of provided human input echoed into the task log.
const INPUT_PREVIEW_CHARS: usize = 50;

/// Attempts at drawing an unused ID before giving up.
const ID_ATTEMPTS: usize = 8;

/// Parse a status name, rejecting unknown values.
pub fn parse_status(value: &str) -> Result<TaskStatus, HiveError> {
    TaskStatus::from_str(value).ok_or_else(|| HiveError::invalid_status(value))
}

/// Parse `key=value` pairs. Splits on the first `=`; the key must be non-empty.
pub fn parse_metadata(pairs: &[String]) -> Result<Vec<(String, String)>, HiveError> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(HiveError::invalid_metadata(pair)),
        })
        .collect()
}

/// Parse `type:title` project task specs. Splits on the first `:`.
pub fn parse_task_specs(specs: &[String]) -> Result<Vec<(String, String)>, HiveError> {
    specs
        .iter()
        .map(|spec| match spec.split_once(':') {
            Some((task_type, title)) if !task_type.is_empty() && !title.is_empty() => {
                Ok((task_type.to_string(), title.to_string()))
            }
            _ => Err(HiveError::invalid_value(
                "tasks",
                format!("Invalid task spec: \"{}\". Use \"type:title\" format.", spec),
            )),
        })
        .collect()
}

fn preview(input: &str) -> String {
    if input.chars().count() > INPUT_PREVIEW_CHARS {
        let head: String = input.chars().take(INPUT_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        input.to_string()
    }
}

/// Input for [`TaskService::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub title: String,
    /// Defaults to the title.
    pub description: Option<String>,
    pub task_type: String,
    pub project_id: Option<String>,
    pub depends_on: Vec<String>,
    /// Overrides the per-type default deadline.
    pub deadline_minutes: Option<u32>,
    pub parent_task: Option<String>,
    /// Raw depth as supplied by the caller. Ignored in favour of the derived
    /// depth when `parent_task` is set, but still validated.
    pub depth: Option<Value>,
    /// `key=value` pairs.
    pub metadata: Vec<String>,
}

impl CreateTask {
    pub fn new(title: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            task_type: task_type.into(),
            ..Self::default()
        }
    }
}

/// Input for [`TaskService::update`]. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub status: Option<TaskStatus>,
    pub owner: Option<String>,
    pub output_path: Option<String>,
    pub blocked_on: Option<BlockedOn>,
    /// Opens a new human-input request, discarding any previous answer.
    pub needs: Option<String>,
    /// `key=value` pairs; an empty value deletes the key.
    pub metadata: Vec<String>,
    /// Log detail; defaults to a list of the changed fields.
    pub message: Option<String>,
}

impl UpdateTask {
    fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.status.is_some() {
            fields.push("status");
        }
        if self.owner.is_some() {
            fields.push("owner");
        }
        if self.output_path.is_some() {
            fields.push("output");
        }
        if self.blocked_on.is_some() {
            fields.push("blocked_on");
        }
        if self.needs.is_some() {
            fields.push("needs");
        }
        if !self.metadata.is_empty() {
            fields.push("metadata");
        }
        fields
    }
}

/// Result of [`TaskService::update`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated {
        task: Task,
        #[serde(skip_serializing_if = "Option::is_none")]
        auto_completed_parent: Option<String>,
    },
    /// The completion guard refused. The task gained a guard log entry and
    /// nothing else: owner, output, blocked_on, needs, metadata and the
    /// message from the same request were not applied.
    CompletionBlocked { task: Task, check: CompletionCheck },
}

impl UpdateOutcome {
    pub fn task(&self) -> &Task {
        match self {
            UpdateOutcome::Updated { task, .. } | UpdateOutcome::CompletionBlocked { task, .. } => {
                task
            }
        }
    }
}

/// Filters for [`TaskService::list`]. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub owner: Option<String>,
    pub project_id: Option<String>,
    pub task_type: Option<String>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self
                .owner
                .as_deref()
                .is_none_or(|o| task.owner.as_deref() == Some(o))
            && self
                .project_id
                .as_deref()
                .is_none_or(|p| task.project_id.as_deref() == Some(p))
            && self.task_type.as_deref().is_none_or(|t| task.task_type == t)
    }
}

/// A task with its children.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub partition: Partition,
    pub task: Task,
    pub children: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockedItem {
    pub task_id: String,
    pub title: String,
    pub needs: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveItem {
    pub task_id: String,
    pub title: String,
    pub owner: Option<String>,
    pub minutes_since_claim: Option<i64>,
}

/// Board overview of the active partition.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSummary {
    pub counts: StatusCounts,
    pub blocked: Vec<BlockedItem>,
    pub active: Vec<ActiveItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrandedTask {
    pub task: Task,
    pub dead_dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaleTask {
    pub task: Task,
    pub idle_minutes: i64,
    pub limit_minutes: u32,
}

/// Input for [`TaskService::create_project`].
#[derive(Debug, Clone, Default)]
pub struct CreateProject {
    pub title: String,
    pub description: String,
    /// `type:title` specs, created in order and chained by dependency.
    pub tasks: Vec<String>,
}

/// Input for [`TaskService::update_project`].
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// A project with the current state of its tasks.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub tasks: Vec<Task>,
    pub counts: StatusCounts,
}

/// Task operations over a store.
pub struct TaskService<S, C> {
    store: S,
    clock: C,
    config: Config,
}

impl<S, C> TaskService<S, C>
where
    S: TaskStore,
    C: Clock,
{
    pub fn new(store: S, clock: C, config: Config) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Identity written to log entries.
    pub fn agent(&self) -> &str {
        &self.config.agent
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// `YYYYMMDD-HHMMSS-xxxx` in local time with four random hex digits.
    pub fn generate_id(&self) -> String {
        let stamp = self.clock.local().format("%Y%m%d-%H%M%S");
        let random = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", stamp, &random[..4])
    }

    fn fresh_task_id(&self) -> Result<String> {
        for _ in 0..ID_ATTEMPTS {
            let id = self.generate_id();
            if self.store.find_task(&id)?.is_none() {
                return Ok(id);
            }
        }
        Err(HiveError::internal("could not allocate an unused task ID").into())
    }

    fn fresh_project_id(&self) -> Result<String> {
        for _ in 0..ID_ATTEMPTS {
            let id = self.generate_id();
            if self.store.read_project(&id)?.is_none() {
                return Ok(id);
            }
        }
        Err(HiveError::internal("could not allocate an unused project ID").into())
    }

    /// Active and archived tasks. Dependencies and children may have been archived.
    fn snapshot(&self) -> Result<Vec<Task>> {
        let mut tasks = self.store.read_all_tasks(Partition::Active)?;
        tasks.extend(self.store.read_all_tasks(Partition::Archive)?);
        Ok(tasks)
    }

    fn require_task(&self, task_id: &str) -> Result<(Partition, Task)> {
        self.store
            .find_task(task_id)?
            .ok_or_else(|| HiveError::task_not_found(task_id).into())
    }

    /// Create a pending task.
    pub fn create(&self, request: CreateTask) -> Result<Task> {
        if request.title.trim().is_empty() {
            return Err(HiveError::missing_field("title").into());
        }
        if request.task_type.trim().is_empty() {
            return Err(HiveError::missing_field("type").into());
        }
        let metadata = parse_metadata(&request.metadata)?;
        let explicit_depth = validate_depth(request.depth.as_ref())?;

        let depth = match request.parent_task.as_deref() {
            Some(parent_id) => {
                let (_, parent) = self.require_task(parent_id)?;
                child_depth(&parent)?
            }
            None => explicit_depth,
        };

        let now = self.now();
        let task_id = self.fresh_task_id()?;
        let mut task = Task::new(task_id, request.title, request.task_type, now);
        if let Some(description) = request.description {
            task.description = description;
        }
        task.project_id = request.project_id;
        task.depends_on = request.depends_on;
        task.parent_task = request.parent_task;
        task.depth = depth;
        task.deadline_minutes = request
            .deadline_minutes
            .unwrap_or_else(|| self.config.deadline_for(&task.task_type));
        task.metadata.extend(metadata);
        let detail = format!("Task created: {}", task.title);
        task.push_log(now, LogEvent::Created, self.agent(), detail);

        self.store.write_task(Partition::Active, &task)?;
        info!(task_id = %task.task_id, task_type = %task.task_type, depth, "Created task");
        Ok(task)
    }

    /// Apply an update: guard, status side effects, field changes, one log
    /// entry, then parent auto-completion.
    ///
    /// A completion refused by the guard discards the whole request apart
    /// from the guard log entry; resend the other fields once it succeeds.
    pub fn update(&self, task_id: &str, request: UpdateTask) -> Result<UpdateOutcome> {
        let metadata = parse_metadata(&request.metadata)?;
        let fields = request.changed_fields();
        if fields.is_empty() && request.message.is_none() {
            return Err(HiveError::missing_field("status")
                .with_details("nothing to update")
                .into());
        }

        let (partition, mut task) = self.require_task(task_id)?;

        let target = request.status.unwrap_or(task.status);
        if request.blocked_on.is_some() && target != TaskStatus::Blocked {
            return Err(HiveError::invalid_value(
                "blocked_on",
                format!("blocked_on can only be set on a blocked task (status: {})", target),
            )
            .into());
        }
        if request.owner.is_some() && target == TaskStatus::Pending {
            return Err(
                HiveError::invalid_value("owner", "a pending task cannot have an owner").into(),
            );
        }

        let now = self.now();
        let agent = self.agent().to_string();
        let mut event = LogEvent::Update;

        if let Some(status) = request.status {
            let all = if status == TaskStatus::Completed {
                self.snapshot()?
            } else {
                Vec::new()
            };
            match lifecycle::transition(
                &mut task,
                status,
                request.blocked_on.clone(),
                &all,
                &agent,
                now,
            ) {
                TransitionOutcome::CompletionBlocked(check) => {
                    self.store.write_task(partition, &task)?;
                    warn!(
                        task_id,
                        incomplete = check.incomplete,
                        children = check.children,
                        discarded = %fields.join(", "),
                        "Completion blocked by incomplete children; request not applied"
                    );
                    return Ok(UpdateOutcome::CompletionBlocked { task, check });
                }
                TransitionOutcome::Applied { event: applied } => event = applied,
            }
            if status == TaskStatus::InProgress && request.owner.is_none() && task.owner.is_none()
            {
                task.owner = Some(agent.clone());
            }
        }

        if let Some(owner) = request.owner {
            task.owner = Some(owner);
        }
        if let Some(output) = request.output_path {
            task.output_path = Some(output);
        }
        if let Some(target) = request.blocked_on {
            task.blocked_on = Some(target);
        }
        if let Some(needed) = request.needs {
            task.human_input = Some(HumanInput {
                needed,
                provided: None,
            });
        }
        for (key, value) in metadata {
            if value.is_empty() {
                task.metadata.remove(&key);
            } else {
                task.metadata.insert(key, value);
            }
        }

        let detail = request
            .message
            .unwrap_or_else(|| format!("Updated: {}", fields.join(", ")));
        task.push_log(now, event.clone(), &agent, detail);
        self.store.write_task(partition, &task)?;
        info!(task_id, status = %task.status, event = %event, "Updated task");

        let auto_completed_parent = if task.status == TaskStatus::Completed {
            self.complete_parent_if_done(&task, now)?
        } else {
            None
        };

        Ok(UpdateOutcome::Updated {
            task,
            auto_completed_parent,
        })
    }

    fn complete_parent_if_done(&self, task: &Task, now: DateTime<Utc>) -> Result<Option<String>> {
        let all = self.snapshot()?;
        let Some(parent_id) = lifecycle::should_auto_complete_parent(task, &all) else {
            return Ok(None);
        };
        let Some(mut parent) = self.store.read_task(Partition::Active, parent_id)? else {
            debug!(parent_id, "Parent not active; skipping auto-completion");
            return Ok(None);
        };

        let children = all
            .iter()
            .filter(|t| t.parent_task.as_deref() == Some(parent_id))
            .count();
        if !auto_complete_parent(&mut parent, children, self.agent(), now) {
            debug!(parent_id, status = %parent.status, "Parent not in progress; left as is");
            return Ok(None);
        }
        self.store.write_task(Partition::Active, &parent)?;
        info!(parent_id, children, "Auto-completed parent task");
        Ok(Some(parent.task_id))
    }

    /// Answer a blocked task's request for input and return it to pending.
    pub fn provide_input(&self, task_id: &str, input: &str) -> Result<Task> {
        if input.is_empty() {
            return Err(HiveError::missing_field("input").into());
        }
        let (partition, mut task) = self.require_task(task_id)?;
        if task.status != TaskStatus::Blocked {
            return Err(HiveError::not_blocked(task_id, task.status).into());
        }

        let now = self.now();
        let request = task.human_input.get_or_insert_with(|| HumanInput {
            needed: String::new(),
            provided: None,
        });
        request.provided = Some(input.to_string());
        lifecycle::apply_status(&mut task, TaskStatus::Pending, None, now);
        let detail = format!("Human input provided: {}", preview(input));
        task.push_log(now, LogEvent::Unblocked, self.agent(), detail);

        self.store.write_task(partition, &task)?;
        info!(task_id, "Unblocked task with human input");
        Ok(task)
    }

    /// Active tasks matching `filter`, ordered by ID.
    pub fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let tasks = self.store.read_all_tasks(Partition::Active)?;
        Ok(tasks.into_iter().filter(|t| filter.matches(t)).collect())
    }

    /// A task from either partition, with its active and archived children.
    pub fn show(&self, task_id: &str) -> Result<TaskDetail> {
        let (partition, task) = self.require_task(task_id)?;
        let children = self
            .snapshot()?
            .into_iter()
            .filter(|t| t.parent_task.as_deref() == Some(task_id))
            .collect();
        Ok(TaskDetail {
            partition,
            task,
            children,
        })
    }

    /// Tasks of `agent_type` that can be claimed now.
    pub fn list_ready(&self, agent_type: &str) -> Result<Vec<Task>> {
        let active = self.store.read_all_tasks(Partition::Active)?;
        let all = self.snapshot()?;
        let index = TaskIndex::new(&all);
        let ready: Vec<Task> = filter_ready(&active, agent_type, &index)
            .into_iter()
            .cloned()
            .collect();
        debug!(agent_type, count = ready.len(), "Listed ready tasks");
        Ok(ready)
    }

    pub fn summary(&self) -> Result<BoardSummary> {
        let tasks = self.store.read_all_tasks(Partition::Active)?;
        let now = self.now();

        let blocked = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Blocked)
            .map(|t| {
                let needs = t
                    .human_input
                    .as_ref()
                    .map(|h| h.needed.clone())
                    .filter(|n| !n.is_empty())
                    .or_else(|| t.blocked_on.as_ref().map(ToString::to_string))
                    .unwrap_or_default();
                BlockedItem {
                    task_id: t.task_id.clone(),
                    title: t.title.clone(),
                    needs,
                }
            })
            .collect();

        let active = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .map(|t| ActiveItem {
                task_id: t.task_id.clone(),
                title: t.title.clone(),
                owner: t.owner.clone(),
                minutes_since_claim: t.claimed_at.map(|c| (now - c).num_minutes()),
            })
            .collect();

        Ok(BoardSummary {
            counts: StatusCounts::from_tasks(&tasks),
            blocked,
            active,
        })
    }

    /// Pending tasks that can never become ready.
    pub fn stranded(&self) -> Result<Vec<StrandedTask>> {
        let all = self.snapshot()?;
        let found: Vec<StrandedTask> = find_stranded(&all)
            .into_iter()
            .map(|t| StrandedTask {
                dead_dependencies: stranded::dead_dependencies(t, &all)
                    .into_iter()
                    .map(String::from)
                    .collect(),
                task: t.clone(),
            })
            .collect();
        if !found.is_empty() {
            warn!(count = found.len(), "Found stranded tasks");
        }
        Ok(found)
    }

    /// In-progress tasks past their limit. `threshold` overrides the configured fallback.
    pub fn stale(&self, threshold: Option<u32>) -> Result<Vec<StaleTask>> {
        let fallback = threshold.unwrap_or(self.config.reaper.threshold_minutes);
        let clock = self.config.reaper.activity;
        let now = self.now();
        let tasks = self.store.read_all_tasks(Partition::Active)?;

        let found: Vec<StaleTask> = find_stale(&tasks, fallback, clock, now)
            .into_iter()
            .map(|t| StaleTask {
                idle_minutes: reaper::idle_since(t, clock)
                    .map(|since| (now - since).num_minutes())
                    .unwrap_or_default(),
                limit_minutes: reaper::effective_limit_minutes(t, fallback),
                task: t.clone(),
            })
            .collect();
        if !found.is_empty() {
            warn!(count = found.len(), fallback, "Found stale tasks");
        }
        Ok(found)
    }

    /// Move every settled task to the archive. Returns the archived IDs.
    pub fn archive_terminal(&self) -> Result<Vec<String>> {
        let now = self.now();
        let mut archived = Vec::new();
        for mut task in self.store.read_all_tasks(Partition::Active)? {
            if !task.status.is_terminal() {
                continue;
            }
            task.push_log(
                now,
                LogEvent::Archived,
                self.agent(),
                format!("Archived as {}", task.status),
            );
            self.store.write_task(Partition::Active, &task)?;
            if self.store.archive_task(&task.task_id)? {
                archived.push(task.task_id);
            }
        }
        info!(count = archived.len(), "Archived settled tasks");
        Ok(archived)
    }

    /// Create a project and one task per spec, each depending on the one before.
    pub fn create_project(&self, request: CreateProject) -> Result<Project> {
        if request.title.trim().is_empty() {
            return Err(HiveError::missing_field("title").into());
        }
        let specs = parse_task_specs(&request.tasks)?;

        let now = self.now();
        let project_id = self.fresh_project_id()?;
        let detail = format!("Task created as part of project \"{}\"", request.title);
        let mut entries: Vec<ProjectTask> = Vec::with_capacity(specs.len());

        for (task_type, title) in specs {
            let mut task = Task::new(self.fresh_task_id()?, title, task_type, now);
            task.project_id = Some(project_id.clone());
            task.deadline_minutes = self.config.deadline_for(&task.task_type);
            if let Some(previous) = entries.last() {
                task.depends_on = vec![previous.task_id.clone()];
            }
            task.push_log(now, LogEvent::Created, self.agent(), detail.clone());
            self.store.write_task(Partition::Active, &task)?;
            entries.push(ProjectTask {
                task_id: task.task_id,
                title: task.title,
                task_type: task.task_type,
            });
        }

        let project = Project {
            project_id,
            title: request.title,
            description: request.description,
            tasks: entries,
            created_at: now,
            status: PROJECT_STATUS_ACTIVE.to_string(),
        };
        self.store.write_project(&project)?;
        info!(project_id = %project.project_id, tasks = project.tasks.len(), "Created project");
        Ok(project)
    }

    /// Edit project fields. Task records are not touched.
    pub fn update_project(&self, project_id: &str, request: UpdateProject) -> Result<Project> {
        let mut project = self
            .store
            .read_project(project_id)?
            .ok_or_else(|| HiveError::project_not_found(project_id))?;

        if let Some(title) = request.title {
            project.title = title;
        }
        if let Some(description) = request.description {
            project.description = description;
        }
        if let Some(status) = request.status {
            project.status = status;
        }

        self.store.write_project(&project)?;
        info!(project_id, status = %project.status, "Updated project");
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.store.read_all_projects()?)
    }

    /// A project and the tasks it references. Tasks no longer on record are skipped.
    pub fn show_project(&self, project_id: &str) -> Result<ProjectDetail> {
        let project = self
            .store
            .read_project(project_id)?
            .ok_or_else(|| HiveError::project_not_found(project_id))?;

        let mut tasks = Vec::with_capacity(project.tasks.len());
        for entry in &project.tasks {
            match self.store.find_task(&entry.task_id)? {
                Some((_, task)) => tasks.push(task),
                None => debug!(task_id = %entry.task_id, "Project task missing from store"),
            }
        }
        let counts = StatusCounts::from_tasks(&tasks);
        Ok(ProjectDetail {
            project,
            tasks,
            counts,
        })
    }

    /// Wait for a task to settle, sleeping on the tokio timer.
    pub async fn wait(
        &self,
        task_id: &str,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Settlement> {
        self.wait_with(task_id, timeout, &TokioSleeper, cancel).await
    }

    /// Wait for a task to settle using `sleeper` between polls.
    pub async fn wait_with<Sl>(
        &self,
        task_id: &str,
        timeout: Option<Duration>,
        sleeper: &Sl,
        cancel: &CancellationToken,
    ) -> Result<Settlement>
    where
        Sl: Sleeper + ?Sized,
    {
        self.require_task(task_id)?;

        let deadline = match timeout {
            Some(t) => Some(
                TimeDelta::from_std(t)
                    .ok()
                    .and_then(|d| self.now().checked_add_signed(d))
                    .ok_or_else(|| HiveError::invalid_value("timeout", "timeout is too large"))?,
            ),
            None => None,
        };
        let options = self.config.waiter.options(deadline);

        let store = &self.store;
        let settlement = wait_for_settlement(
            |id: &str| Ok(store.find_task(id)?.map(|(_, task)| task)),
            task_id,
            &options,
            &self.clock,
            sleeper,
            cancel,
        )
        .await?;
        info!(task_id, status = %settlement.status, "Wait finished");
        Ok(settlement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_pairs_split_on_first_equals() {
        let pairs = vec!["url=http://x?a=b".to_string(), "gone=".to_string()];
        assert_eq!(
            parse_metadata(&pairs).unwrap(),
            vec![
                ("url".to_string(), "http://x?a=b".to_string()),
                ("gone".to_string(), String::new()),
            ]
        );
        let err = parse_metadata(&["novalue".to_string()]).unwrap_err();
        assert_eq!(err.message, "Invalid metadata format: \"novalue\". Use key=value.");
        assert!(parse_metadata(&["=x".to_string()]).is_err());
    }

    #[test]
    fn task_specs_need_type_and_title() {
        let specs = parse_task_specs(&["research:Find: the sources".to_string()]).unwrap();
        assert_eq!(specs, vec![("research".into(), "Find: the sources".into())]);
        assert!(parse_task_specs(&["no colon".to_string()]).is_err());
        assert!(parse_task_specs(&[":title".to_string()]).is_err());
    }

    #[test]
    fn long_input_is_truncated_in_preview() {
        let long = "x".repeat(60);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(50)));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(parse_status("in_progress").unwrap(), TaskStatus::InProgress);
        assert!(parse_status("done").is_err());
    }

    #[test]
    fn changed_fields_follow_application_order() {
        let request = UpdateTask {
            status: Some(TaskStatus::Blocked),
            needs: Some("API key".into()),
            metadata: vec!["k=v".into()],
            ..UpdateTask::default()
        };
        assert_eq!(request.changed_fields(), vec!["status", "needs", "metadata"]);
    }
}
