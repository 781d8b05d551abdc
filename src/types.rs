//! Core types for the hive task lifecycle engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Blocked,
    Completed,
    Failed,
    Abandoned,
}

impl TaskStatus {
    /// Every status, in board display order.
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Abandoned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Abandoned => "abandoned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "abandoned" => Some(TaskStatus::Abandoned),
            _ => None,
        }
    }

    /// Settled statuses: the task will not progress without an explicit redo.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Abandoned
        )
    }

    /// Statuses whose dependents can never become ready.
    pub fn is_dead_end(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Abandoned)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a blocked task is waiting on.
///
/// Serialized as a plain string: the literal `human`, or a task ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockedOn {
    Human,
    Task(String),
}

impl BlockedOn {
    pub const HUMAN: &'static str = "human";

    /// Parse a stored blocked-on target: `human`, or a task ID taken verbatim.
    pub fn parse(s: &str) -> Self {
        if s == Self::HUMAN {
            BlockedOn::Human
        } else {
            BlockedOn::Task(s.to_string())
        }
    }
}

impl From<String> for BlockedOn {
    fn from(s: String) -> Self {
        BlockedOn::parse(&s)
    }
}

impl From<BlockedOn> for String {
    fn from(b: BlockedOn) -> Self {
        b.to_string()
    }
}

impl fmt::Display for BlockedOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockedOn::Human => f.write_str(Self::HUMAN),
            BlockedOn::Task(id) => f.write_str(id),
        }
    }
}

/// Event name recorded in a task's audit log.
///
/// Unknown names read from older records are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogEvent {
    Created,
    Claimed,
    Pending,
    InProgress,
    Blocked,
    Unblocked,
    Completed,
    Failed,
    Abandoned,
    Guard,
    Update,
    Archived,
    Other(String),
}

impl LogEvent {
    pub fn as_str(&self) -> &str {
        match self {
            LogEvent::Created => "created",
            LogEvent::Claimed => "claimed",
            LogEvent::Pending => "pending",
            LogEvent::InProgress => "in_progress",
            LogEvent::Blocked => "blocked",
            LogEvent::Unblocked => "unblocked",
            LogEvent::Completed => "completed",
            LogEvent::Failed => "failed",
            LogEvent::Abandoned => "abandoned",
            LogEvent::Guard => "guard",
            LogEvent::Update => "update",
            LogEvent::Archived => "archived",
            LogEvent::Other(s) => s,
        }
    }
}

impl From<TaskStatus> for LogEvent {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => LogEvent::Pending,
            TaskStatus::InProgress => LogEvent::InProgress,
            TaskStatus::Blocked => LogEvent::Blocked,
            TaskStatus::Completed => LogEvent::Completed,
            TaskStatus::Failed => LogEvent::Failed,
            TaskStatus::Abandoned => LogEvent::Abandoned,
        }
    }
}

impl From<String> for LogEvent {
    fn from(s: String) -> Self {
        match s.as_str() {
            "created" => LogEvent::Created,
            "claimed" => LogEvent::Claimed,
            "pending" => LogEvent::Pending,
            "in_progress" => LogEvent::InProgress,
            "blocked" => LogEvent::Blocked,
            "unblocked" => LogEvent::Unblocked,
            "completed" => LogEvent::Completed,
            "failed" => LogEvent::Failed,
            "abandoned" => LogEvent::Abandoned,
            "guard" => LogEvent::Guard,
            "update" => LogEvent::Update,
            "archived" => LogEvent::Archived,
            _ => LogEvent::Other(s),
        }
    }
}

impl From<LogEvent> for String {
    fn from(e: LogEvent) -> Self {
        e.as_str().to_string()
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a task's append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub ts: DateTime<Utc>,
    pub event: LogEvent,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub detail: String,
}

/// A request for human input and, once given, the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanInput {
    #[serde(default)]
    pub needed: String,
    #[serde(default)]
    pub provided: Option<String>,
}

/// A unit of work tracked through the status lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub parent_task: Option<String>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub deadline_minutes: u32,
    #[serde(default)]
    pub blocked_on: Option<BlockedOn>,
    #[serde(default)]
    pub human_input: Option<HumanInput>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl Task {
    /// A fresh pending task with no dependencies, metadata or log.
    pub fn new(
        task_id: impl Into<String>,
        title: impl Into<String>,
        task_type: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        Self {
            task_id: task_id.into(),
            description: title.clone(),
            title,
            task_type: task_type.into(),
            status: TaskStatus::Pending,
            owner: None,
            project_id: None,
            depends_on: Vec::new(),
            parent_task: None,
            depth: 0,
            output_path: None,
            metadata: BTreeMap::new(),
            deadline_minutes: 0,
            blocked_on: None,
            human_input: None,
            created_at,
            claimed_at: None,
            completed_at: None,
            log: Vec::new(),
        }
    }

    /// Append an audit entry. The log is never reordered or truncated.
    pub fn push_log(
        &mut self,
        ts: DateTime<Utc>,
        event: LogEvent,
        agent: &str,
        detail: impl Into<String>,
    ) {
        self.log.push(LogEntry {
            ts,
            event,
            agent: Some(agent.to_string()),
            detail: detail.into(),
        });
    }

    /// Timestamp of the most recent log entry.
    pub fn last_log_at(&self) -> Option<DateTime<Utc>> {
        self.log.last().map(|e| e.ts)
    }

    /// Later of `claimed_at` and the last log entry.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        match (self.claimed_at, self.last_log_at()) {
            (Some(c), Some(l)) => Some(c.max(l)),
            (c, l) => c.or(l),
        }
    }

    /// Check the status-dependent field invariants.
    /// Returns a description of the first violation found.
    pub fn invariant_violation(&self) -> Option<&'static str> {
        match self.status {
            TaskStatus::Pending => {
                if self.owner.is_some() {
                    return Some("pending task has an owner");
                }
                if self.claimed_at.is_some() {
                    return Some("pending task has claimed_at");
                }
                if self.completed_at.is_some() {
                    return Some("pending task has completed_at");
                }
                if self.blocked_on.is_some() {
                    return Some("pending task has blocked_on");
                }
            }
            TaskStatus::InProgress => {
                if self.claimed_at.is_none() {
                    return Some("in_progress task has no claimed_at");
                }
                if self.blocked_on.is_some() {
                    return Some("in_progress task has blocked_on");
                }
            }
            TaskStatus::Blocked => {
                if self.blocked_on.is_none() {
                    return Some("blocked task has no blocked_on");
                }
            }
            TaskStatus::Completed | TaskStatus::Failed => {
                if self.completed_at.is_none() {
                    return Some("finished task has no completed_at");
                }
            }
            TaskStatus::Abandoned => {}
        }
        None
    }
}

/// Reference to a task from its project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTask {
    pub task_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: String,
}

/// A named group of tasks created together.
///
/// Project status is independent of its tasks and never cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<ProjectTask>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_project_status")]
    pub status: String,
}

pub const PROJECT_STATUS_ACTIVE: &str = "active";

fn default_project_status() -> String {
    PROJECT_STATUS_ACTIVE.to_string()
}

/// Task counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub completed: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub total: usize,
}

impl StatusCounts {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Blocked => counts.blocked += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::Abandoned => counts.abandoned += 1,
            }
            counts.total += 1;
        }
        counts
    }

    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Blocked => self.blocked,
            TaskStatus::Completed => self.completed,
            TaskStatus::Failed => self.failed,
            TaskStatus::Abandoned => self.abandoned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(min)
    }

    #[test]
    fn status_strings_roundtrip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::from_str("done"), None);
    }

    #[test]
    fn blocked_on_parses_human_and_task_ids() {
        assert_eq!(BlockedOn::parse("human"), BlockedOn::Human);
        assert_eq!(BlockedOn::parse("abc"), BlockedOn::Task("abc".into()));
        assert_eq!(BlockedOn::parse("task-abc"), BlockedOn::Task("task-abc".into()));
    }

    #[test]
    fn blocked_on_task_ids_survive_serde_unchanged() {
        for id in ["task-abc", "20250101-120000-abcd"] {
            let target = BlockedOn::Task(id.to_string());
            let json = serde_json::to_value(&target).unwrap();
            assert_eq!(json, serde_json::json!(id));
            let back: BlockedOn = serde_json::from_value(json).unwrap();
            assert_eq!(back, target);
        }

        let mut task = Task::new("t1", "x", "dev", ts(0));
        task.status = TaskStatus::Blocked;
        task.blocked_on = Some(BlockedOn::Task("task-1".into()));
        let stored = serde_json::to_string(&task).unwrap();
        let read: Task = serde_json::from_str(&stored).unwrap();
        assert_eq!(read.blocked_on, Some(BlockedOn::Task("task-1".into())));
    }

    #[test]
    fn unknown_log_events_are_preserved() {
        let json = r#"{"ts":"2025-01-01T12:00:00Z","event":"reassigned","agent":null,"detail":"x"}"#;
        let entry: LogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.event, LogEvent::Other("reassigned".into()));
        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["event"], "reassigned");
    }

    #[test]
    fn task_reads_record_without_optional_fields() {
        let json = r#"{
            "task_id": "t1",
            "title": "Research",
            "type": "research",
            "status": "pending",
            "created_at": "2025-01-01T12:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.depth, 0);
        assert_eq!(task.deadline_minutes, 0);
        assert!(task.depends_on.is_empty());
        assert!(task.log.is_empty());
        assert_eq!(task.invariant_violation(), None);
    }

    #[test]
    fn last_activity_takes_later_of_claim_and_log() {
        let mut task = Task::new("t1", "x", "dev", ts(0));
        assert_eq!(task.last_activity(), None);

        task.claimed_at = Some(ts(10));
        assert_eq!(task.last_activity(), Some(ts(10)));

        task.push_log(ts(5), LogEvent::Created, "a", "");
        assert_eq!(task.last_activity(), Some(ts(10)));

        task.push_log(ts(30), LogEvent::Update, "a", "");
        assert_eq!(task.last_activity(), Some(ts(30)));
    }

    #[test]
    fn invariant_violation_detects_owned_pending_task() {
        let mut task = Task::new("t1", "x", "dev", ts(0));
        task.owner = Some("agent".into());
        assert!(task.invariant_violation().is_some());
    }

    #[test]
    fn status_counts_include_every_status() {
        let mut tasks: Vec<Task> = TaskStatus::ALL
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut t = Task::new(format!("t{i}"), "x", "dev", ts(0));
                t.status = *s;
                t
            })
            .collect();
        tasks.push(Task::new("extra", "x", "dev", ts(0)));

        let counts = StatusCounts::from_tasks(&tasks);
        assert_eq!(counts.total, 7);
        assert_eq!(counts.pending, 2);
        for status in TaskStatus::ALL.iter().skip(1) {
            assert_eq!(counts.get(*status), 1);
        }
    }
}
