//! Task subcommand arguments.

use crate::error::HiveError;
use crate::service::{CreateTask, TaskFilter, UpdateTask, parse_status};
use crate::types::BlockedOn;
use clap::Args;
use serde_json::Value;

/// Arguments for `create`
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Task title
    #[arg(long)]
    pub title: String,

    /// Task description (defaults to the title)
    #[arg(long = "desc")]
    pub description: Option<String>,

    /// Task type (research, dev, ...)
    #[arg(long = "type", default_value = "research")]
    pub task_type: String,

    /// Link to project
    #[arg(long)]
    pub project: Option<String>,

    /// Task IDs this depends on
    #[arg(long, num_args = 1..)]
    pub depends_on: Vec<String>,

    /// Deadline in minutes (defaults by type)
    #[arg(long)]
    pub deadline: Option<u32>,

    /// Parent task ID (creates a sub-task)
    #[arg(long)]
    pub parent_task: Option<String>,

    /// Nesting depth; derived from the parent when one is given
    #[arg(long)]
    pub depth: Option<String>,

    /// Set metadata key=value (repeatable)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub meta: Vec<String>,
}

impl CreateArgs {
    pub fn into_request(self) -> CreateTask {
        CreateTask {
            title: self.title,
            description: self.description,
            task_type: self.task_type,
            project_id: self.project,
            depends_on: self.depends_on,
            deadline_minutes: self.deadline,
            parent_task: self.parent_task,
            depth: self.depth.map(Value::String),
            metadata: self.meta,
        }
    }
}

/// Arguments for `list`
#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long = "type")]
    pub task_type: Option<String>,
}

impl ListArgs {
    pub fn into_filter(self) -> Result<TaskFilter, HiveError> {
        Ok(TaskFilter {
            status: self.status.as_deref().map(parse_status).transpose()?,
            owner: self.owner,
            project_id: self.project,
            task_type: self.task_type,
        })
    }
}

/// Arguments for `update`
#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub task_id: String,

    /// New status
    #[arg(long)]
    pub status: Option<String>,

    /// Set owner
    #[arg(long)]
    pub owner: Option<String>,

    /// Set output path
    #[arg(long)]
    pub output: Option<String>,

    /// What the task is blocked on: human, or a task ID
    #[arg(long)]
    pub blocked_on: Option<String>,

    /// Ask a human for input
    #[arg(long)]
    pub needs: Option<String>,

    /// Set metadata key=value (repeatable, empty value deletes key)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub meta: Vec<String>,

    /// Log message for this update
    #[arg(short, long)]
    pub message: Option<String>,
}

impl UpdateArgs {
    pub fn into_request(self) -> Result<(String, UpdateTask), HiveError> {
        let request = UpdateTask {
            status: self.status.as_deref().map(parse_status).transpose()?,
            owner: self.owner,
            output_path: self.output,
            blocked_on: self.blocked_on.as_deref().map(parse_blocked_on),
            needs: self.needs,
            metadata: self.meta,
            message: self.message,
        };
        Ok((self.task_id, request))
    }
}

/// `--blocked-on` value: `human`, a task ID, or a task ID written as `task-<id>`.
fn parse_blocked_on(value: &str) -> BlockedOn {
    match value.strip_prefix("task-") {
        Some(id) if !id.is_empty() => BlockedOn::Task(id.to_string()),
        _ => BlockedOn::parse(value),
    }
}

/// Arguments for `provide`
#[derive(Args, Debug)]
pub struct ProvideArgs {
    pub task_id: String,

    /// The input to provide
    #[arg(long)]
    pub input: String,
}

/// Arguments for `stale`
#[derive(Args, Debug)]
pub struct StaleArgs {
    /// Fallback limit in minutes for tasks without a deadline
    #[arg(long)]
    pub threshold: Option<u32>,
}

/// Arguments for `wait`
#[derive(Args, Debug)]
pub struct WaitArgs {
    pub task_id: String,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;

    #[test]
    fn update_args_parse_status_and_target() {
        let args = UpdateArgs {
            task_id: "t1".into(),
            status: Some("blocked".into()),
            owner: None,
            output: None,
            blocked_on: Some("task-abc".into()),
            needs: None,
            meta: vec![],
            message: None,
        };
        let (id, request) = args.into_request().unwrap();
        assert_eq!(id, "t1");
        assert_eq!(request.status, Some(TaskStatus::Blocked));
        assert_eq!(request.blocked_on, Some(BlockedOn::Task("abc".into())));
    }

    #[test]
    fn list_rejects_unknown_status() {
        let args = ListArgs {
            status: Some("done".into()),
            owner: None,
            project: None,
            task_type: None,
        };
        assert!(args.into_filter().is_err());
    }

    #[test]
    fn blocked_on_flag_accepts_human_bare_and_prefixed_ids() {
        assert_eq!(parse_blocked_on("human"), BlockedOn::Human);
        assert_eq!(
            parse_blocked_on("20250101-120000-abcd"),
            BlockedOn::Task("20250101-120000-abcd".into())
        );
        assert_eq!(
            parse_blocked_on("task-20250101-120000-abcd"),
            BlockedOn::Task("20250101-120000-abcd".into())
        );
        assert_eq!(parse_blocked_on("task-"), BlockedOn::Task("task-".into()));
    }
}
