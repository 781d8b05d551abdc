//! Lifecycle state machine: status side effects, the parent completion
//! guard, parent auto-completion and sub-task depth validation.
//!
//! The engine does not reject transitions between statuses; callers pick the
//! target. What it does guarantee is that each status carries the right side
//! effects and that a parent never completes ahead of its children.

use crate::error::{HiveError, HiveResult};
use crate::types::{BlockedOn, LogEvent, Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Maximum nesting depth. Depth 1 tasks are sub-tasks and cannot spawn their own.
pub const MAX_TASK_DEPTH: u32 = 1;

/// Result of evaluating the completion guard for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionCheck {
    pub allowed: bool,
    pub children: usize,
    pub incomplete: usize,
}

/// Whether `task_id` may transition to completed given its children in `all_tasks`.
pub fn can_complete(task_id: &str, all_tasks: &[Task]) -> CompletionCheck {
    let children: Vec<&Task> = all_tasks
        .iter()
        .filter(|t| t.parent_task.as_deref() == Some(task_id))
        .collect();
    let incomplete = children
        .iter()
        .filter(|t| t.status != TaskStatus::Completed)
        .count();
    CompletionCheck {
        allowed: incomplete == 0,
        children: children.len(),
        incomplete,
    }
}

/// After `task` completes, returns its parent ID when every sibling
/// (including `task` itself) is completed.
///
/// `task` is taken as authoritative over any stale copy of it in `all_tasks`.
/// Only the immediate parent is considered. The caller decides whether the
/// parent is in a state that may be completed.
pub fn should_auto_complete_parent<'t>(task: &'t Task, all_tasks: &[Task]) -> Option<&'t str> {
    let parent_id = task.parent_task.as_deref()?;
    if task.status != TaskStatus::Completed {
        return None;
    }
    let siblings_done = all_tasks
        .iter()
        .filter(|t| t.parent_task.as_deref() == Some(parent_id) && t.task_id != task.task_id)
        .all(|t| t.status == TaskStatus::Completed);
    siblings_done.then_some(parent_id)
}

/// Apply the side effects of entering `status`. Does not write a log entry.
///
/// A blocked task keeps its current `blocked_on` when no target is supplied,
/// and falls back to [`BlockedOn::Human`] when it has none.
pub fn apply_status(
    task: &mut Task,
    status: TaskStatus,
    blocked_on: Option<BlockedOn>,
    now: DateTime<Utc>,
) {
    task.status = status;
    match status {
        TaskStatus::Pending => {
            task.owner = None;
            task.claimed_at = None;
            task.completed_at = None;
            task.blocked_on = None;
        }
        TaskStatus::InProgress => {
            if task.claimed_at.is_none() {
                task.claimed_at = Some(now);
            }
            task.completed_at = None;
            task.blocked_on = None;
        }
        TaskStatus::Completed | TaskStatus::Failed => {
            task.completed_at = Some(now);
            task.blocked_on = None;
        }
        TaskStatus::Blocked => {
            if let Some(target) = blocked_on {
                task.blocked_on = Some(target);
            } else if task.blocked_on.is_none() {
                task.blocked_on = Some(BlockedOn::Human);
            }
        }
        TaskStatus::Abandoned => {
            task.blocked_on = None;
        }
    }
}

/// Log event for a status change. First entry into `in_progress` is a claim.
pub fn transition_event(task: &Task, status: TaskStatus) -> LogEvent {
    if status == TaskStatus::InProgress && task.claimed_at.is_none() {
        LogEvent::Claimed
    } else {
        LogEvent::from(status)
    }
}

/// Outcome of [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Side effects applied. The caller records the mutation in the log with `event`.
    Applied { event: LogEvent },
    /// Completion refused by the guard; status untouched, a guard entry was logged.
    CompletionBlocked(CompletionCheck),
}

/// Move `task` to `status`, enforcing the completion guard against `all_tasks`.
pub fn transition(
    task: &mut Task,
    status: TaskStatus,
    blocked_on: Option<BlockedOn>,
    all_tasks: &[Task],
    agent: &str,
    now: DateTime<Utc>,
) -> TransitionOutcome {
    if status == TaskStatus::Completed {
        let check = can_complete(&task.task_id, all_tasks);
        if !check.allowed {
            task.push_log(
                now,
                LogEvent::Guard,
                agent,
                format!(
                    "Completion blocked: {}/{} children still incomplete",
                    check.incomplete, check.children
                ),
            );
            return TransitionOutcome::CompletionBlocked(check);
        }
    }

    let event = transition_event(task, status);
    apply_status(task, status, blocked_on, now);
    TransitionOutcome::Applied { event }
}

/// Complete a parent whose children have all finished. Returns false, leaving
/// the parent untouched, unless it is currently in progress.
pub fn auto_complete_parent(
    parent: &mut Task,
    children: usize,
    agent: &str,
    now: DateTime<Utc>,
) -> bool {
    if parent.status != TaskStatus::InProgress {
        return false;
    }
    apply_status(parent, TaskStatus::Completed, None, now);
    parent.push_log(
        now,
        LogEvent::Completed,
        agent,
        format!("Auto-completed: all {} children finished", children),
    );
    true
}

/// Validate a raw depth value. Absent or null means depth 0.
///
/// Accepts JSON integers and integer strings; anything else is rejected.
pub fn validate_depth(value: Option<&Value>) -> HiveResult<u32> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(depth) => check_depth(depth),
            None => Err(HiveError::invalid_depth(format!(
                "Invalid depth {}: must be a whole number",
                n
            ))),
        },
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(depth) => check_depth(depth),
            Err(_) => Err(HiveError::invalid_depth(format!(
                "Invalid depth \"{}\": must be a whole number",
                s
            ))),
        },
        Some(other) => Err(HiveError::invalid_depth(format!(
            "Invalid depth {}: must be a whole number",
            other
        ))),
    }
}

/// Range check for an already-numeric depth.
pub fn check_depth(depth: i64) -> HiveResult<u32> {
    if depth < 0 {
        return Err(HiveError::invalid_depth(format!(
            "Invalid depth {}: must not be negative",
            depth
        )));
    }
    if depth > i64::from(MAX_TASK_DEPTH) {
        return Err(HiveError::invalid_depth(format!(
            "Invalid depth {}: maximum task depth is {} (sub-agents cannot create sub-tasks)",
            depth, MAX_TASK_DEPTH
        )));
    }
    // Bounded by MAX_TASK_DEPTH above.
    Ok(depth as u32)
}

/// Depth a new sub-task of `parent` would have, if permitted.
pub fn child_depth(parent: &Task) -> HiveResult<u32> {
    check_depth(i64::from(parent.depth) + 1)
}
