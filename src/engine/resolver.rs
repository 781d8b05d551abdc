//! Dependency resolution: decides whether a task's prerequisites are met.
//!
//! All functions are pure and idempotent. A dependency that cannot be
//! resolved through the lookup is never considered satisfied.

use crate::types::{Task, TaskStatus};
use std::collections::HashMap;

/// Resolves a task ID to the current status of that task.
pub trait TaskLookup {
    fn status_of(&self, task_id: &str) -> Option<TaskStatus>;
}

impl<F> TaskLookup for F
where
    F: Fn(&str) -> Option<TaskStatus>,
{
    fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        self(task_id)
    }
}

/// Snapshot index of tasks by ID.
pub struct TaskIndex<'a> {
    by_id: HashMap<&'a str, &'a Task>,
}

impl<'a> TaskIndex<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        Self {
            by_id: tasks.iter().map(|t| (t.task_id.as_str(), t)).collect(),
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&'a Task> {
        self.by_id.get(task_id).copied()
    }
}

impl TaskLookup for TaskIndex<'_> {
    fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        self.get(task_id).map(|t| t.status)
    }
}

/// True when every dependency resolves to a completed task.
/// An empty `depends_on` is trivially satisfied.
pub fn dependencies_satisfied<L: TaskLookup + ?Sized>(task: &Task, lookup: &L) -> bool {
    task.depends_on
        .iter()
        .all(|dep| lookup.status_of(dep) == Some(TaskStatus::Completed))
}

/// Dependencies that do not (yet) resolve to a completed task, including unknown IDs.
pub fn unmet_dependencies<'t, L: TaskLookup + ?Sized>(task: &'t Task, lookup: &L) -> Vec<&'t str> {
    task.depends_on
        .iter()
        .filter(|dep| lookup.status_of(dep) != Some(TaskStatus::Completed))
        .map(String::as_str)
        .collect()
}

/// A task is ready to be claimed when it is pending, unowned and all
/// of its dependencies are completed.
pub fn is_ready<L: TaskLookup + ?Sized>(task: &Task, lookup: &L) -> bool {
    task.status == TaskStatus::Pending && task.owner.is_none() && dependencies_satisfied(task, lookup)
}

/// Candidates a worker of `agent_type` may claim right now.
pub fn filter_ready<'t, L: TaskLookup + ?Sized>(
    candidates: &'t [Task],
    agent_type: &str,
    lookup: &L,
) -> Vec<&'t Task> {
    candidates
        .iter()
        .filter(|t| t.task_type == agent_type && is_ready(t, lookup))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: &str, status: TaskStatus, deps: &[&str]) -> Task {
        let mut t = Task::new(id, id, "research", Utc::now());
        t.status = status;
        t.depends_on = deps.iter().map(|d| d.to_string()).collect();
        t
    }

    #[test]
    fn pending_task_without_dependencies_is_ready() {
        let t = task("a", TaskStatus::Pending, &[]);
        let none = |_: &str| -> Option<TaskStatus> { None };
        assert!(is_ready(&t, &none));
    }

    #[test]
    fn owned_or_non_pending_tasks_are_not_ready() {
        let none = |_: &str| -> Option<TaskStatus> { None };
        let mut owned = task("a", TaskStatus::Pending, &[]);
        owned.owner = Some("worker-1".into());
        assert!(!is_ready(&owned, &none));

        for status in [
            TaskStatus::InProgress,
            TaskStatus::Blocked,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Abandoned,
        ] {
            assert!(!is_ready(&task("a", status, &[]), &none));
        }
    }

    #[test]
    fn ready_only_when_all_dependencies_completed() {
        let tasks = vec![
            task("dep1", TaskStatus::Completed, &[]),
            task("dep2", TaskStatus::InProgress, &[]),
            task("x", TaskStatus::Pending, &["dep1"]),
            task("y", TaskStatus::Pending, &["dep1", "dep2"]),
        ];
        let index = TaskIndex::new(&tasks);
        assert!(is_ready(&tasks[2], &index));
        assert!(!is_ready(&tasks[3], &index));
        assert_eq!(unmet_dependencies(&tasks[3], &index), vec!["dep2"]);
    }

    #[test]
    fn unresolvable_dependency_fails_closed() {
        let tasks = vec![task("x", TaskStatus::Pending, &["ghost"])];
        let index = TaskIndex::new(&tasks);
        assert!(!is_ready(&tasks[0], &index));
        assert_eq!(unmet_dependencies(&tasks[0], &index), vec!["ghost"]);
    }

    #[test]
    fn repeated_dependency_ids_behave_as_a_set() {
        let tasks = vec![
            task("dep", TaskStatus::Completed, &[]),
            task("x", TaskStatus::Pending, &["dep", "dep"]),
        ];
        let index = TaskIndex::new(&tasks);
        assert!(is_ready(&tasks[1], &index));
    }

    #[test]
    fn filter_ready_matches_type_owner_status_and_dependencies() {
        let mut dev = task("dev", TaskStatus::Pending, &[]);
        dev.task_type = "dev".into();
        let mut claimed = task("claimed", TaskStatus::Pending, &[]);
        claimed.owner = Some("w".into());
        let tasks = vec![
            task("done", TaskStatus::Completed, &[]),
            task("ready", TaskStatus::Pending, &["done"]),
            task("waiting", TaskStatus::Pending, &["ready"]),
            dev,
            claimed,
        ];
        let index = TaskIndex::new(&tasks);

        let ready: Vec<&str> = filter_ready(&tasks, "research", &index)
            .into_iter()
            .map(|t| t.task_id.as_str())
            .collect();
        assert_eq!(ready, vec!["ready"]);
    }
}
