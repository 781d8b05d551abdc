//! Detection of pending tasks whose dependencies can never complete.

use crate::types::{Task, TaskStatus};
use std::collections::HashSet;

/// Pending tasks that depend on a failed or abandoned task.
///
/// Tasks already claimed are not reported: dependencies are checked at claim
/// time only. This is a report; what to do with the tasks is up to the caller.
pub fn find_stranded(all_tasks: &[Task]) -> Vec<&Task> {
    let dead: HashSet<&str> = all_tasks
        .iter()
        .filter(|t| t.status.is_dead_end())
        .map(|t| t.task_id.as_str())
        .collect();
    if dead.is_empty() {
        return Vec::new();
    }

    all_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .filter(|t| t.depends_on.iter().any(|dep| dead.contains(dep.as_str())))
        .collect()
}

/// The dead dependencies that strand `task`.
pub fn dead_dependencies<'t>(task: &'t Task, all_tasks: &[Task]) -> Vec<&'t str> {
    task.depends_on
        .iter()
        .filter(|dep| {
            all_tasks
                .iter()
                .any(|t| &t.task_id == *dep && t.status.is_dead_end())
        })
        .map(String::as_str)
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

    fn ids<'a>(tasks: &[&'a Task]) -> Vec<&'a str> {
        tasks.iter().map(|t| t.task_id.as_str()).collect()
    }

    #[test]
    fn pending_task_on_failed_dependency_is_stranded() {
        let tasks = vec![
            task("dep", TaskStatus::Failed, &[]),
            task("x", TaskStatus::Pending, &["dep"]),
        ];
        assert_eq!(ids(&find_stranded(&tasks)), vec!["x"]);
        assert_eq!(dead_dependencies(&tasks[1], &tasks), vec!["dep"]);
    }

    #[test]
    fn abandoned_dependency_also_strands() {
        let tasks = vec![
            task("dep", TaskStatus::Abandoned, &[]),
            task("ok", TaskStatus::Completed, &[]),
            task("x", TaskStatus::Pending, &["ok", "dep"]),
        ];
        assert_eq!(ids(&find_stranded(&tasks)), vec!["x"]);
    }

    #[test]
    fn claimed_task_is_not_retroactively_stranded() {
        let tasks = vec![
            task("dep", TaskStatus::Failed, &[]),
            task("x", TaskStatus::InProgress, &["dep"]),
        ];
        assert!(find_stranded(&tasks).is_empty());
    }

    #[test]
    fn completed_or_missing_dependencies_never_strand() {
        let tasks = vec![
            task("dep", TaskStatus::Completed, &[]),
            task("x", TaskStatus::Pending, &["dep"]),
            task("y", TaskStatus::Pending, &["missing"]),
            task("z", TaskStatus::Pending, &[]),
        ];
        assert!(find_stranded(&tasks).is_empty());
    }
}
