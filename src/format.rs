//! Output formatting for the CLI: plain text and JSON.

use crate::engine::Settlement;
use crate::service::{BoardSummary, ProjectDetail, StaleTask, StrandedTask, TaskDetail, UpdateOutcome};
use crate::types::{Project, Task};
use anyhow::Result;
use serde::Serialize;

/// Log entries shown by `show`.
const SHOWN_LOG_ENTRIES: usize = 10;

/// Output format selected by `--json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Pretty JSON, as written to stdout.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn deadline_text(minutes: u32) -> String {
    if minutes > 0 {
        format!("{} min", minutes)
    } else {
        "none".to_string()
    }
}

/// One line per task: status, ID, title, owner and blocker.
pub fn format_task_line(task: &Task) -> String {
    let mut line = format!("{:<12} {}  {}", task.status.as_str(), task.task_id, task.title);
    if let Some(ref owner) = task.owner {
        line.push_str(&format!(" [{}]", owner));
    }
    if let Some(ref blocked_on) = task.blocked_on {
        line.push_str(&format!(" (blocked: {})", blocked_on));
    }
    line
}

pub fn format_task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks found.\n".to_string();
    }
    let mut out = String::new();
    for task in tasks {
        out.push_str(&format_task_line(task));
        out.push('\n');
    }
    out
}

pub fn format_created(task: &Task) -> String {
    let mut out = format!("Created task: {}\n", task.task_id);
    out.push_str(&format!("  Title: {}\n", task.title));
    out.push_str(&format!("  Type: {}\n", task.task_type));
    out.push_str(&format!("  Deadline: {}\n", deadline_text(task.deadline_minutes)));
    if let Some(ref parent) = task.parent_task {
        out.push_str(&format!("  Parent: {} (depth {})\n", parent, task.depth));
    }
    out
}

pub fn format_task_detail(detail: &TaskDetail) -> String {
    let task = &detail.task;
    let mut out = String::new();

    out.push_str(&format!("Task: {} ({})\n", task.task_id, detail.partition));
    out.push_str(&format!("Title: {}\n", task.title));
    out.push_str(&format!("Description: {}\n", task.description));
    out.push_str(&format!("Type: {}\n", task.task_type));
    out.push_str(&format!("Status: {}\n", task.status));
    out.push_str(&format!("Owner: {}\n", task.owner.as_deref().unwrap_or("(none)")));
    out.push_str(&format!(
        "Project: {}\n",
        task.project_id.as_deref().unwrap_or("(none)")
    ));
    out.push_str(&format!("Deadline: {}\n", deadline_text(task.deadline_minutes)));
    out.push_str(&format!("Created: {}\n", task.created_at.to_rfc3339()));
    if let Some(claimed) = task.claimed_at {
        out.push_str(&format!("Claimed: {}\n", claimed.to_rfc3339()));
    }
    if let Some(completed) = task.completed_at {
        out.push_str(&format!("Completed: {}\n", completed.to_rfc3339()));
    }
    if let Some(ref output) = task.output_path {
        out.push_str(&format!("Output: {}\n", output));
    }
    if let Some(ref blocked_on) = task.blocked_on {
        out.push_str(&format!("Blocked on: {}\n", blocked_on));
    }
    if let Some(ref input) = task.human_input {
        if !input.needed.is_empty() {
            out.push_str(&format!("Needs: {}\n", input.needed));
        }
        if let Some(ref provided) = input.provided {
            out.push_str(&format!("Provided: {}\n", provided));
        }
    }
    if !task.depends_on.is_empty() {
        out.push_str(&format!("Depends on: {}\n", task.depends_on.join(", ")));
    }
    if let Some(ref parent) = task.parent_task {
        out.push_str(&format!("Parent: {} (depth {})\n", parent, task.depth));
    }

    if !detail.children.is_empty() {
        out.push_str(&format!("Children ({}):\n", detail.children.len()));
        for child in &detail.children {
            out.push_str(&format!("  {}  [{}] {}\n", child.task_id, child.status, child.title));
        }
    }

    if !task.metadata.is_empty() {
        out.push_str("Metadata:\n");
        for (key, value) in &task.metadata {
            out.push_str(&format!("  {}: {}\n", key, value));
        }
    }

    out.push_str(&format!("\nLog ({} entries):\n", task.log.len()));
    let skip = task.log.len().saturating_sub(SHOWN_LOG_ENTRIES);
    for entry in task.log.iter().skip(skip) {
        let agent = entry
            .agent
            .as_deref()
            .map(|a| format!(" [{}]", a))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {} {}{}: {}\n",
            entry.ts.to_rfc3339(),
            entry.event,
            agent,
            entry.detail
        ));
    }
    out
}

pub fn format_update(outcome: &UpdateOutcome) -> String {
    match outcome {
        UpdateOutcome::Updated {
            task,
            auto_completed_parent,
        } => {
            let mut out = format!("Updated task {}: status={}\n", task.task_id, task.status);
            if let Some(parent) = auto_completed_parent {
                out.push_str(&format!(
                    "Parent task {} auto-completed (all children done).\n",
                    parent
                ));
            }
            out
        }
        UpdateOutcome::CompletionBlocked { task, check } => format!(
            "Completion blocked: {} children still incomplete. Task stays {}.\n",
            check.incomplete, task.status
        ),
    }
}

pub fn format_summary(summary: &BoardSummary) -> String {
    let c = &summary.counts;
    let rows = [
        ("Pending:", c.pending),
        ("In Progress:", c.in_progress),
        ("Blocked:", c.blocked),
        ("Completed:", c.completed),
        ("Failed:", c.failed),
        ("Abandoned:", c.abandoned),
    ];

    let mut out = String::from("\n  hive task board\n  ---------------\n");
    for (label, count) in rows {
        out.push_str(&format!("  {:<14}{:>3}\n", label, count));
    }
    out.push_str("  ---------------\n");
    out.push_str(&format!("  {:<14}{:>3}\n\n", "Total:", c.total));

    if !summary.blocked.is_empty() {
        out.push_str("  Blocked tasks needing attention:\n");
        for item in &summary.blocked {
            out.push_str(&format!("    {}  {}\n", item.task_id, item.title));
            out.push_str(&format!("      Needs: {}\n", item.needs));
        }
        out.push('\n');
    }

    if !summary.active.is_empty() {
        out.push_str("  Active tasks:\n");
        for item in &summary.active {
            let duration = item
                .minutes_since_claim
                .map(|m| format!("{} min", m))
                .unwrap_or_else(|| "?".to_string());
            out.push_str(&format!(
                "    {}  {} [{}] ({})\n",
                item.task_id,
                item.title,
                item.owner.as_deref().unwrap_or("?"),
                duration
            ));
        }
        out.push('\n');
    }
    out
}

pub fn format_stranded(found: &[StrandedTask]) -> String {
    if found.is_empty() {
        return "No stranded tasks.\n".to_string();
    }
    let mut out = format!("Stranded tasks ({}):\n", found.len());
    for item in found {
        out.push_str(&format!(
            "  {}  {} (dead dependencies: {})\n",
            item.task.task_id,
            item.task.title,
            item.dead_dependencies.join(", ")
        ));
    }
    out
}

pub fn format_stale(found: &[StaleTask]) -> String {
    if found.is_empty() {
        return "No stale tasks.\n".to_string();
    }
    let mut out = format!("Stale tasks ({}):\n", found.len());
    for item in found {
        out.push_str(&format!(
            "  {}  {} [{}] idle {} min, limit {} min\n",
            item.task.task_id,
            item.task.title,
            item.task.owner.as_deref().unwrap_or("?"),
            item.idle_minutes,
            item.limit_minutes
        ));
    }
    out
}

pub fn format_project(project: &Project) -> String {
    let mut out = format!("Project: {}\n", project.project_id);
    out.push_str(&format!("  Title: {}\n", project.title));
    out.push_str(&format!("  Status: {}\n", project.status));
    if !project.description.is_empty() {
        out.push_str(&format!("  Description: {}\n", project.description));
    }
    out.push_str("  Tasks:\n");
    for entry in &project.tasks {
        out.push_str(&format!("    {}  [{}] {}\n", entry.task_id, entry.task_type, entry.title));
    }
    out
}

pub fn format_project_list(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects found.\n".to_string();
    }
    let mut out = String::new();
    for project in projects {
        out.push_str(&format!(
            "{:<10} {}  {} ({} tasks)\n",
            project.status,
            project.project_id,
            project.title,
            project.tasks.len()
        ));
    }
    out
}

pub fn format_project_detail(detail: &ProjectDetail) -> String {
    let project = &detail.project;
    let mut out = format!("Project: {} [{}]\n", project.project_id, project.status);
    out.push_str(&format!("Title: {}\n", project.title));
    if !project.description.is_empty() {
        out.push_str(&format!("Description: {}\n", project.description));
    }
    out.push_str(&format!(
        "Progress: {}/{} completed\n",
        detail.counts.completed, detail.counts.total
    ));
    for task in &detail.tasks {
        out.push_str("  ");
        out.push_str(&format_task_line(task));
        out.push('\n');
    }
    out
}

pub fn format_settlement(task_id: &str, settlement: &Settlement) -> String {
    format!("Task {}: {}\n", task_id, settlement.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CompletionCheck;
    use crate::service::{ActiveItem, BlockedItem};
    use crate::types::{BlockedOn, StatusCounts, TaskStatus};
    use chrono::Utc;

    #[test]
    fn task_line_shows_owner_and_blocker() {
        let mut task = Task::new("t1", "Fetch data", "dev", Utc::now());
        task.status = TaskStatus::Blocked;
        task.owner = Some("w1".into());
        task.blocked_on = Some(BlockedOn::Human);
        assert_eq!(
            format_task_line(&task),
            "blocked      t1  Fetch data [w1] (blocked: human)"
        );
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(format_task_list(&[]), "No tasks found.\n");
    }

    #[test]
    fn blocked_completion_is_reported() {
        let mut task = Task::new("p", "Parent", "dev", Utc::now());
        task.status = TaskStatus::InProgress;
        let outcome = UpdateOutcome::CompletionBlocked {
            task,
            check: CompletionCheck {
                allowed: false,
                children: 3,
                incomplete: 2,
            },
        };
        assert_eq!(
            format_update(&outcome),
            "Completion blocked: 2 children still incomplete. Task stays in_progress.\n"
        );
    }

    #[test]
    fn summary_lists_blocked_needs_and_active_durations() {
        let summary = BoardSummary {
            counts: StatusCounts {
                blocked: 1,
                in_progress: 1,
                total: 2,
                ..StatusCounts::default()
            },
            blocked: vec![BlockedItem {
                task_id: "b1".into(),
                title: "Needs key".into(),
                needs: "API key".into(),
            }],
            active: vec![ActiveItem {
                task_id: "a1".into(),
                title: "Working".into(),
                owner: None,
                minutes_since_claim: Some(12),
            }],
        };
        let text = format_summary(&summary);
        assert!(text.contains("  Abandoned:      0\n"));
        assert!(text.contains("  Total:          2\n"));
        assert!(text.contains("      Needs: API key\n"));
        assert!(text.contains("    a1  Working [?] (12 min)\n"));
    }
}
