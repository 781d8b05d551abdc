//! Staleness detection for in-progress tasks that outlived their time budget.

use crate::types::{Task, TaskStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Which timestamp marks the start of a task's idle period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityClock {
    /// Only the claim time counts.
    ClaimedAt,
    /// The later of the claim time and the last log entry; logging resets the clock.
    #[default]
    LastActivity,
}

/// Minutes a task may stay in progress: its own deadline when positive,
/// otherwise the fallback.
pub fn effective_limit_minutes(task: &Task, fallback_minutes: u32) -> u32 {
    if task.deadline_minutes > 0 {
        task.deadline_minutes
    } else {
        fallback_minutes
    }
}

/// Start of the idle period under `clock`, if the task has been claimed.
pub fn idle_since(task: &Task, clock: ActivityClock) -> Option<DateTime<Utc>> {
    let claimed_at = task.claimed_at?;
    match clock {
        ActivityClock::ClaimedAt => Some(claimed_at),
        ActivityClock::LastActivity => task.last_activity(),
    }
}

/// Whether a single task is stale at `now`.
pub fn is_stale(task: &Task, fallback_minutes: u32, clock: ActivityClock, now: DateTime<Utc>) -> bool {
    if task.status != TaskStatus::InProgress {
        return false;
    }
    let Some(since) = idle_since(task, clock) else {
        return false;
    };
    let limit = Duration::minutes(i64::from(effective_limit_minutes(task, fallback_minutes)));
    now - since > limit
}

/// In-progress tasks that exceeded their limit. Reports only; nothing is mutated.
pub fn find_stale<'t>(
    all_tasks: &'t [Task],
    fallback_minutes: u32,
    clock: ActivityClock,
    now: DateTime<Utc>,
) -> Vec<&'t Task> {
    all_tasks
        .iter()
        .filter(|t| is_stale(t, fallback_minutes, clock, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogEvent;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap()
    }

    fn minutes_ago(n: i64) -> DateTime<Utc> {
        now() - Duration::minutes(n)
    }

    fn claimed(minutes: i64, deadline: u32) -> Task {
        let mut t = Task::new("t", "t", "research", minutes_ago(minutes + 1));
        t.status = TaskStatus::InProgress;
        t.claimed_at = Some(minutes_ago(minutes));
        t.deadline_minutes = deadline;
        t
    }

    #[test]
    fn task_past_fallback_threshold_is_stale() {
        let tasks = vec![claimed(90, 0)];
        assert_eq!(find_stale(&tasks, 60, ActivityClock::ClaimedAt, now()).len(), 1);
    }

    #[test]
    fn task_within_threshold_is_not_stale() {
        let tasks = vec![claimed(30, 0)];
        assert!(find_stale(&tasks, 60, ActivityClock::ClaimedAt, now()).is_empty());
    }

    #[test]
    fn own_deadline_beats_fallback() {
        let tasks = vec![claimed(20, 15)];
        assert_eq!(find_stale(&tasks, 60, ActivityClock::ClaimedAt, now()).len(), 1);
    }

    #[test]
    fn exactly_at_limit_is_not_stale() {
        let tasks = vec![claimed(60, 0)];
        assert!(find_stale(&tasks, 60, ActivityClock::ClaimedAt, now()).is_empty());
    }

    #[test]
    fn unclaimed_or_other_statuses_are_skipped() {
        let mut no_claim = claimed(90, 0);
        no_claim.claimed_at = None;
        let mut pending = claimed(120, 0);
        pending.status = TaskStatus::Pending;
        let mut done = claimed(120, 0);
        done.status = TaskStatus::Completed;

        let tasks = vec![no_claim, pending, done];
        assert!(find_stale(&tasks, 60, ActivityClock::LastActivity, now()).is_empty());
        assert!(find_stale(&[], 60, ActivityClock::LastActivity, now()).is_empty());
    }

    #[test]
    fn recent_log_entry_resets_clock_when_tracking_activity() {
        let mut t = claimed(90, 0);
        t.push_log(minutes_ago(10), LogEvent::Update, "worker", "still going");
        let tasks = vec![t];

        assert!(find_stale(&tasks, 60, ActivityClock::LastActivity, now()).is_empty());
        assert_eq!(find_stale(&tasks, 60, ActivityClock::ClaimedAt, now()).len(), 1);
    }

    #[test]
    fn log_entries_older_than_claim_do_not_extend_idle_period() {
        let mut t = claimed(90, 0);
        t.log.clear();
        t.push_log(minutes_ago(91), LogEvent::Created, "cli", "created");
        assert_eq!(idle_since(&t, ActivityClock::LastActivity), Some(minutes_ago(90)));
    }

    #[test]
    fn last_activity_clock_follows_task_activity() {
        let mut t = claimed(45, 0);
        assert_eq!(idle_since(&t, ActivityClock::LastActivity), t.last_activity());

        t.push_log(minutes_ago(5), LogEvent::Update, "worker", "progress");
        assert_eq!(idle_since(&t, ActivityClock::LastActivity), Some(minutes_ago(5)));
        assert_eq!(idle_since(&t, ActivityClock::LastActivity), t.last_activity());
        assert_eq!(idle_since(&t, ActivityClock::ClaimedAt), Some(minutes_ago(45)));
    }
}
