//! Settlement waiter: polls a task until it reaches a terminal status.
//!
//! Suspension happens only at the sleep between polls. Cancellation is checked
//! before every poll and raced against every sleep, so a cancelled wait returns
//! at the next wakeup at the latest.

use crate::types::{Task, TaskStatus};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Polling schedule for [`wait_for_settlement`].
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Give up once the next wakeup would fall after this instant.
    pub deadline: Option<DateTime<Utc>>,
    pub start_interval: Duration,
    pub max_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            deadline: None,
            start_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
        }
    }
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStatus {
    Completed,
    Failed,
    Abandoned,
    Timeout,
    Cancelled,
}

impl fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WaitStatus::Completed => "completed",
            WaitStatus::Failed => "failed",
            WaitStatus::Abandoned => "abandoned",
            WaitStatus::Timeout => "timeout",
            WaitStatus::Cancelled => "cancelled",
        })
    }
}

/// Final status plus the process exit code a CLI should use for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub status: WaitStatus,
    pub exit_code: i32,
}

impl Settlement {
    pub fn new(status: WaitStatus) -> Self {
        let exit_code = if status == WaitStatus::Completed { 0 } else { 1 };
        Self { status, exit_code }
    }

    fn from_task(status: TaskStatus) -> Option<Self> {
        match status {
            TaskStatus::Completed => Some(Self::new(WaitStatus::Completed)),
            TaskStatus::Failed => Some(Self::new(WaitStatus::Failed)),
            TaskStatus::Abandoned => Some(Self::new(WaitStatus::Abandoned)),
            _ => None,
        }
    }
}

/// Suspends the waiter between polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Poll `lookup(task_id)` with capped exponential backoff until the task settles,
/// the deadline would be overrun, or `cancel` fires.
///
/// A task that cannot be found is polled again, like one that is still running.
/// Errors from `lookup` end the wait and are returned to the caller.
pub async fn wait_for_settlement<F, C, S>(
    mut lookup: F,
    task_id: &str,
    options: &WaitOptions,
    clock: &C,
    sleeper: &S,
    cancel: &CancellationToken,
) -> Result<Settlement>
where
    F: FnMut(&str) -> Result<Option<Task>>,
    C: Clock + ?Sized,
    S: Sleeper + ?Sized,
{
    let mut interval = options.start_interval;
    let mut polls = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Ok(Settlement::new(WaitStatus::Cancelled));
        }

        polls += 1;
        if let Some(task) = lookup(task_id)? {
            if let Some(settled) = Settlement::from_task(task.status) {
                debug!(task_id, polls, status = %settled.status, "Task settled");
                return Ok(settled);
            }
        }

        if let Some(deadline) = options.deadline {
            let next_wakeup = TimeDelta::from_std(interval)
                .ok()
                .and_then(|step| clock.utc().checked_add_signed(step));
            if next_wakeup.is_none_or(|at| at > deadline) {
                debug!(task_id, polls, "Deadline reached before next poll");
                return Ok(Settlement::new(WaitStatus::Timeout));
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(Settlement::new(WaitStatus::Cancelled));
            }
            _ = sleeper.sleep(interval) => {}
        }

        interval = interval.saturating_mul(2).min(options.max_interval);
    }
}
