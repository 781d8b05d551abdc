//! The task lifecycle engine.
//!
//! Pure functions over a snapshot of tasks, plus the one suspending operation
//! (the settlement waiter). Nothing here touches the store; callers supply the
//! snapshot and persist the results.

pub mod lifecycle;
pub mod reaper;
pub mod resolver;
pub mod stranded;
pub mod waiter;

pub use lifecycle::{
    CompletionCheck, MAX_TASK_DEPTH, TransitionOutcome, apply_status, can_complete,
    should_auto_complete_parent, transition, validate_depth,
};
pub use reaper::{ActivityClock, find_stale};
pub use resolver::{TaskIndex, TaskLookup, filter_ready, is_ready};
pub use stranded::find_stranded;
pub use waiter::{Settlement, Sleeper, TokioSleeper, WaitOptions, WaitStatus, wait_for_settlement};
