//! Persistent storage for tasks and projects.
//!
//! The engine never reads or writes storage itself; the service layer goes
//! through [`TaskStore`]. Writers are assumed to be serialized externally: a
//! store makes each record write atomic but does not arbitrate between
//! concurrent claimants.

pub mod file;
pub mod memory;
pub mod sqlite;

use crate::types::{Project, Task};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Live tasks versus settled tasks moved out of the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    #[default]
    Active,
    Archive,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Active => "active",
            Partition::Archive => "archive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Partition::Active),
            "archive" => Some(Partition::Archive),
            _ => None,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid record key: {0:?}")]
    InvalidKey(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] refinery::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Keys become file names and table keys; reject anything that could escape a directory.
pub(crate) fn check_key(key: &str) -> StoreResult<()> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0'])
        || key.starts_with('.');
    if bad {
        Err(StoreError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Storage backend for tasks and projects.
pub trait TaskStore: Send + Sync {
    /// Read one task from `partition`.
    fn read_task(&self, partition: Partition, task_id: &str) -> StoreResult<Option<Task>>;

    /// Every task in `partition`, ordered by task ID.
    fn read_all_tasks(&self, partition: Partition) -> StoreResult<Vec<Task>>;

    /// Create or replace a task record in `partition`.
    fn write_task(&self, partition: Partition, task: &Task) -> StoreResult<()>;

    /// Delete a task record. Returns false if there was nothing to delete.
    fn remove_task(&self, partition: Partition, task_id: &str) -> StoreResult<bool>;

    fn read_project(&self, project_id: &str) -> StoreResult<Option<Project>>;

    fn read_all_projects(&self) -> StoreResult<Vec<Project>>;

    fn write_project(&self, project: &Project) -> StoreResult<()>;

    /// Look a task up in the active partition, then the archive.
    fn find_task(&self, task_id: &str) -> StoreResult<Option<(Partition, Task)>> {
        for partition in [Partition::Active, Partition::Archive] {
            if let Some(task) = self.read_task(partition, task_id)? {
                return Ok(Some((partition, task)));
            }
        }
        Ok(None)
    }

    /// Move a task from the active partition to the archive.
    /// Returns false if it was not active.
    fn archive_task(&self, task_id: &str) -> StoreResult<bool> {
        let Some(task) = self.read_task(Partition::Active, task_id)? else {
            return Ok(false);
        };
        self.write_task(Partition::Archive, &task)?;
        self.remove_task(Partition::Active, task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_that_escape_are_rejected() {
        for key in ["", ".", "..", "../x", "a/b", "a\\b", ".hidden"] {
            assert!(check_key(key).is_err(), "{key:?} should be rejected");
        }
        assert!(check_key("20250101-120000-ab12").is_ok());
    }

    #[test]
    fn partition_names_roundtrip() {
        for p in [Partition::Active, Partition::Archive] {
            assert_eq!(Partition::from_str(p.as_str()), Some(p));
        }
    }
}
