//! SQLite-backed store.
//!
//! Records are kept as JSON bodies with the fields used for filtering
//! (status, type, parent) mirrored into columns.

use super::{Partition, StoreError, StoreResult, TaskStore, check_key};
use crate::types::{Project, Task};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Store handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let report = embedded::migrations::runner().run(conn)?;
            debug!(applied = report.applied_migrations().len(), "Ran store migrations");
            Ok(())
        })
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, body: &str) -> StoreResult<T> {
    serde_json::from_str(body).map_err(|source| StoreError::Malformed {
        key: key.to_string(),
        source,
    })
}

fn encode<T: serde::Serialize>(key: &str, record: &T) -> StoreResult<String> {
    serde_json::to_string(record).map_err(|source| StoreError::Malformed {
        key: key.to_string(),
        source,
    })
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl TaskStore for SqliteStore {
    fn read_task(&self, partition: Partition, task_id: &str) -> StoreResult<Option<Task>> {
        self.with_conn(|conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM tasks WHERE task_id = ?1 AND partition = ?2",
                    params![task_id, partition.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| decode(task_id, &b)).transpose()
        })
    }

    fn read_all_tasks(&self, partition: Partition) -> StoreResult<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT task_id, body FROM tasks WHERE partition = ?1 ORDER BY task_id",
            )?;
            let rows = stmt
                .query_map(params![partition.as_str()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.iter().map(|(id, body)| decode(id, body)).collect()
        })
    }

    fn write_task(&self, partition: Partition, task: &Task) -> StoreResult<()> {
        check_key(&task.task_id)?;
        let body = encode(&task.task_id, task)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (task_id, partition, status, task_type, parent_task, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(task_id, partition) DO UPDATE SET
                     status = excluded.status,
                     task_type = excluded.task_type,
                     parent_task = excluded.parent_task,
                     body = excluded.body,
                     updated_at = excluded.updated_at",
                params![
                    task.task_id,
                    partition.as_str(),
                    task.status.as_str(),
                    task.task_type,
                    task.parent_task,
                    body,
                    now_ms()
                ],
            )?;
            Ok(())
        })
    }

    fn remove_task(&self, partition: Partition, task_id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM tasks WHERE task_id = ?1 AND partition = ?2",
                params![task_id, partition.as_str()],
            )?;
            Ok(removed > 0)
        })
    }

    fn read_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        self.with_conn(|conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM projects WHERE project_id = ?1",
                    params![project_id],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| decode(project_id, &b)).transpose()
        })
    }

    fn read_all_projects(&self) -> StoreResult<Vec<Project>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT project_id, body FROM projects ORDER BY project_id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.iter().map(|(id, body)| decode(id, body)).collect()
        })
    }

    fn write_project(&self, project: &Project) -> StoreResult<()> {
        check_key(&project.project_id)?;
        let body = encode(&project.project_id, project)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (project_id, status, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(project_id) DO UPDATE SET
                     status = excluded.status,
                     body = excluded.body,
                     updated_at = excluded.updated_at",
                params![project.project_id, project.status, body, now_ms()],
            )?;
            Ok(())
        })
    }

    /// Single transaction, so a task is never visible in both partitions.
    fn archive_task(&self, task_id: &str) -> StoreResult<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let moved = tx.execute(
                "INSERT OR REPLACE INTO tasks (task_id, partition, status, task_type, parent_task, body, updated_at)
                 SELECT task_id, 'archive', status, task_type, parent_task, body, ?2
                 FROM tasks WHERE task_id = ?1 AND partition = 'active'",
                params![task_id, now_ms()],
            )?;
            if moved > 0 {
                tx.execute(
                    "DELETE FROM tasks WHERE task_id = ?1 AND partition = 'active'",
                    params![task_id],
                )?;
            }
            tx.commit()?;
            Ok(moved > 0)
        })
    }
}
