//! File-backed store: one pretty-printed JSON record per file.
//!
//! Layout under the data directory:
//! - `active/task-<id>.json`
//! - `archive/task-<id>.json`
//! - `projects/project-<id>.json`
//!
//! Writes go to a hidden temp file first and are renamed into place, so a
//! reader never observes a half-written record.

use super::{Partition, StoreError, StoreResult, TaskStore, check_key};
use crate::types::{Project, Task};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const TASK_PREFIX: &str = "task-";
const PROJECT_PREFIX: &str = "project-";
const RECORD_SUFFIX: &str = ".json";

/// Store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store, creating the partition directories if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let store = Self {
            root: root.as_ref().to_path_buf(),
        };
        for dir in [
            store.partition_dir(Partition::Active),
            store.partition_dir(Partition::Archive),
            store.projects_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, partition: Partition) -> PathBuf {
        self.root.join(partition.as_str())
    }

    fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    /// Path of a task record.
    pub fn task_path(&self, partition: Partition, task_id: &str) -> PathBuf {
        self.partition_dir(partition)
            .join(format!("{TASK_PREFIX}{task_id}{RECORD_SUFFIX}"))
    }

    fn project_path(&self, project_id: &str) -> PathBuf {
        self.projects_dir()
            .join(format!("{PROJECT_PREFIX}{project_id}{RECORD_SUFFIX}"))
    }
}

fn read_record<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            key: path.display().to_string(),
            source,
        })
}

fn write_record<T: Serialize>(path: &Path, record: &T) -> StoreResult<()> {
    let mut body = serde_json::to_string_pretty(record).map_err(|source| StoreError::Malformed {
        key: path.display().to_string(),
        source,
    })?;
    body.push('\n');

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, body).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// All records in `dir` whose file names match `prefix*.json`, sorted by file name.
fn read_dir_records<T: DeserializeOwned>(dir: &Path, prefix: &str) -> StoreResult<Vec<T>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(prefix) && name.ends_with(RECORD_SUFFIX) {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        // A record removed between listing and reading is simply skipped.
        if let Some(record) = read_record(&path)? {
            records.push(record);
        }
    }
    Ok(records)
}

impl TaskStore for FileStore {
    fn read_task(&self, partition: Partition, task_id: &str) -> StoreResult<Option<Task>> {
        check_key(task_id)?;
        read_record(&self.task_path(partition, task_id))
    }

    fn read_all_tasks(&self, partition: Partition) -> StoreResult<Vec<Task>> {
        let tasks = read_dir_records(&self.partition_dir(partition), TASK_PREFIX)?;
        debug!(partition = %partition, count = tasks.len(), "Read task files");
        Ok(tasks)
    }

    fn write_task(&self, partition: Partition, task: &Task) -> StoreResult<()> {
        check_key(&task.task_id)?;
        write_record(&self.task_path(partition, &task.task_id), task)
    }

    fn remove_task(&self, partition: Partition, task_id: &str) -> StoreResult<bool> {
        check_key(task_id)?;
        let path = self.task_path(partition, task_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn read_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        check_key(project_id)?;
        read_record(&self.project_path(project_id))
    }

    fn read_all_projects(&self) -> StoreResult<Vec<Project>> {
        read_dir_records(&self.projects_dir(), PROJECT_PREFIX)
    }

    fn write_project(&self, project: &Project) -> StoreResult<()> {
        check_key(&project.project_id)?;
        write_record(&self.project_path(&project.project_id), project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn records_are_newline_terminated_pretty_json() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let task = Task::new("t1", "Write docs", "dev", Utc::now());
        store.write_task(Partition::Active, &task).unwrap();

        let raw = fs::read_to_string(store.task_path(Partition::Active, "t1")).unwrap();
        assert!(raw.ends_with("}\n"));
        assert!(raw.contains("\n  \"task_id\": \"t1\""));
        assert!(raw.contains("\"type\": \"dev\""));
    }

    #[test]
    fn listing_ignores_foreign_and_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store
            .write_task(Partition::Active, &Task::new("t1", "x", "dev", Utc::now()))
            .unwrap();
        let active = dir.path().join("active");
        fs::write(active.join("notes.txt"), "hello").unwrap();
        fs::write(active.join(".task-t2.json.tmp"), "{").unwrap();

        let tasks = store.read_all_tasks(Partition::Active).unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn malformed_record_is_reported_not_skipped() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("active").join("task-bad.json"), "not json").unwrap();

        let err = store.read_task(Partition::Active, "bad").unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }
}
