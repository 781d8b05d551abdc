//! In-memory store, for tests and for embedding the engine without persistence.

use super::{Partition, StoreError, StoreResult, TaskStore, check_key};
use crate::types::{Project, Task};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    tasks: BTreeMap<(Partition, String), Task>,
    projects: BTreeMap<String, Project>,
}

/// Store that keeps every record in a mutex-guarded map.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with active tasks.
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.lock() {
            for task in tasks {
                inner
                    .tasks
                    .insert((Partition::Active, task.task_id.clone()), task);
            }
        }
        store
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl TaskStore for MemoryStore {
    fn read_task(&self, partition: Partition, task_id: &str) -> StoreResult<Option<Task>> {
        let inner = self.lock()?;
        Ok(inner.tasks.get(&(partition, task_id.to_string())).cloned())
    }

    fn read_all_tasks(&self, partition: Partition) -> StoreResult<Vec<Task>> {
        let inner = self.lock()?;
        Ok(inner
            .tasks
            .iter()
            .filter(|((p, _), _)| *p == partition)
            .map(|(_, t)| t.clone())
            .collect())
    }

    fn write_task(&self, partition: Partition, task: &Task) -> StoreResult<()> {
        check_key(&task.task_id)?;
        let mut inner = self.lock()?;
        inner
            .tasks
            .insert((partition, task.task_id.clone()), task.clone());
        Ok(())
    }

    fn remove_task(&self, partition: Partition, task_id: &str) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        Ok(inner
            .tasks
            .remove(&(partition, task_id.to_string()))
            .is_some())
    }

    fn read_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        let inner = self.lock()?;
        Ok(inner.projects.get(project_id).cloned())
    }

    fn read_all_projects(&self) -> StoreResult<Vec<Project>> {
        let inner = self.lock()?;
        Ok(inner.projects.values().cloned().collect())
    }

    fn write_project(&self, project: &Project) -> StoreResult<()> {
        check_key(&project.project_id)?;
        let mut inner = self.lock()?;
        inner
            .projects
            .insert(project.project_id.clone(), project.clone());
        Ok(())
    }
}
