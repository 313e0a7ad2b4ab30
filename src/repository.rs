use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, TaskError};
use crate::models::{Project, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::storage::Store;

/// Fallback project id when a draft names none and no project exists.
pub const DEFAULT_PROJECT_ID: &str = "default";

/// Tasks in insertion order with an id index for point lookups.
#[derive(Debug, Default, Clone)]
pub struct TaskCollection {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskCollection {
    /// Builds a collection from stored records. A repeated id resolves to its
    /// first record for lookups; `replace` and `remove` act on every copy.
    pub fn from_vec(tasks: Vec<Task>) -> Self {
        let mut c = TaskCollection { tasks, index: HashMap::new() };
        c.reindex();
        c
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, t) in self.tasks.iter().enumerate() {
            self.index.entry(t.id.clone()).or_insert(i);
        }
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    /// Appends `task`, refusing an id that is already present.
    pub fn insert(&mut self, task: Task) -> Result<(), TaskError> {
        if self.contains(&task.id) {
            return Err(TaskError::DuplicateId(task.id));
        }
        self.index.insert(task.id.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Replaces every record with the same id. Returns `false` if there is none.
    pub fn replace(&mut self, task: Task) -> bool {
        if !self.contains(&task.id) {
            return false;
        }
        for slot in self.tasks.iter_mut().filter(|t| t.id == task.id) {
            *slot = task.clone();
        }
        true
    }

    /// Removes every record with `id`, returning the first.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let pos = *self.index.get(id)?;
        let first = self.tasks.remove(pos);
        self.tasks.retain(|t| t.id != id);
        self.reindex();
        Some(first)
    }
}

/// CRUD over the stored task collection.
///
/// Every mutation holds the tasks lock across its read-modify-write, so two
/// processes sharing a data directory cannot lose each other's updates.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    store: Store,
}

impl TaskRepository {
    pub fn new(store: Store) -> Self {
        TaskRepository { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Returns all tasks in insertion order.
    pub fn list(&self) -> Result<Vec<Task>, StoreError> {
        self.store.read_tasks()
    }

    pub fn get(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(TaskCollection::from_vec(self.store.read_tasks()?).get(id).cloned())
    }

    pub fn projects(&self) -> Result<Vec<Project>, StoreError> {
        self.store.read_projects()
    }

    /// Resolves a project id to its display name.
    pub fn project_name(&self, project_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .read_projects()?
            .into_iter()
            .find(|p| p.id == project_id)
            .map(|p| p.name))
    }

    /// Creates a task from `draft`, assigning a fresh id and creation time.
    ///
    /// A blank title is rejected with [`TaskError::EmptyTitle`] and nothing is written.
    pub fn create(&self, draft: TaskDraft) -> Result<Task, TaskError> {
        let title = draft.title.trim();
        if title.is_empty() {
            debug!("rejected task with empty title");
            return Err(TaskError::EmptyTitle);
        }
        let project_id = match draft.project_id.filter(|p| !p.trim().is_empty()) {
            Some(p) => p,
            None => self
                .store
                .read_projects()?
                .first()
                .map(|p| p.id.clone())
                .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string()),
        };
        let title = title.to_string();
        self.mutate(|tasks| {
            let mut id = Uuid::new_v4().to_string();
            while tasks.contains(&id) {
                id = Uuid::new_v4().to_string();
            }
            let task = Task {
                id,
                title,
                description: draft.description,
                status: draft.status,
                project_id,
                time_spent_minutes: draft.time_spent_minutes,
                priority: draft.priority,
                created_at: Utc::now().to_rfc3339(),
            };
            tasks.insert(task.clone())?;
            info!(id = %task.id, "task created");
            Ok((task, true))
        })
    }

    /// Appends a caller-built task. A duplicate id is refused and nothing is written.
    pub fn add(&self, task: Task) -> Result<(), TaskError> {
        self.mutate(|tasks| {
            let id = task.id.clone();
            tasks.insert(task)?;
            info!(%id, "task added");
            Ok(((), true))
        })
    }

    /// Replaces the task with the same id. `Ok(false)` when no such task exists.
    pub fn update(&self, task: Task) -> Result<bool, TaskError> {
        self.mutate(|tasks| {
            let id = task.id.clone();
            let found = tasks.replace(task);
            if found {
                info!(%id, "task updated");
            } else {
                debug!(%id, "update skipped, task not found");
            }
            Ok((found, found))
        })
    }

    /// Removes the task with `id`. `Ok(false)` when no such task exists.
    pub fn delete(&self, id: &str) -> Result<bool, TaskError> {
        self.mutate(|tasks| {
            let removed = tasks.remove(id).is_some();
            if removed {
                info!(%id, "task deleted");
            } else {
                debug!(%id, "delete skipped, task not found");
            }
            Ok((removed, removed))
        })
    }

    /// Applies `patch` to the task with `id`. Returns the edited task, if found.
    pub fn edit(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>, TaskError> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(TaskError::EmptyTitle);
            }
        }
        self.mutate(|tasks| {
            let Some(mut task) = tasks.get(id).cloned() else {
                return Ok((None, false));
            };
            patch.apply(&mut task);
            tasks.replace(task.clone());
            info!(%id, "task edited");
            Ok((Some(task), true))
        })
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>, TaskError> {
        self.edit(id, TaskPatch { status: Some(status), ..Default::default() })
    }

    /// Adds `minutes` to the time spent on a task.
    pub fn log_time(&self, id: &str, minutes: u32) -> Result<Option<Task>, TaskError> {
        self.mutate(|tasks| {
            let Some(mut task) = tasks.get(id).cloned() else {
                return Ok((None, false));
            };
            task.time_spent_minutes = task.time_spent_minutes.saturating_add(minutes);
            info!(%id, minutes, total = task.time_spent_minutes, "time logged");
            tasks.replace(task.clone());
            Ok((Some(task), true))
        })
    }

    /// Runs `f` over the locked collection. `f` returns its result and whether the
    /// collection changed; the file is rewritten only in that case.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut TaskCollection) -> Result<(R, bool), TaskError>,
    ) -> Result<R, TaskError> {
        let _lock = self.store.lock_tasks()?;
        let mut tasks = TaskCollection::from_vec(self.store.read_tasks()?);
        let (result, changed) = f(&mut tasks)?;
        if changed {
            self.store.write_tasks(tasks.as_slice())?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    fn task(id: &str) -> Task {
        Task {
            id: id.into(),
            title: id.to_uppercase(),
            description: String::new(),
            status: TaskStatus::Todo,
            project_id: "p1".into(),
            time_spent_minutes: 0,
            priority: Priority::Medium,
            created_at: "2025-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn index_follows_removals() {
        let mut c = TaskCollection::from_vec(vec![task("a"), task("b"), task("c")]);
        assert_eq!(c.remove("a").map(|t| t.id), Some("a".into()));
        assert_eq!(c.get("c").map(|t| t.title.as_str()), Some("C"));
        assert_eq!(c.get("b").map(|t| t.title.as_str()), Some("B"));
        assert!(c.remove("a").is_none());
        assert_eq!(c.as_slice().len(), 2);
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut c = TaskCollection::default();
        c.insert(task("a")).unwrap();
        assert!(matches!(c.insert(task("a")), Err(TaskError::DuplicateId(id)) if id == "a"));
        assert_eq!(c.as_slice().len(), 1);
    }

    #[test]
    fn replace_misses_are_reported() {
        let mut c = TaskCollection::from_vec(vec![task("a")]);
        assert!(!c.replace(task("zzz")));
        let mut changed = task("a");
        changed.title = "Changed".into();
        assert!(c.replace(changed));
        assert_eq!(c.get("a").unwrap().title, "Changed");
    }

    #[test]
    fn repeated_ids_are_handled_together() {
        let mut c = TaskCollection::from_vec(vec![task("dup"), task("b"), task("dup")]);
        let mut changed = task("dup");
        changed.title = "Both".into();
        assert!(c.replace(changed));
        assert!(c.as_slice().iter().filter(|t| t.id == "dup").all(|t| t.title == "Both"));

        assert!(c.remove("dup").is_some());
        assert!(!c.contains("dup"));
        assert_eq!(c.as_slice().len(), 1);
        assert_eq!(c.get("b").map(|t| t.title.as_str()), Some("B"));
    }
}
