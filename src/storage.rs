use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{default_projects, Project, Task, User};

const TASKS_FILE: &str = "tasks.json";
const PROJECTS_FILE: &str = "projects.json";
const USER_FILE: &str = "user.json";
const TASKS_LOCK_FILE: &str = "tasks.lock";

/// JSON file store rooted at the application data directory.
///
/// Layout:
/// - `tasks.json`: array of tasks, insertion order.
/// - `projects.json`: array of projects. Absent means the default set.
/// - `user.json`: the current session user. Absent means logged out.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

/// Exclusive lock over the tasks collection, released on drop.
pub struct TasksLock {
    file: File,
}

impl Drop for TasksLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("failed to release tasks lock: {e}");
        }
    }
}

impl Store {
    /// Opens the store, creating the data directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Store { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Loads all tasks. Returns an empty vector if nothing has been saved yet.
    pub fn read_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(read_json(&self.path(TASKS_FILE))?.unwrap_or_default())
    }

    /// Replaces the stored task collection.
    pub fn write_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        write_json(&self.path(TASKS_FILE), "tasks", &tasks)
    }

    /// Loads the projects, falling back to [`default_projects`] when none are saved.
    pub fn read_projects(&self) -> Result<Vec<Project>, StoreError> {
        Ok(read_json(&self.path(PROJECTS_FILE))?.unwrap_or_else(default_projects))
    }

    pub fn write_projects(&self, projects: &[Project]) -> Result<(), StoreError> {
        write_json(&self.path(PROJECTS_FILE), "projects", &projects)
    }

    pub fn read_user(&self) -> Result<Option<User>, StoreError> {
        read_json(&self.path(USER_FILE))
    }

    pub fn write_user(&self, user: &User) -> Result<(), StoreError> {
        write_json(&self.path(USER_FILE), "user", user)
    }

    /// Removes the stored user. Succeeds if there was none.
    pub fn clear_user(&self) -> Result<(), StoreError> {
        remove_if_exists(&self.path(USER_FILE))
    }

    /// Takes the cross-process lock guarding read-modify-write of the tasks file.
    pub fn lock_tasks(&self) -> Result<TasksLock, StoreError> {
        let path = self.path(TASKS_LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        FileExt::lock_exclusive(&file).map_err(|e| StoreError::io(&path, e))?;
        Ok(TasksLock { file })
    }

    /// Deletes the tasks, projects and user files.
    pub fn reset(&self) -> Result<(), StoreError> {
        for name in [TASKS_FILE, PROJECTS_FILE, USER_FILE] {
            remove_if_exists(&self.path(name))?;
        }
        Ok(())
    }
}

/// Reads and decodes `path`. `Ok(None)` when the file does not exist; a file that
/// exists but does not decode is reported as [`StoreError::Corrupt`].
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let mut f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let mut s = String::new();
    f.read_to_string(&mut s).map_err(|e| StoreError::io(path, e))?;
    debug!(path = %path.display(), bytes = s.len(), "read store file");
    serde_json::from_str(&s)
        .map(Some)
        .map_err(|source| StoreError::Corrupt { path: path.to_path_buf(), source })
}

/// Encodes `value` and swaps it into place, so readers never see a partial file.
fn write_json<T: Serialize + ?Sized>(path: &Path, what: &'static str, value: &T) -> Result<(), StoreError> {
    let s = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode { what, source })?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(s.as_bytes()).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    debug!(path = %path.display(), bytes = s.len(), "wrote store file");
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
