#![allow(dead_code)]

use taskcoach::models::{Priority, Task, TaskStatus};
use taskcoach::repository::TaskRepository;
use taskcoach::storage::Store;
use tempfile::TempDir;

/// A repository over a fresh temporary data directory. Keep the `TempDir` alive
/// for the duration of the test.
pub fn test_repo() -> (TempDir, TaskRepository) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    (dir, TaskRepository::new(store))
}

pub fn task(id: &str, status: TaskStatus, minutes: u32) -> Task {
    Task {
        id: id.into(),
        title: format!("Task {id}"),
        description: String::new(),
        status,
        project_id: "p1".into(),
        time_spent_minutes: minutes,
        priority: Priority::Medium,
        created_at: "2025-06-01T08:00:00+00:00".into(),
    }
}
