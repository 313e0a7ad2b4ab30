use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Workflow state of a task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    /// Wire name, as persisted and as sent to the advisor.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }

    /// Column heading used by the board views.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    /// The status after this one, wrapping from done back to todo.
    pub fn next(&self) -> TaskStatus {
        match self {
            TaskStatus::Todo => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Todo,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "todo" | "to-do" | "not-started" => Ok(TaskStatus::Todo),
            "in-progress" | "inprogress" | "doing" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("unknown status '{}' (expected todo, in-progress or done)", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}' (expected low, medium or high)", other)),
        }
    }
}

/// Represents a single tracked unit of work.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, assigned once at creation.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Owning project. Not validated against the project list.
    pub project_id: String,
    /// Total time worked on the task, in minutes.
    #[serde(default)]
    pub time_spent_minutes: u32,
    #[serde(default)]
    pub priority: Priority,
    /// Timestamp when the task was created (ISO 8601).
    pub created_at: String,
}

/// Input for creating a task. The repository fills in identity and timestamp.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub project_id: Option<String>,
    pub priority: Priority,
    pub time_spent_minutes: u32,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        TaskDraft {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Field-wise changes applied by an edit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub project_id: Option<String>,
    pub priority: Option<Priority>,
    pub time_spent_minutes: Option<u32>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.project_id.is_none()
            && self.priority.is_none()
            && self.time_spent_minutes.is_none()
    }

    /// Applies the patch to `task`, leaving its identity and creation time alone.
    pub fn apply(self, task: &mut Task) {
        if let Some(t) = self.title { task.title = t; }
        if let Some(d) = self.description { task.description = d; }
        if let Some(s) = self.status { task.status = s; }
        if let Some(p) = self.project_id { task.project_id = p; }
        if let Some(p) = self.priority { task.priority = p; }
        if let Some(m) = self.time_spent_minutes { task.time_spent_minutes = m; }
    }
}

/// A named grouping for tasks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Display color, as a hex string.
    pub color: String,
    #[serde(default)]
    pub description: String,
}

/// Projects used when nothing has been saved yet.
pub fn default_projects() -> Vec<Project> {
    vec![
        Project {
            id: "p1".into(),
            name: "Work".into(),
            color: "#3b82f6".into(),
            description: "Client and day-job work".into(),
        },
        Project {
            id: "p2".into(),
            name: "Personal".into(),
            color: "#10b981".into(),
            description: "Errands, home and health".into(),
        },
        Project {
            id: "p3".into(),
            name: "Learning".into(),
            color: "#a855f7".into(),
            description: "Courses, reading and side projects".into(),
        },
    ]
}

/// Locally fabricated identity of the person using the app. Not a verified credential.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub is_pro: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_kebab_case_wire_names() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let parsed: TaskStatus = serde_json::from_str("\"todo\"").unwrap();
        assert_eq!(parsed, TaskStatus::Todo);
    }

    #[test]
    fn task_fields_are_camel_case() {
        let task = Task {
            id: "a1".into(),
            title: "Write report".into(),
            description: String::new(),
            status: TaskStatus::Done,
            project_id: "p1".into(),
            time_spent_minutes: 30,
            priority: Priority::High,
            created_at: "2025-01-01T00:00:00Z".into(),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["projectId"], "p1");
        assert_eq!(value["timeSpentMinutes"], 30);
        assert_eq!(value["createdAt"], "2025-01-01T00:00:00Z");
        assert_eq!(value["priority"], "high");
    }

    #[test]
    fn patch_keeps_identity() {
        let mut task = Task {
            id: "a1".into(),
            title: "Old".into(),
            description: String::new(),
            status: TaskStatus::Todo,
            project_id: "p1".into(),
            time_spent_minutes: 0,
            priority: Priority::Low,
            created_at: "2025-01-01T00:00:00Z".into(),
        };
        TaskPatch { title: Some("New".into()), status: Some(TaskStatus::Done), ..Default::default() }
            .apply(&mut task);
        assert_eq!(task.id, "a1");
        assert_eq!(task.title, "New");
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.created_at, "2025-01-01T00:00:00Z");
    }

    #[test]
    fn status_parsing_accepts_aliases() {
        assert_eq!("In-Progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("not-started".parse::<TaskStatus>(), Ok(TaskStatus::Todo));
        assert!("later".parse::<TaskStatus>().is_err());
        assert!(" HIGH ".parse::<Priority>().is_ok());
    }
}
