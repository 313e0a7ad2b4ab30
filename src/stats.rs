use std::collections::HashMap;

use crate::models::{Project, Task, TaskStatus};

/// Number of tasks shown in the dashboard's "recent" list.
pub const RECENT_LIMIT: usize = 5;

/// Aggregates shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardStats {
    /// Total time spent across all tasks, rounded to whole hours.
    pub total_hours: u64,
    pub total_minutes: u64,
    pub completed_tasks: usize,
    /// Tasks in any state other than done.
    pub active_tasks: usize,
    pub project_count: usize,
    pub todo_tasks: usize,
    pub in_progress_tasks: usize,
}

/// Minutes logged against one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTime {
    pub project_id: String,
    /// Display name, if the id resolves to a known project.
    pub name: Option<String>,
    pub minutes: u64,
    pub tasks: usize,
}

pub fn compute_stats(tasks: &[Task], projects: &[Project]) -> DashboardStats {
    let total_minutes: u64 = tasks.iter().map(|t| u64::from(t.time_spent_minutes)).sum();
    let count = |s: TaskStatus| tasks.iter().filter(|t| t.status == s).count();
    let completed_tasks = count(TaskStatus::Done);

    DashboardStats {
        total_hours: minutes_to_rounded_hours(total_minutes),
        total_minutes,
        completed_tasks,
        active_tasks: tasks.len() - completed_tasks,
        project_count: projects.len(),
        todo_tasks: count(TaskStatus::Todo),
        in_progress_tasks: count(TaskStatus::InProgress),
    }
}

/// Rounds to the nearest hour, halves rounding up.
fn minutes_to_rounded_hours(minutes: u64) -> u64 {
    (minutes + 30) / 60
}

/// Time per project, in the order projects are listed, then any unknown ids
/// in order of first appearance.
pub fn time_by_project(tasks: &[Task], projects: &[Project]) -> Vec<ProjectTime> {
    let mut out: Vec<ProjectTime> = projects
        .iter()
        .map(|p| ProjectTime {
            project_id: p.id.clone(),
            name: Some(p.name.clone()),
            minutes: 0,
            tasks: 0,
        })
        .collect();
    let mut pos: HashMap<String, usize> = out
        .iter()
        .enumerate()
        .map(|(i, p)| (p.project_id.clone(), i))
        .collect();

    for t in tasks {
        let i = *pos.entry(t.project_id.clone()).or_insert_with(|| {
            out.push(ProjectTime {
                project_id: t.project_id.clone(),
                name: None,
                minutes: 0,
                tasks: 0,
            });
            out.len() - 1
        });
        out[i].minutes += u64::from(t.time_spent_minutes);
        out[i].tasks += 1;
    }
    out
}

/// The first tasks of the collection, as listed on the dashboard.
pub fn recent_tasks(tasks: &[Task]) -> &[Task] {
    &tasks[..tasks.len().min(RECENT_LIMIT)]
}

/// Formats minutes as `1h 05m`, or `45m` under an hour.
pub fn format_minutes(minutes: u64) -> String {
    if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_matches_nearest_hour() {
        assert_eq!(minutes_to_rounded_hours(0), 0);
        assert_eq!(minutes_to_rounded_hours(29), 0);
        assert_eq!(minutes_to_rounded_hours(30), 1);
        assert_eq!(minutes_to_rounded_hours(100), 2);
        assert_eq!(minutes_to_rounded_hours(89), 1);
    }

    #[test]
    fn minutes_formatting() {
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(65), "1h 05m");
        assert_eq!(format_minutes(600), "10h 00m");
    }
}
