use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::advisor::{Advisor, AnalysisRunner};
use crate::error::TaskError;
use crate::models::{Priority, Project, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::repository::TaskRepository;
use crate::session::Session;
use crate::stats::{compute_stats, format_minutes, recent_tasks, time_by_project};
use crate::storage::Store;

/// Length of the id prefix shown in tables.
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Resolves a full id or a unique id prefix to a task id.
pub fn resolve_id(repo: &TaskRepository, needle: &str) -> Result<Option<String>> {
    let needle = needle.trim();
    if needle.is_empty() {
        return Ok(None);
    }
    let tasks = repo.list()?;
    if let Some(t) = tasks.iter().find(|t| t.id == needle) {
        return Ok(Some(t.id.clone()));
    }
    let matches: Vec<&Task> = tasks.iter().filter(|t| t.id.starts_with(needle)).collect();
    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(only.id.clone())),
        _ => bail!("id prefix '{}' is ambiguous ({} tasks match)", needle, matches.len()),
    }
}

fn project_label(projects: &[Project], id: &str) -> String {
    projects
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn priority_color(p: Priority) -> Color {
    match p {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Blue,
    }
}

fn status_color(s: TaskStatus) -> Color {
    match s {
        TaskStatus::Todo => Color::Grey,
        TaskStatus::InProgress => Color::Yellow,
        TaskStatus::Done => Color::Green,
    }
}

/// Creates a task. A blank title adds nothing.
pub fn cmd_add(repo: &TaskRepository, draft: TaskDraft, silent: bool) -> Result<Option<Task>> {
    match repo.create(draft) {
        Ok(task) => {
            if !silent { println!("Task added (id = {})", short_id(&task.id)); }
            Ok(Some(task))
        }
        Err(TaskError::EmptyTitle) => {
            if !silent { eprintln!("Task title is empty, nothing added."); }
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Prints the board: one table per status column, tasks in insertion order.
pub fn cmd_list(repo: &TaskRepository, status: Option<TaskStatus>, project: Option<String>) -> Result<()> {
    let mut tasks = repo.list()?;
    let projects = repo.projects()?;
    if let Some(p) = &project {
        let wanted = projects
            .iter()
            .find(|pr| pr.id == *p || pr.name.eq_ignore_ascii_case(p))
            .map(|pr| pr.id.clone())
            .unwrap_or_else(|| p.clone());
        tasks.retain(|t| t.project_id == wanted);
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let columns: Vec<TaskStatus> = match status {
        Some(s) => vec![s],
        None => TaskStatus::ALL.to_vec(),
    };

    for column in columns {
        let in_column: Vec<&Task> = tasks.iter().filter(|t| t.status == column).collect();
        println!("{} ({})", column.label(), in_column.len());
        if in_column.is_empty() {
            println!();
            continue;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("ID").add_attribute(Attribute::Bold),
                Cell::new("Title").add_attribute(Attribute::Bold),
                Cell::new("Project").add_attribute(Attribute::Bold),
                Cell::new("Priority").add_attribute(Attribute::Bold),
                Cell::new("Time").add_attribute(Attribute::Bold),
            ]);
        for t in in_column {
            table.add_row(vec![
                Cell::new(short_id(&t.id)),
                Cell::new(&t.title),
                Cell::new(project_label(&projects, &t.project_id)),
                Cell::new(t.priority).fg(priority_color(t.priority)),
                Cell::new(format_minutes(u64::from(t.time_spent_minutes))),
            ]);
        }
        println!("{table}\n");
    }
    Ok(())
}

/// Prints every field of one task.
pub fn cmd_show(repo: &TaskRepository, id: &str) -> Result<()> {
    let Some(id) = resolve_id(repo, id)? else {
        eprintln!("Task {} not found.", id);
        return Ok(());
    };
    let Some(t) = repo.get(&id)? else {
        eprintln!("Task {} not found.", id);
        return Ok(());
    };
    let project = repo.project_name(&t.project_id)?.unwrap_or_else(|| "-".into());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec![Cell::new("ID").add_attribute(Attribute::Bold), Cell::new(&t.id)]);
    table.add_row(vec![Cell::new("Title").add_attribute(Attribute::Bold), Cell::new(&t.title)]);
    table.add_row(vec![Cell::new("Description").add_attribute(Attribute::Bold), Cell::new(&t.description)]);
    table.add_row(vec![
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new(t.status.label()).fg(status_color(t.status)),
    ]);
    table.add_row(vec![Cell::new("Project").add_attribute(Attribute::Bold), Cell::new(project)]);
    table.add_row(vec![
        Cell::new("Priority").add_attribute(Attribute::Bold),
        Cell::new(t.priority).fg(priority_color(t.priority)),
    ]);
    table.add_row(vec![
        Cell::new("Time spent").add_attribute(Attribute::Bold),
        Cell::new(format_minutes(u64::from(t.time_spent_minutes))),
    ]);
    table.add_row(vec![Cell::new("Created").add_attribute(Attribute::Bold), Cell::new(&t.created_at)]);
    println!("{table}");
    Ok(())
}

/// Moves a task to another column.
pub fn cmd_status(repo: &TaskRepository, id: &str, status: TaskStatus, silent: bool) -> Result<()> {
    cmd_edit(repo, id, TaskPatch { status: Some(status), ..Default::default() }, silent)
}

/// Edits an existing task's fields.
pub fn cmd_edit(repo: &TaskRepository, id: &str, patch: TaskPatch, silent: bool) -> Result<()> {
    if patch.is_empty() {
        if !silent { eprintln!("Nothing to change."); }
        return Ok(());
    }
    let Some(full_id) = resolve_id(repo, id)? else {
        if !silent { eprintln!("Task {} not found.", id); }
        return Ok(());
    };
    match repo.edit(&full_id, patch) {
        Ok(Some(t)) => {
            if !silent { println!("Task {} updated.", short_id(&t.id)); }
        }
        Ok(None) => {
            if !silent { eprintln!("Task {} not found.", id); }
        }
        Err(TaskError::EmptyTitle) => {
            if !silent { eprintln!("Task title must not be empty."); }
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Logs minutes worked on a task.
///
/// time_spent_minutes += minutes
pub fn cmd_log(repo: &TaskRepository, id: &str, minutes: u32, silent: bool) -> Result<()> {
    let Some(full_id) = resolve_id(repo, id)? else {
        if !silent { eprintln!("Task {} not found.", id); }
        return Ok(());
    };
    match repo.log_time(&full_id, minutes)? {
        Some(t) => {
            if !silent {
                println!(
                    "Logged {} on task {} (total {}).",
                    format_minutes(u64::from(minutes)),
                    short_id(&t.id),
                    format_minutes(u64::from(t.time_spent_minutes))
                );
            }
        }
        None => {
            if !silent { eprintln!("Task {} not found.", id); }
        }
    }
    Ok(())
}

/// Removes a task by id.
pub fn cmd_remove(repo: &TaskRepository, id: &str, silent: bool) -> Result<()> {
    let Some(full_id) = resolve_id(repo, id)? else {
        if !silent { eprintln!("Task {} not found.", id); }
        return Ok(());
    };
    if repo.delete(&full_id)? {
        if !silent { println!("Task {} removed.", short_id(&full_id)); }
    } else if !silent {
        eprintln!("Task {} not found.", id);
    }
    Ok(())
}

pub fn cmd_projects(repo: &TaskRepository) -> Result<()> {
    let projects = repo.projects()?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    let tasks = repo.list()?;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Name", "Color", "Description", "Tasks"]);
    for p in projects {
        let count = tasks.iter().filter(|t| t.project_id == p.id).count();
        table.add_row(vec![
            Cell::new(&p.id),
            Cell::new(&p.name),
            Cell::new(&p.color),
            Cell::new(&p.description),
            Cell::new(count),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Prints the dashboard: headline numbers, time per project and the first tasks.
pub fn cmd_dashboard(repo: &TaskRepository) -> Result<()> {
    let tasks = repo.list()?;
    let projects = repo.projects()?;
    let stats = compute_stats(&tasks, &projects);

    let mut summary = Table::new();
    summary
        .load_preset(UTF8_FULL)
        .set_header(vec!["Total Work Hours", "Completed Tasks", "Projects", "Open Tasks"]);
    summary.add_row(vec![
        Cell::new(stats.total_hours).fg(Color::Blue),
        Cell::new(stats.completed_tasks).fg(Color::Green),
        Cell::new(stats.project_count).fg(Color::Magenta),
        Cell::new(format!(
            "{} ({} to do, {} in progress)",
            stats.active_tasks, stats.todo_tasks, stats.in_progress_tasks
        ))
        .fg(Color::Yellow),
    ]);
    println!("{summary}");

    let mut per_project = Table::new();
    per_project
        .load_preset(UTF8_FULL)
        .set_header(vec!["Project", "Tasks", "Time"]);
    for p in time_by_project(&tasks, &projects) {
        per_project.add_row(vec![
            Cell::new(p.name.unwrap_or(p.project_id)),
            Cell::new(p.tasks),
            Cell::new(format_minutes(p.minutes)),
        ]);
    }
    println!("{per_project}");

    if tasks.is_empty() {
        println!("No tasks yet.");
        return Ok(());
    }
    let mut recent = Table::new();
    recent
        .load_preset(UTF8_FULL)
        .set_header(vec!["Recent", "Status", "Time"]);
    for t in recent_tasks(&tasks) {
        recent.add_row(vec![
            Cell::new(&t.title),
            Cell::new(t.status.label()).fg(status_color(t.status)),
            Cell::new(format_minutes(u64::from(t.time_spent_minutes))),
        ]);
    }
    println!("{recent}");
    Ok(())
}

/// Asks the coach for a workload analysis and prints it.
pub fn cmd_coach(repo: &TaskRepository, advisor: Advisor) -> Result<()> {
    let tasks = repo.list()?;
    let mut runner = AnalysisRunner::new(Arc::new(advisor));
    runner.start(tasks)?;
    eprintln!("Analyzing your workload...");
    if let Some((_, text)) = runner.wait() {
        println!("{}", text.trim_end());
    }
    Ok(())
}

pub fn cmd_login(session: &mut Session, email: Option<String>) -> Result<()> {
    let user = session.login(email.as_deref().unwrap_or(""))?;
    println!("Logged in as {} ({}).", user.display_name, user.email);
    Ok(())
}

pub fn cmd_logout(session: &mut Session) -> Result<()> {
    if !session.is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    session.logout()?;
    println!("Logged out.");
    Ok(())
}

/// Prints the profile of the current user.
pub fn cmd_whoami(session: &Session) -> Result<()> {
    let Some(user) = session.user() else {
        println!("Not logged in. Run `taskcoach login [email]`.");
        return Ok(());
    };
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec![Cell::new("Name").add_attribute(Attribute::Bold), Cell::new(&user.display_name)]);
    table.add_row(vec![Cell::new("Email").add_attribute(Attribute::Bold), Cell::new(&user.email)]);
    table.add_row(vec![
        Cell::new("Plan").add_attribute(Attribute::Bold),
        Cell::new(if user.is_pro { "Pro" } else { "Free" }),
    ]);
    println!("{table}");
    Ok(())
}

/// Resets the data directory by deleting tasks, projects and the saved user.
pub fn cmd_reset(store: &Store, force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all tasks and projects? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input).context("failed to read confirmation")?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    store.reset()?;
    println!("Data reset successfully.");
    Ok(())
}
