mod common;

use std::sync::Arc;

use common::{task, test_repo};
use taskcoach::advisor::{Advisor, AnalysisRunner, GenerativeModel, FALLBACK_MESSAGE};
use taskcoach::commands::*;
use taskcoach::error::AdvisorError;
use taskcoach::models::{Priority, TaskDraft, TaskPatch, TaskStatus};

#[test]
fn test_add_and_list() {
    let (_dir, repo) = test_repo();
    let mut draft = TaskDraft::new("Test Task");
    draft.project_id = Some("p2".into());
    draft.priority = Priority::High;
    cmd_add(&repo, draft, true).unwrap();

    let tasks = repo.list().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Test Task");
    assert_eq!(tasks[0].project_id, "p2");
    assert_eq!(tasks[0].priority, Priority::High);
}

#[test]
fn test_add_blank_title_is_noop() {
    let (_dir, repo) = test_repo();
    let added = cmd_add(&repo, TaskDraft::new("   "), true).unwrap();
    assert!(added.is_none());
    assert!(repo.list().unwrap().is_empty());
}

#[test]
fn test_commands_accept_id_prefix() {
    let (_dir, repo) = test_repo();
    let task = cmd_add(&repo, TaskDraft::new("Prefix me"), true).unwrap().unwrap();
    let prefix = short_id(&task.id).to_string();

    cmd_status(&repo, &prefix, TaskStatus::Done, true).unwrap();
    cmd_log(&repo, &prefix, 20, true).unwrap();

    let t = repo.get(&task.id).unwrap().unwrap();
    assert_eq!(t.status, TaskStatus::Done);
    assert_eq!(t.time_spent_minutes, 20);

    cmd_remove(&repo, &prefix, true).unwrap();
    assert!(repo.list().unwrap().is_empty());
}

#[test]
fn test_unknown_id_is_ignored() {
    let (_dir, repo) = test_repo();
    cmd_add(&repo, TaskDraft::new("Stay"), true).unwrap();
    let before = repo.list().unwrap();

    cmd_remove(&repo, "zzzz", true).unwrap();
    cmd_log(&repo, "zzzz", 5, true).unwrap();
    let patch = TaskPatch { title: Some("Nope".into()), ..Default::default() };
    cmd_edit(&repo, "zzzz", patch, true).unwrap();

    assert_eq!(repo.list().unwrap(), before);
}

#[test]
fn test_edit_updates_fields() {
    let (_dir, repo) = test_repo();
    let task = cmd_add(&repo, TaskDraft::new("Draft"), true).unwrap().unwrap();
    let patch = TaskPatch {
        title: Some("Final".into()),
        description: Some("Ship it".into()),
        time_spent_minutes: Some(90),
        ..Default::default()
    };
    cmd_edit(&repo, &task.id, patch, true).unwrap();

    let t = repo.get(&task.id).unwrap().unwrap();
    assert_eq!(t.title, "Final");
    assert_eq!(t.description, "Ship it");
    assert_eq!(t.time_spent_minutes, 90);
}

#[test]
fn test_ambiguous_prefix_is_an_error() {
    let (_dir, repo) = test_repo();
    repo.add(task("abc-1", TaskStatus::Todo, 0)).unwrap();
    repo.add(task("abc-2", TaskStatus::Todo, 0)).unwrap();
    assert!(resolve_id(&repo, "abc").is_err());
    assert_eq!(resolve_id(&repo, "abc-2").unwrap().as_deref(), Some("abc-2"));
}

#[test]
fn test_blank_id_matches_nothing() {
    let (_dir, repo) = test_repo();
    let only = cmd_add(&repo, TaskDraft::new("Only task"), true).unwrap().unwrap();

    assert_eq!(resolve_id(&repo, "").unwrap(), None);
    assert_eq!(resolve_id(&repo, "   ").unwrap(), None);
    cmd_remove(&repo, "", true).unwrap();
    assert_eq!(repo.list().unwrap(), vec![only]);
}

struct FailingModel;

impl GenerativeModel for FailingModel {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AdvisorError> {
        Err(AdvisorError::Malformed("connection reset".into()))
    }
}

#[test]
fn test_coach_failure_returns_fallback() {
    let (_dir, repo) = test_repo();
    cmd_add(&repo, TaskDraft::new("Plan sprint"), true).unwrap();

    let advisor = Advisor::new(Arc::new(FailingModel), "any-model", "English");
    assert_eq!(advisor.analyze(&repo.list().unwrap()), FALLBACK_MESSAGE);

    let mut runner = AnalysisRunner::new(Arc::new(advisor));
    runner.start(repo.list().unwrap()).unwrap();
    let (_, text) = runner.wait().unwrap();
    assert_eq!(text, FALLBACK_MESSAGE);
}

#[test]
fn test_dashboard_renders_status_breakdown() {
    let (_dir, repo) = test_repo();
    repo.add(task("a", TaskStatus::Todo, 30)).unwrap();
    repo.add(task("b", TaskStatus::InProgress, 45)).unwrap();
    repo.add(task("c", TaskStatus::Done, 60)).unwrap();
    cmd_dashboard(&repo).unwrap();
}
