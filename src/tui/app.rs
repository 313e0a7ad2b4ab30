use std::sync::Arc;

use ratatui::widgets::TableState;
use tracing::warn;

use crate::advisor::{Advisor, AnalysisRunner, RequestToken, FALLBACK_MESSAGE};
use crate::config::AdvisorConfig;
use crate::error::TaskError;
use crate::models::{Priority, Project, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::repository::TaskRepository;
use crate::session::Session;
use crate::stats::{compute_stats, DashboardStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
    Board,
    Coach,
    Settings,
}

impl Screen {
    pub const TABS: [Screen; 4] = [Screen::Dashboard, Screen::Board, Screen::Coach, Screen::Settings];

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::Dashboard => "Dashboard",
            Screen::Board => "Tasks",
            Screen::Coach => "AI Coach",
            Screen::Settings => "Settings",
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    None,
    Email,
    Title,
    Description,
    LogMinutes,
}

/// What the coach screen is showing.
#[derive(Debug, Clone, PartialEq)]
pub enum CoachState {
    Idle,
    Loading(RequestToken),
    Showing(String),
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub title: String,
    pub project_index: usize,
    pub priority: Priority,
    pub minutes: u32,
    pub step: usize, // 0: Title, 1: Project, 2: Priority, 3: Minutes, 4: Description
}

pub struct App {
    pub repo: TaskRepository,
    pub session: Session,
    pub screen: Screen,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub stats: DashboardStats,
    /// Index into [`TaskStatus::ALL`] of the focused board column.
    pub column: usize,
    pub column_states: [TableState; 3],
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<String>,
    pub add_state: AddState,
    pub coach: CoachState,
    runner: Option<AnalysisRunner>,
    /// One-line feedback shown above the help bar, e.g. a storage error.
    pub message: Option<String>,
    pub should_quit: bool,
}

impl App {
    /// Creates the app state and loads initial data.
    pub fn new(repo: TaskRepository, session: Session, advisor: &AdvisorConfig) -> App {
        let runner = match Advisor::from_config(advisor) {
            Ok(a) => Some(AnalysisRunner::new(Arc::new(a))),
            Err(e) => {
                warn!("AI coach unavailable: {e}");
                None
            }
        };
        Self::with_runner(repo, session, runner)
    }

    pub fn with_runner(repo: TaskRepository, session: Session, runner: Option<AnalysisRunner>) -> App {
        let mut app = App {
            repo,
            session,
            screen: Screen::Dashboard,
            tasks: Vec::new(),
            projects: Vec::new(),
            stats: DashboardStats::default(),
            column: 0,
            column_states: Default::default(),
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            coach: CoachState::Idle,
            runner,
            message: None,
            should_quit: false,
        };
        if !app.session.is_authenticated() {
            app.start_login();
        }
        app.reload();
        app
    }

    /// Reloads tasks and projects from storage and refreshes the derived view state.
    pub fn reload(&mut self) {
        match self.repo.list().and_then(|t| Ok((t, self.repo.projects()?))) {
            Ok((tasks, projects)) => {
                self.tasks = tasks;
                self.projects = projects;
            }
            Err(e) => {
                warn!("reload failed: {e}");
                self.message = Some(format!("Could not load data: {e}"));
            }
        }
        self.stats = compute_stats(&self.tasks, &self.projects);

        for (i, status) in TaskStatus::ALL.iter().enumerate() {
            let len = self.tasks.iter().filter(|t| t.status == *status).count();
            let state = &mut self.column_states[i];
            if len == 0 {
                state.select(None);
            } else if let Some(sel) = state.selected() {
                if sel >= len {
                    state.select(Some(len - 1));
                }
            } else {
                state.select(Some(0));
            }
        }
    }

    pub fn column_status(&self) -> TaskStatus {
        TaskStatus::ALL[self.column]
    }

    /// Tasks of one board column, in insertion order.
    pub fn column_tasks(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let i = self.column_states[self.column].selected()?;
        self.column_tasks(self.column_status()).get(i).copied()
    }

    pub fn project_name(&self, id: &str) -> Option<&str> {
        self.projects.iter().find(|p| p.id == id).map(|p| p.name.as_str())
    }

    fn report<T>(&mut self, result: Result<T, TaskError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("task operation failed: {e}");
                self.message = Some(e.to_string());
                None
            }
        }
    }

    pub fn next_screen(&mut self) {
        if self.screen == Screen::Login { return; }
        let i = Screen::TABS.iter().position(|s| *s == self.screen).unwrap_or(0);
        self.screen = Screen::TABS[(i + 1) % Screen::TABS.len()];
    }

    pub fn go_to(&mut self, screen: Screen) {
        if self.screen == Screen::Login || screen == Screen::Login { return; }
        self.screen = screen;
        self.reload();
    }

    /// Selects the next task in the focused column.
    pub fn next(&mut self) {
        let len = self.column_tasks(self.column_status()).len();
        if len == 0 { return; }
        let state = &mut self.column_states[self.column];
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous task in the focused column.
    pub fn previous(&mut self) {
        let len = self.column_tasks(self.column_status()).len();
        if len == 0 { return; }
        let state = &mut self.column_states[self.column];
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn next_column(&mut self) {
        self.column = (self.column + 1) % TaskStatus::ALL.len();
    }

    pub fn previous_column(&mut self) {
        self.column = (self.column + TaskStatus::ALL.len() - 1) % TaskStatus::ALL.len();
    }

    /// Moves the selected task to the next column and follows it there.
    pub fn advance_selected(&mut self) {
        let Some(t) = self.selected_task() else { return };
        let (id, status) = (t.id.clone(), t.status.next());
        let res = self.repo.set_status(&id, status);
        if let Some(Some(_)) = self.report(res) {
            self.reload();
            self.focus_task(&id);
        }
    }

    /// Cycles the priority of the selected task.
    pub fn cycle_priority(&mut self) {
        let Some(t) = self.selected_task() else { return };
        let priority = match t.priority {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        };
        let patch = TaskPatch { priority: Some(priority), ..Default::default() };
        let res = self.repo.edit(&t.id.clone(), patch);
        self.report(res);
        self.reload();
    }

    /// Moves the selected task to the next project in the list.
    pub fn cycle_project(&mut self) {
        if self.projects.is_empty() { return; }
        let Some(t) = self.selected_task() else { return };
        let next = match self.projects.iter().position(|p| p.id == t.project_id) {
            Some(i) => (i + 1) % self.projects.len(),
            None => 0,
        };
        let patch = TaskPatch { project_id: Some(self.projects[next].id.clone()), ..Default::default() };
        let res = self.repo.edit(&t.id.clone(), patch);
        self.report(res);
        self.reload();
    }

    /// Deletes the currently selected task.
    pub fn delete_selected(&mut self) {
        let Some(t) = self.selected_task() else { return };
        let res = self.repo.delete(&t.id.clone());
        self.report(res);
        self.reload();
    }

    fn focus_task(&mut self, id: &str) {
        let Some(task) = self.tasks.iter().find(|t| t.id == id) else { return };
        let status = task.status;
        let Some(column) = TaskStatus::ALL.iter().position(|s| *s == status) else { return };
        self.column = column;
        let pos = self.column_tasks(status).iter().position(|t| t.id == id);
        self.column_states[column].select(pos);
    }

    pub fn start_login(&mut self) {
        self.screen = Screen::Login;
        self.input_mode = InputMode::Editing;
        self.input_field = InputField::Email;
        self.input_buffer.clear();
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.session.logout() {
            self.message = Some(format!("Logout failed: {e}"));
            return;
        }
        self.cancel_analysis();
        self.coach = CoachState::Idle;
        self.start_login();
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Initiates editing of a specific field for the selected task.
    pub fn start_edit(&mut self, field: InputField) {
        let Some(t) = self.selected_task() else { return };
        let prefill = match field {
            InputField::Title => t.title.clone(),
            InputField::Description => t.description.clone(),
            _ => String::new(),
        };
        let id = t.id.clone();
        self.target_id = Some(id);
        self.input_mode = InputMode::Editing;
        self.input_field = field;
        self.input_buffer = prefill;
    }

    pub fn cancel_input(&mut self) {
        // The login prompt cannot be dismissed; it guards every other screen.
        if self.screen == Screen::Login { return; }
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    /// Handles the Enter key based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Normal => {}
        }
    }

    /// Left/right inside the wizard steps that pick from a list.
    pub fn adjust_choice(&mut self, forward: bool) {
        if self.input_mode != InputMode::Adding { return; }
        match self.add_state.step {
            1 if !self.projects.is_empty() => {
                let n = self.projects.len();
                let i = self.add_state.project_index;
                self.add_state.project_index = if forward { (i + 1) % n } else { (i + n - 1) % n };
            }
            2 => {
                self.add_state.priority = match (self.add_state.priority, forward) {
                    (Priority::Low, true) | (Priority::High, false) => Priority::Medium,
                    (Priority::Medium, true) | (Priority::Low, false) => Priority::High,
                    (Priority::High, true) | (Priority::Medium, false) => Priority::Low,
                };
            }
            _ => {}
        }
    }

    /// Handles input for the "Add Task" wizard.
    fn handle_adding_input(&mut self) {
        match self.add_state.step {
            0 => { // Title
                if !self.input_buffer.trim().is_empty() {
                    self.add_state.title = self.input_buffer.clone();
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
            }
            1 | 2 => { // Project, Priority
                self.add_state.step += 1;
                self.input_buffer.clear();
            }
            3 => { // Minutes
                if self.input_buffer.trim().is_empty() {
                    self.add_state.minutes = 0;
                } else if let Ok(m) = self.input_buffer.trim().parse::<u32>() {
                    self.add_state.minutes = m;
                } else {
                    return;
                }
                self.add_state.step += 1;
                self.input_buffer.clear();
            }
            4 => { // Description, then finish
                let draft = TaskDraft {
                    title: self.add_state.title.clone(),
                    description: self.input_buffer.trim().to_string(),
                    status: self.column_status(),
                    project_id: self.projects.get(self.add_state.project_index).map(|p| p.id.clone()),
                    priority: self.add_state.priority,
                    time_spent_minutes: self.add_state.minutes,
                };
                match self.repo.create(draft) {
                    Ok(task) => {
                        self.input_mode = InputMode::Normal;
                        self.input_buffer.clear();
                        self.reload();
                        self.focus_task(&task.id);
                    }
                    // Blank titles never reach this step; keep the wizard open if one does.
                    Err(TaskError::EmptyTitle) => {}
                    Err(e) => {
                        self.report::<()>(Err(e));
                        self.input_mode = InputMode::Normal;
                    }
                }
            }
            _ => {}
        }
    }

    /// Handles input for the edit prompts and the login screen.
    fn handle_editing_input(&mut self) {
        if self.input_field == InputField::Email {
            let email = self.input_buffer.clone();
            match self.session.login(&email) {
                Ok(_) => {
                    self.input_mode = InputMode::Normal;
                    self.input_field = InputField::None;
                    self.input_buffer.clear();
                    self.screen = Screen::Dashboard;
                    self.message = None;
                    self.reload();
                }
                Err(e) => self.message = Some(format!("Login failed: {e}")),
            }
            return;
        }

        let Some(id) = self.target_id.take() else {
            self.input_mode = InputMode::Normal;
            return;
        };
        match self.input_field {
            InputField::Title => {
                // An empty title is ignored rather than reported.
                if !self.input_buffer.trim().is_empty() {
                    let patch = TaskPatch { title: Some(self.input_buffer.trim().to_string()), ..Default::default() };
                    let res = self.repo.edit(&id, patch);
                    self.report(res);
                }
            }
            InputField::Description => {
                let patch = TaskPatch { description: Some(self.input_buffer.trim().to_string()), ..Default::default() };
                let res = self.repo.edit(&id, patch);
                self.report(res);
            }
            InputField::LogMinutes => {
                if let Ok(m) = self.input_buffer.trim().parse::<u32>() {
                    let res = self.repo.log_time(&id, m);
                    self.report(res);
                }
            }
            InputField::Email | InputField::None => {}
        }
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
        self.reload();
    }

    /// Starts an analysis of the current tasks. Ignored while one is loading.
    pub fn start_analysis(&mut self) {
        if matches!(self.coach, CoachState::Loading(_)) { return; }
        let Some(runner) = self.runner.as_mut() else {
            self.coach = CoachState::Showing(FALLBACK_MESSAGE.to_string());
            return;
        };
        let tasks = match self.repo.list() {
            Ok(t) => t,
            Err(e) => {
                self.message = Some(format!("Could not load tasks: {e}"));
                return;
            }
        };
        match runner.start(tasks) {
            Ok(token) => self.coach = CoachState::Loading(token),
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    pub fn cancel_analysis(&mut self) {
        if let Some(runner) = self.runner.as_mut() {
            runner.cancel();
        }
        if matches!(self.coach, CoachState::Loading(_)) {
            self.coach = CoachState::Idle;
        }
    }

    pub fn reset_analysis(&mut self) {
        if !matches!(self.coach, CoachState::Loading(_)) {
            self.coach = CoachState::Idle;
        }
    }

    /// Picks up a finished analysis, if there is one for the current request.
    pub fn tick(&mut self) {
        let CoachState::Loading(waiting) = self.coach else { return };
        let Some(runner) = self.runner.as_mut() else { return };
        if let Some((token, text)) = runner.poll() {
            if token == waiting {
                self.coach = CoachState::Showing(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use crate::advisor::GenerativeModel;
    use crate::storage::Store;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    struct CannedModel;

    impl GenerativeModel for CannedModel {
        fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AdvisorError> {
            Ok("Do the report first.".into())
        }
    }

    fn logged_in_app(dir: &TempDir) -> App {
        let store = Store::open(dir.path()).unwrap();
        let mut session = Session::hydrate(store.clone()).unwrap();
        session.login("tester@example.com").unwrap();
        let advisor = Advisor::new(Arc::new(CannedModel), "m", "English");
        App::with_runner(TaskRepository::new(store), session, Some(AnalysisRunner::new(Arc::new(advisor))))
    }

    fn type_and_enter(app: &mut App, text: &str) {
        app.input_buffer = text.to_string();
        app.handle_input();
    }

    #[test]
    fn starts_on_login_without_session() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let session = Session::hydrate(store.clone()).unwrap();
        let mut app = App::with_runner(TaskRepository::new(store), session, None);
        assert_eq!(app.screen, Screen::Login);

        app.cancel_input();
        assert_eq!(app.input_mode, InputMode::Editing);

        type_and_enter(&mut app, "");
        assert_eq!(app.screen, Screen::Dashboard);
        assert!(app.session.is_authenticated());
    }

    #[test]
    fn add_wizard_creates_task_in_focused_column() {
        let dir = TempDir::new().unwrap();
        let mut app = logged_in_app(&dir);
        app.go_to(Screen::Board);
        app.next_column();
        app.start_add();

        type_and_enter(&mut app, "   ");
        assert_eq!(app.add_state.step, 0);
        type_and_enter(&mut app, "Write report");
        app.adjust_choice(true);
        type_and_enter(&mut app, "");
        app.adjust_choice(true);
        type_and_enter(&mut app, "");
        type_and_enter(&mut app, "45");
        type_and_enter(&mut app, "Quarterly numbers");

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.tasks.len(), 1);
        let t = &app.tasks[0];
        assert_eq!(t.title, "Write report");
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(t.project_id, app.projects[1].id);
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.time_spent_minutes, 45);
        assert_eq!(app.selected_task().map(|s| s.id.clone()), Some(t.id.clone()));
    }

    #[test]
    fn advancing_moves_task_between_columns() {
        let dir = TempDir::new().unwrap();
        let mut app = logged_in_app(&dir);
        app.repo.create(TaskDraft::new("Move me")).unwrap();
        app.reload();

        app.advance_selected();
        assert_eq!(app.tasks[0].status, TaskStatus::InProgress);
        assert_eq!(app.column, 1);
        app.advance_selected();
        assert_eq!(app.tasks[0].status, TaskStatus::Done);
        assert_eq!(app.stats.completed_tasks, 1);

        app.delete_selected();
        assert!(app.tasks.is_empty());
        assert!(app.selected_task().is_none());
    }

    #[test]
    fn coach_ignores_reentry_while_loading() {
        let dir = TempDir::new().unwrap();
        let mut app = logged_in_app(&dir);
        app.go_to(Screen::Coach);

        app.start_analysis();
        let CoachState::Loading(token) = app.coach else { panic!("expected loading") };
        app.start_analysis();
        assert_eq!(app.coach, CoachState::Loading(token));

        let deadline = Instant::now() + Duration::from_secs(5);
        while matches!(app.coach, CoachState::Loading(_)) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
            app.tick();
        }
        assert_eq!(app.coach, CoachState::Showing("Do the report first.".into()));
    }

    #[test]
    fn logout_returns_to_login() {
        let dir = TempDir::new().unwrap();
        let mut app = logged_in_app(&dir);
        app.go_to(Screen::Settings);
        app.logout();
        assert_eq!(app.screen, Screen::Login);
        assert!(!app.session.is_authenticated());
    }
}
