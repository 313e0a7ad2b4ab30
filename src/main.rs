use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing::error;
use tracing::level_filters::LevelFilter;

use taskcoach::advisor::Advisor;
use taskcoach::commands::*;
use taskcoach::config::AppConfig;
use taskcoach::logging::{enable_logging, CLI_PREFIX, TUI_PREFIX};
use taskcoach::models::{Priority, TaskDraft, TaskPatch, TaskStatus};
use taskcoach::repository::TaskRepository;
use taskcoach::session::Session;
use taskcoach::storage::Store;
use taskcoach::tui::run_tui;

#[derive(Parser)]
#[command(name = "taskcoach", version)]
#[command(about = "Terminal task tracker with an AI workload coach", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Data directory (overrides TASKCOACH_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Print trace logs to stderr
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in locally (no password; a blank email uses the demo account)
    Login {
        email: Option<String>,
    },
    /// Log out and forget the saved user
    Logout,
    /// Show the current profile
    Whoami,
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Longer description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Project id or name (defaults to the first project)
        #[arg(short, long)]
        project: Option<String>,
        /// low, medium or high
        #[arg(short = 'P', long, default_value = "medium")]
        priority: Priority,
        /// todo, in-progress or done
        #[arg(short, long, default_value = "todo")]
        status: TaskStatus,
        /// Minutes already spent
        #[arg(short, long, default_value_t = 0)]
        minutes: u32,
    },
    /// Show the task board
    List {
        /// Only this column
        #[arg(short, long)]
        status: Option<TaskStatus>,
        /// Only this project (id or name)
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Show one task
    Show {
        id: String,
    },
    /// Move a task to another column
    Status {
        id: String,
        status: TaskStatus,
    },
    /// Edit a task
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        project: Option<String>,
        #[arg(short = 'P', long)]
        priority: Option<Priority>,
        #[arg(short, long)]
        status: Option<TaskStatus>,
        /// Replace the time spent, in minutes
        #[arg(short, long)]
        minutes: Option<u32>,
    },
    /// Log minutes worked on a task
    Log {
        id: String,
        /// Minutes to add
        minutes: u32,
    },
    /// Remove a task
    Remove {
        id: String,
    },
    /// List projects
    Projects,
    /// Show statistics
    Dashboard,
    /// Ask the AI coach for a workload analysis
    Coach,
    /// Delete all tasks, projects and the saved user
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
    /// Open interactive TUI
    Ui,
}

impl Commands {
    /// Task screens are only reachable with a session, like the app's protected routes.
    fn needs_session(&self) -> bool {
        !matches!(
            self,
            Commands::Login { .. }
                | Commands::Logout
                | Commands::Whoami
                | Commands::Reset { .. }
                | Commands::Completions { .. }
                | Commands::Ui
        )
    }
}

/// Maps a project name to its id; anything unknown is used as given.
fn project_id_for(repo: &TaskRepository, project: Option<String>) -> Result<Option<String>> {
    let Some(p) = project else { return Ok(None) };
    let projects = repo.projects()?;
    Ok(Some(
        projects
            .iter()
            .find(|pr| pr.id == p || pr.name.eq_ignore_ascii_case(&p))
            .map(|pr| pr.id.clone())
            .unwrap_or(p),
    ))
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let store = Store::open(&config.data_dir)?;

    let is_tui = matches!(cli.command, None | Some(Commands::Ui));
    let level = if cli.log { Some(LevelFilter::TRACE) } else { None };
    enable_logging(
        if is_tui { TUI_PREFIX } else { CLI_PREFIX },
        &config.data_dir,
        level,
        cli.log && !is_tui,
    )?;

    let mut session = Session::hydrate(store.clone())?;
    let repo = TaskRepository::new(store.clone());

    let command = cli.command.unwrap_or(Commands::Ui);
    if command.needs_session() && !session.is_authenticated() {
        bail!("Not logged in. Run `taskcoach login [email]` first.");
    }

    match command {
        Commands::Login { email } => cmd_login(&mut session, email),
        Commands::Logout => cmd_logout(&mut session),
        Commands::Whoami => cmd_whoami(&session),
        Commands::Add { title, description, project, priority, status, minutes } => {
            let draft = TaskDraft {
                title,
                description,
                status,
                project_id: project_id_for(&repo, project)?,
                priority,
                time_spent_minutes: minutes,
            };
            cmd_add(&repo, draft, false).map(|_| ())
        }
        Commands::List { status, project } => cmd_list(&repo, status, project),
        Commands::Show { id } => cmd_show(&repo, &id),
        Commands::Status { id, status } => cmd_status(&repo, &id, status, false),
        Commands::Edit { id, title, description, project, priority, status, minutes } => {
            let patch = TaskPatch {
                title,
                description,
                status,
                project_id: project_id_for(&repo, project)?,
                priority,
                time_spent_minutes: minutes,
            };
            cmd_edit(&repo, &id, patch, false)
        }
        Commands::Log { id, minutes } => cmd_log(&repo, &id, minutes, false),
        Commands::Remove { id } => cmd_remove(&repo, &id, false),
        Commands::Projects => cmd_projects(&repo),
        Commands::Dashboard => cmd_dashboard(&repo),
        Commands::Coach => cmd_coach(&repo, Advisor::from_config(&config.advisor)?),
        Commands::Reset { force } => cmd_reset(&store, force),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "taskcoach", &mut io::stdout());
            Ok(())
        }
        Commands::Ui => run_tui(repo, session, config.advisor),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:?}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
