pub mod app;
pub mod ui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::error;

use crate::config::AdvisorConfig;
use crate::repository::TaskRepository;
use crate::session::Session;
use app::{App, InputField, InputMode, Screen};
use ui::ui;

/// How often the loop wakes up to check for a finished analysis.
const TICK: Duration = Duration::from_millis(200);

pub fn run_tui(repo: TaskRepository, session: Session, advisor: AdvisorConfig) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(repo, session, &advisor);

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("TUI loop failed: {err:?}");
    }
    res.map_err(Into::into)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    while !app.should_quit {
        app.tick();
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => handle_normal_key(app, key.code),
            InputMode::Editing | InputMode::Adding => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => {
                    if app.screen == Screen::Login {
                        app.should_quit = true;
                    } else {
                        app.cancel_input();
                    }
                }
                KeyCode::Left => app.adjust_choice(false),
                KeyCode::Right => app.adjust_choice(true),
                KeyCode::Char(c) => app.input_buffer.push(c),
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
        }
    }
    Ok(())
}

fn handle_normal_key(app: &mut App, code: KeyCode) {
    app.message = None;
    match code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Tab => {
            app.next_screen();
            app.reload();
            return;
        }
        KeyCode::Char('1') => return app.go_to(Screen::Dashboard),
        KeyCode::Char('2') => return app.go_to(Screen::Board),
        KeyCode::Char('3') => return app.go_to(Screen::Coach),
        KeyCode::Char('4') => return app.go_to(Screen::Settings),
        _ => {}
    }

    match app.screen {
        Screen::Board => match code {
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            KeyCode::Right | KeyCode::Char('l') => app.next_column(),
            KeyCode::Left | KeyCode::Char('h') => app.previous_column(),
            KeyCode::Char(' ') => app.advance_selected(),
            KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
            KeyCode::Char('a') => app.start_add(),
            KeyCode::Char('n') => app.start_edit(InputField::Title),
            KeyCode::Char('e') => app.start_edit(InputField::Description),
            KeyCode::Char('t') => app.start_edit(InputField::LogMinutes), // 't' for Time
            KeyCode::Char('p') => app.cycle_priority(),
            KeyCode::Char('m') => app.cycle_project(),
            KeyCode::Char('r') => app.reload(),
            _ => {}
        },
        Screen::Coach => match code {
            KeyCode::Enter => app.start_analysis(),
            KeyCode::Char('x') => app.cancel_analysis(),
            KeyCode::Char('r') => app.reset_analysis(),
            _ => {}
        },
        Screen::Settings => {
            if code == KeyCode::Char('o') {
                app.logout();
            }
        }
        Screen::Dashboard => {
            if code == KeyCode::Char('r') {
                app.reload();
            }
        }
        Screen::Login => {}
    }
}
