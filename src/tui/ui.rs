use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap},
    Frame,
};

use crate::models::{Priority, TaskStatus};
use crate::stats::{format_minutes, recent_tasks, time_by_project};
use super::app::{App, CoachState, InputField, InputMode, Screen};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Screen
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    render_tabs(f, app, chunks[0]);

    match app.screen {
        Screen::Login => render_login(f, app, chunks[1]),
        Screen::Dashboard => render_dashboard(f, app, chunks[1]),
        Screen::Board => render_board(f, app, chunks[1]),
        Screen::Coach => render_coach(f, app, chunks[1]),
        Screen::Settings => render_settings(f, app, chunks[1]),
    }

    render_help(f, app, chunks[2]);

    if app.screen != Screen::Login && app.input_mode != InputMode::Normal {
        render_input(f, app);
    }
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Screen::TABS
        .iter()
        .enumerate()
        .map(|(i, s)| Line::from(format!("{} {}", i + 1, s.title())))
        .collect();
    let selected = Screen::TABS.iter().position(|s| *s == app.screen);
    let user = app
        .session
        .user()
        .map(|u| format!("Taskcoach - {}", u.display_name))
        .unwrap_or_else(|| "Taskcoach".to_string());

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(user))
        .select(selected.unwrap_or(0))
        .style(Style::default().fg(Color::Gray))
        .highlight_style(if selected.is_some() {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        });
    f.render_widget(tabs, area);
}

fn priority_style(p: Priority) -> Style {
    match p {
        Priority::High => Style::default().fg(Color::Red),
        Priority::Medium => Style::default().fg(Color::Yellow),
        Priority::Low => Style::default().fg(Color::Blue),
    }
}

fn render_login(f: &mut Frame, app: &App, area: Rect) {
    let area = centered_rect(60, 9, area);
    f.render_widget(Clear, area);
    let text = vec![
        Line::from(Span::styled("Welcome back", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("Log in to use Taskcoach. Leave empty for the demo account."),
        Line::from(""),
        Line::from(vec![
            Span::raw("Email: "),
            Span::styled(app.input_buffer.as_str(), Style::default().fg(Color::Yellow)),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
    ];
    let login = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Login"));
    f.render_widget(login, area);
}

fn stat_card<'a>(title: &'a str, value: String, color: Color) -> Paragraph<'a> {
    Paragraph::new(Line::from(Span::styled(
        value,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title(title))
}

fn render_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(rows[0]);

    let s = &app.stats;
    f.render_widget(stat_card("Total Work Hours", s.total_hours.to_string(), Color::Blue), cards[0]);
    f.render_widget(stat_card("Completed Tasks", s.completed_tasks.to_string(), Color::Green), cards[1]);
    f.render_widget(stat_card("Projects", s.project_count.to_string(), Color::Magenta), cards[2]);
    let open = format!("{} ({} to do / {} in progress)", s.active_tasks, s.todo_tasks, s.in_progress_tasks);
    f.render_widget(stat_card("Open Tasks", open, Color::Yellow), cards[3]);

    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let project_rows: Vec<Row> = time_by_project(&app.tasks, &app.projects)
        .into_iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.name.unwrap_or(p.project_id)),
                Cell::from(p.tasks.to_string()),
                Cell::from(format_minutes(p.minutes)),
            ])
        })
        .collect();
    let projects = Table::new(
        project_rows,
        [Constraint::Min(12), Constraint::Length(6), Constraint::Length(10)],
    )
    .header(Row::new(vec!["Project", "Tasks", "Time"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .bottom_margin(1))
    .block(Block::default().borders(Borders::ALL).title("Time per Project"));
    f.render_widget(projects, lower[0]);

    let recent = recent_tasks(&app.tasks);
    if recent.is_empty() {
        let empty = Paragraph::new("No tasks yet. Press 2 and then 'a' to add one.")
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL).title("Recent Tasks"));
        f.render_widget(empty, lower[1]);
    } else {
        let recent_rows: Vec<Row> = recent
            .iter()
            .map(|t| {
                Row::new(vec![
                    Cell::from(t.title.clone()),
                    Cell::from(t.status.label()),
                    Cell::from(format_minutes(u64::from(t.time_spent_minutes))),
                ])
            })
            .collect();
        let table = Table::new(
            recent_rows,
            [Constraint::Min(16), Constraint::Length(12), Constraint::Length(10)],
        )
        .block(Block::default().borders(Borders::ALL).title("Recent Tasks"));
        f.render_widget(table, lower[1]);
    }
}

fn render_board(f: &mut Frame, app: &mut App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);

    for (i, status) in TaskStatus::ALL.iter().enumerate() {
        let focused = i == app.column;
        let rows: Vec<Row> = app
            .column_tasks(*status)
            .into_iter()
            .map(|t| {
                let project = app.project_name(&t.project_id).unwrap_or("-").to_string();
                Row::new(vec![
                    Cell::from(t.title.clone()),
                    Cell::from(project),
                    Cell::from(Span::styled(t.priority.as_str(), priority_style(t.priority))),
                    Cell::from(format_minutes(u64::from(t.time_spent_minutes))),
                ])
            })
            .collect();
        let count = rows.len();

        let border = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let table = Table::new(
            rows,
            [Constraint::Min(12), Constraint::Length(10), Constraint::Length(7), Constraint::Length(8)],
        )
        .header(Row::new(vec!["Title", "Project", "Prio", "Time"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!("{} ({})", status.label(), count)),
        )
        .row_highlight_style(if focused {
            Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray)
        } else {
            Style::default()
        })
        .highlight_symbol(if focused { ">> " } else { "   " });

        f.render_stateful_widget(table, columns[i], &mut app.column_states[i]);
    }
}

fn render_coach(f: &mut Frame, app: &App, area: Rect) {
    let (title, body, style) = match &app.coach {
        CoachState::Idle => (
            "AI Coach",
            "Get a summary of your workload, the biggest time sinks and concrete advice.\n\n\
             Press Enter to analyze your tasks."
                .to_string(),
            Style::default().fg(Color::Gray),
        ),
        CoachState::Loading(_) => (
            "AI Coach - analyzing",
            "Analyzing your workload...\n\nPress x to cancel.".to_string(),
            Style::default().fg(Color::Yellow),
        ),
        CoachState::Showing(text) => ("AI Coach - analysis", text.clone(), Style::default()),
    };
    let paragraph = Paragraph::new(body)
        .style(style)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);
}

fn render_settings(f: &mut Frame, app: &App, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let profile = match app.session.user() {
        Some(u) => vec![
            Line::from(vec![Span::styled("Name:  ", Style::default().fg(Color::Gray)), Span::raw(u.display_name.clone())]),
            Line::from(vec![Span::styled("Email: ", Style::default().fg(Color::Gray)), Span::raw(u.email.clone())]),
            Line::from(vec![
                Span::styled("Plan:  ", Style::default().fg(Color::Gray)),
                Span::raw(if u.is_pro { "Pro" } else { "Free" }),
            ]),
            Line::from(""),
            Line::from(Span::styled("Press o to log out.", Style::default().fg(Color::Gray))),
        ],
        None => vec![Line::from("Not logged in.")],
    };
    f.render_widget(
        Paragraph::new(profile).block(Block::default().borders(Borders::ALL).title("Profile")),
        halves[0],
    );

    let data = vec![
        Line::from(vec![
            Span::styled("Data directory: ", Style::default().fg(Color::Gray)),
            Span::raw(app.repo.store().root().display().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Tasks: ", Style::default().fg(Color::Gray)),
            Span::raw(app.tasks.len().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Projects: ", Style::default().fg(Color::Gray)),
            Span::raw(app.projects.len().to_string()),
        ]),
    ];
    f.render_widget(
        Paragraph::new(data)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Storage")),
        halves[1],
    );
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.input_mode {
        InputMode::Normal => match app.screen {
            Screen::Board => "q: Quit | Tab/1-4: Screens | h/l: Column | a: Add | Space: Advance | n: Title | e: Desc | t: Log Time | p: Prio | m: Project | d: Del",
            Screen::Coach => "q: Quit | Tab/1-4: Screens | Enter: Analyze | x: Cancel | r: Clear",
            Screen::Settings => "q: Quit | Tab/1-4: Screens | o: Log Out",
            Screen::Dashboard => "q: Quit | Tab/1-4: Screens | r: Refresh",
            Screen::Login => "",
        },
        InputMode::Editing if app.screen == Screen::Login => "Enter: Log In | Esc: Quit",
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Left/Right: Choose | Esc: Cancel",
    };

    let help = match &app.message {
        Some(msg) => Paragraph::new(msg.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(help_text).style(Style::default().fg(Color::Gray)),
    };
    f.render_widget(help.block(Block::default().borders(Borders::ALL)), area);
}

fn render_input(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 3, f.area()); // Fixed height of 3 (border + 1 line)
    f.render_widget(Clear, area); // Clear the area first

    let (title, content) = match app.input_mode {
        InputMode::Adding => match app.add_state.step {
            0 => ("Add Task: Enter Title".to_string(), app.input_buffer.clone()),
            1 => (
                "Add Task: Project (Left/Right)".to_string(),
                app.projects
                    .get(app.add_state.project_index)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| "-".into()),
            ),
            2 => ("Add Task: Priority (Left/Right)".to_string(), app.add_state.priority.to_string()),
            3 => ("Add Task: Minutes Spent (Optional)".to_string(), app.input_buffer.clone()),
            4 => ("Add Task: Description (Optional)".to_string(), app.input_buffer.clone()),
            _ => ("Add Task".to_string(), String::new()),
        },
        InputMode::Editing => {
            let title = match app.input_field {
                InputField::Title => "Edit Title",
                InputField::Description => "Edit Description",
                InputField::LogMinutes => "Log Minutes Worked",
                _ => "Edit",
            };
            (title.to_string(), app.input_buffer.clone())
        }
        InputMode::Normal => return,
    };

    let input = Paragraph::new(content)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
