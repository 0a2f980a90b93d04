use crate::api::TaskApi;
use crate::dashboard::{Dashboard, DraftField, Mode, Phase};
use crate::task::Filter;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;

/// Why the dashboard loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    SignedOut,
}

pub async fn run_app<B: Backend, A: TaskApi>(
    terminal: &mut Terminal<B>,
    board: &mut Dashboard<A>,
) -> io::Result<Exit> {
    terminal.draw(|f| render(f, board))?;
    board.load().await;
    loop {
        if board.phase == Phase::SignedOut {
            return Ok(Exit::SignedOut);
        }

        terminal.draw(|f| render(f, board))?;

        // crossterm reads block, keep them off the async workers
        let event = tokio::task::spawn_blocking(event::read)
            .await
            .map_err(io::Error::other)??;
        if let Event::Key(key) = event {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(exit) = handle_key(board, key).await {
                return Ok(exit);
            }
        }
    }
}

/// Apply one key press. Errors from the API were already logged by the dashboard.
pub async fn handle_key<A: TaskApi>(board: &mut Dashboard<A>, key: KeyEvent) -> Option<Exit> {
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    if control && key.code == KeyCode::Char('c') {
        return Some(Exit::Quit);
    }
    match board.mode.clone() {
        Mode::Adding | Mode::Editing(_) => match key.code {
            KeyCode::Esc => board.cancel(),
            KeyCode::Tab | KeyCode::BackTab => board.switch_field(),
            KeyCode::Enter => {
                let _ = board.submit().await;
            }
            KeyCode::Backspace => board.pop_char(),
            KeyCode::Char(c) if !control => board.push_char(c),
            _ => {}
        },
        Mode::ConfirmDelete(_) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let _ = board.confirm_delete().await;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => board.cancel(),
            _ => {}
        },
        Mode::Idle => match key.code {
            KeyCode::Char('q') => return Some(Exit::Quit),
            KeyCode::Char('a') => board.open_add(),
            KeyCode::Char('e') => {
                if let Some(task) = board.selected_task().cloned() {
                    board.open_edit(task);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = board.selected_task().map(|t| t.id) {
                    board.request_delete(id);
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(id) = board.selected_task().map(|t| t.id) {
                    let _ = board.toggle(id).await;
                }
            }
            KeyCode::Tab | KeyCode::Char('f') => {
                let next = board.filter.next();
                board.set_filter(next).await;
            }
            KeyCode::Char('1') => board.set_filter(Filter::All).await,
            KeyCode::Char('2') => board.set_filter(Filter::Pending).await,
            KeyCode::Char('3') => board.set_filter(Filter::Completed).await,
            KeyCode::Char('r') => board.load().await,
            KeyCode::Char('L') => {
                board.logout();
                return Some(Exit::SignedOut);
            }
            KeyCode::Up | KeyCode::Char('k') => board.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => board.select_next(),
            _ => {}
        },
    }
    None
}

pub fn render<A: TaskApi>(f: &mut Frame, board: &Dashboard<A>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    // The snapshot only holds the active filter's tasks, so only that tab gets a count.
    let titles: Vec<Line> = Filter::ALL
        .iter()
        .map(|filter| {
            if *filter == board.filter && board.phase == Phase::Ready {
                Line::from(format!("{} ({})", filter.label(), board.tasks.len()))
            } else {
                Line::from(filter.label())
            }
        })
        .collect();
    let selected_tab = Filter::ALL
        .iter()
        .position(|f| *f == board.filter)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .block(Block::default().title("My Tasks").borders(Borders::ALL))
        .select(selected_tab)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    render_list(f, board, chunks[1]);

    let help = match board.mode {
        Mode::Idle => "a add  e edit  d delete  space toggle  tab filter  r reload  L logout  q quit",
        Mode::Adding | Mode::Editing(_) => "tab switch field  enter save  esc cancel",
        Mode::ConfirmDelete(_) => "y delete  n cancel",
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );

    match &board.mode {
        Mode::Adding => render_form(f, board, "Add New Task"),
        Mode::Editing(_) => render_form(f, board, "Edit Task"),
        Mode::ConfirmDelete(id) => {
            let area = centered(f.area(), 50, 5);
            f.render_widget(Clear, area);
            let text = Paragraph::new(format!("Are you sure you want to delete task #{}? (y/n)", id))
                .wrap(Wrap { trim: true })
                .block(Block::default().title("Delete").borders(Borders::ALL));
            f.render_widget(text, area);
        }
        Mode::Idle => {}
    }
}

fn render_list<A: TaskApi>(f: &mut Frame, board: &Dashboard<A>, area: Rect) {
    let block = Block::default()
        .title(board.filter.label())
        .borders(Borders::ALL);

    if board.phase == Phase::Loading {
        f.render_widget(Paragraph::new("Loading...").block(block), area);
        return;
    }
    if board.tasks.is_empty() {
        f.render_widget(
            Paragraph::new("No tasks found. Press 'a' to create your first task!").block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = board
        .tasks
        .iter()
        .map(|t| {
            let (mark, title_style) = if t.completed {
                (
                    "[x] ",
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT),
                )
            } else {
                ("[ ] ", Style::default().fg(Color::White))
            };
            let mut lines = vec![Line::from(vec![
                Span::raw(mark),
                Span::styled(t.title.as_str(), title_style),
                Span::styled(format!("  #{}", t.id), Style::default().fg(Color::DarkGray)),
            ])];
            if let Some(description) = t.description.as_deref().filter(|d| !d.is_empty()) {
                lines.push(Line::from(Span::styled(
                    format!("    {}", description),
                    Style::default().fg(Color::Gray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(board.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_form<A: TaskApi>(f: &mut Frame, board: &Dashboard<A>, title: &str) {
    let area = centered(f.area(), 60, 10);
    f.render_widget(Clear, area);
    let outer = Block::default().title(title).borders(Borders::ALL);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(3), Constraint::Min(3)])
        .split(inner);

    let focused = |field: DraftField| {
        if board.focus == field {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    };
    f.render_widget(
        Paragraph::new(board.draft.title.as_str()).block(
            Block::default()
                .title("Title *")
                .borders(Borders::ALL)
                .border_style(focused(DraftField::Title)),
        ),
        rows[0],
    );
    f.render_widget(
        Paragraph::new(board.draft.description.as_str())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Description")
                    .borders(Borders::ALL)
                    .border_style(focused(DraftField::Description)),
            ),
        rows[1],
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
