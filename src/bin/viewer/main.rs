mod app;

use std::io;
use std::time::{Duration, Instant};

use app::{format_clock, format_ms, pct_value, truncate, AppState, ConnectionStatus};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};

const POLL_INTERVAL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut games_state = TableState::default();

    let result = run_loop(&mut terminal, &mut app, &client, &mut games_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    games_state: &mut TableState,
) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| render(f, app, games_state))?;

        let timeout = POLL_INTERVAL
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = Instant::now();
                        }
                        KeyCode::Char('f') | KeyCode::Char('F') => {
                            app.request_cycle(client).await;
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.games.len().saturating_sub(1);
                            let next = games_state.selected().map_or(0, |i| (i + 1).min(max));
                            games_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = games_state.selected().map_or(0, |i| i.saturating_sub(1));
                            games_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= POLL_INTERVAL {
            app.refresh(client).await;
            last_tick = Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, games_state: &mut TableState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
        .split(chunks[1]);
    render_games_table(f, app, games_state, body[0]);
    render_cycle_panel(f, app, body[1]);

    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => (format!("● {}", app.health.status), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let header_line = Line::from(vec![
        Span::styled(
            " Public Betting Trends  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(format!("{} games", app.games.len()), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format!("updated {}", format_clock(app.last_updated)),
            Style::default().fg(Color::White),
        ),
    ]);
    let paragraph = Paragraph::new(header_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(paragraph, area);
}

fn render_games_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["Sport", "Time", "Away", "Home", "ML B", "ML $", "Sp B", "Sp $", "Tot B", "Tot $"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .games
        .iter()
        .map(|(sport, g)| {
            let mut cells = vec![
                Cell::from(sport.to_uppercase()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&g.game_time, 16)),
                Cell::from(g.away_team.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(g.home_team.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
            ];
            cells.extend(
                g.slots()
                    .into_iter()
                    .map(|slot| Cell::from(slot.to_string()).style(Style::default().fg(pct_color(slot)))),
            );
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![
        Constraint::Length(5),
        Constraint::Min(10),
        Constraint::Length(5),
        Constraint::Length(5),
    ];
    widths.extend([Constraint::Length(6); 6]);

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    " GAMES ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        )
        .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    f.render_stateful_widget(table, area, state);
}

fn render_cycle_panel(f: &mut Frame, app: &AppState, area: Rect) {
    let s = &app.stats;
    let label = Style::default().fg(Color::DarkGray);
    let line = |name: &'static str, value: String, color: Color| {
        Line::from(vec![
            Span::styled(format!("{name:<12}"), label),
            Span::styled(value, Style::default().fg(color)),
        ])
    };
    let failures = s.fetch_failures + s.parse_failures;

    let lines = vec![
        line(
            "state",
            if s.cycle_in_flight { "running" } else { "idle" }.to_string(),
            if s.cycle_in_flight { Color::Yellow } else { Color::Green },
        ),
        line("last cycle", format_clock(s.last_cycle_at), Color::White),
        line(
            "strategy",
            s.last_strategy.clone().unwrap_or_else(|| "—".to_string()),
            Color::Cyan,
        ),
        line("published", format!("{}/{}", s.cycles_published, s.cycles_started), Color::White),
        line(
            "failures",
            failures.to_string(),
            if failures > 0 { Color::Red } else { Color::White },
        ),
        line("no games", s.extraction_failures.to_string(), Color::Yellow),
        line("dropped", s.triggers_dropped.to_string(), Color::White),
        line("p50 / p99", format!("{} / {}", format_ms(s.p50_ms), format_ms(s.p99_ms)), Color::White),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " SCRAPER ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let mut spans = vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("re-poll  "),
        Span::styled("[f] ", Style::default().fg(Color::Yellow)),
        Span::raw("scrape now  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("scroll  "),
        Span::styled("auto-poll: 5s", Style::default().fg(Color::DarkGray)),
    ];
    if let Some(notice) = &app.notice {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(truncate(notice, 40), Style::default().fg(Color::Cyan)));
    }
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lopsided public action stands out.
fn pct_color(slot: &str) -> Color {
    match pct_value(slot) {
        Some(v) if v >= 70 => Color::Green,
        Some(v) if v <= 30 => Color::Red,
        Some(_) => Color::White,
        None => Color::DarkGray,
    }
}
