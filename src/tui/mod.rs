mod help;
mod state;

use crate::cli::Cli;
use crate::orchestrator::{self, Bridge, ControllerEvent, UiCommand, UiSubscriptions};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Tabs},
    Terminal,
};
use state::{LogKind, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, bridge: Bridge) -> Result<()> {
    let (notify_tx, notify_rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // Subscribe before the controller can start a launch run.
    let subs = orchestrator::subscribe_all(&bridge);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let run_on_launch = args.run_on_launch;
    let ui_handle =
        std::thread::spawn(move || run_threaded(run_on_launch, subs, notify_rx, cmd_tx));

    let launch = args.run_on_launch.then(|| args.collection.clone());
    let res = orchestrator::run_controller(bridge, launch, notify_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    run_on_launch: bool,
    mut subs: UiSubscriptions,
    mut notify_rx: UnboundedReceiver<ControllerEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only.
    let mut state = UiState::default();
    if run_on_launch {
        state.begin_run();
    }
    let log_path = crate::paths::run_log_path().display().to_string();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = notify_rx.try_recv() {
            match ev {
                ControllerEvent::Prefs(prefs) => state.collection_path = prefs.collection_path,
                ControllerEvent::RunFinished => state.finish_run(),
            }
        }
        for ev in subs.drain() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state, &log_path)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }

                if let Some(buf) = state.editing.as_mut() {
                    match k.code {
                        KeyCode::Enter => {
                            let path = buf.trim().to_string();
                            state.editing = None;
                            state.info = "Collection path saved".into();
                            let _ = cmd_tx.send(UiCommand::SetCollection(path));
                        }
                        KeyCode::Esc => {
                            state.editing = None;
                            state.info = "Edit cancelled".into();
                        }
                        KeyCode::Backspace => {
                            buf.pop();
                        }
                        KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                            let _ = cmd_tx.send(UiCommand::Quit);
                            break Ok(());
                        }
                        KeyCode::Char(ch) => buf.push(ch),
                        _ => {}
                    }
                    continue;
                }

                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('r')) => {
                        state.begin_run();
                        let _ = cmd_tx.send(UiCommand::Run(None));
                    }
                    (_, KeyCode::Char('e')) => {
                        state.tab = 0;
                        state.editing = Some(state.collection_path.clone());
                        state.info = "Editing collection path (Enter saves, Esc cancels)".into();
                    }
                    (_, KeyCode::Char('c')) => {
                        state.log.clear();
                        state.info = "Log cleared".into();
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 2;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = 1;
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, log_path: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Dashboard"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("nmrunner"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_dashboard(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f, log_path),
    }
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Collection path / editor
                Constraint::Length(3), // Progress gauge
                Constraint::Min(0),    // Run log
                Constraint::Length(6), // Summary + status
            ]
            .as_ref(),
        )
        .split(area);

    let collection = match state.editing.as_deref() {
        Some(buf) => Paragraph::new(Line::from(vec![
            Span::raw(buf.to_string()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title("Collection (editing)"),
        ),
        None => Paragraph::new(state.collection_display())
            .block(Block::default().borders(Borders::ALL).title("Collection")),
    };
    f.render_widget(collection, main[0]);

    let gauge_color = if state.error_count > 0 {
        Color::Red
    } else {
        Color::Green
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(gauge_color))
        .percent(state.progress.round().clamp(0.0, 100.0) as u16);
    f.render_widget(gauge, main[1]);

    draw_log(main[2], f, state);

    let bottom_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(main[3]);

    let summary_lines = match state.last_summary {
        Some(s) => vec![
            Line::from(vec![
                Span::styled("Requests: ", Style::default().fg(Color::Gray)),
                Span::raw(s.total.to_string()),
            ]),
            Line::from(vec![
                Span::styled("Failures: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    s.failures.to_string(),
                    if s.failures == 0 {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default().fg(Color::Red)
                    },
                ),
            ]),
            Line::from(vec![
                Span::styled("Duration: ", Style::default().fg(Color::Gray)),
                Span::raw(crate::text_summary::format_duration_ms(s.duration_ms)),
            ]),
        ],
        None => vec![Line::from("No completed run yet.")],
    };
    let summary = Paragraph::new(summary_lines)
        .block(Block::default().borders(Borders::ALL).title("Summary"));
    f.render_widget(summary, bottom_row[0]);

    let elapsed = state
        .run_start
        .filter(|_| state.is_running())
        .map(|t| format!("{:.1}s", t.elapsed().as_secs_f64()))
        .unwrap_or_else(|| "-".to_string());
    let status_lines = vec![
        Line::from(vec![
            Span::styled("State: ", Style::default().fg(Color::Gray)),
            Span::raw(state.status_label()),
            Span::raw("   "),
            Span::styled("Elapsed: ", Style::default().fg(Color::Gray)),
            Span::raw(elapsed),
        ]),
        Line::from(vec![
            Span::styled("Info: ", Style::default().fg(Color::Gray)),
            Span::raw(state.info.clone()),
        ]),
        Line::from(""),
        Line::from("Keys: q quit | r run | e edit path | c clear log | tab switch | ? help"),
    ];
    let status =
        Paragraph::new(status_lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, bottom_row[1]);
}

fn draw_log(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    // Borders take two rows; show the newest lines that fit.
    let visible = area.height.saturating_sub(2) as usize;
    let start = state.log.len().saturating_sub(visible);
    let lines: Vec<Line> = state.log[start..].iter().map(|l| l.to_line()).collect();

    let warnings = state
        .log
        .iter()
        .filter(|l| l.kind == LogKind::Warn)
        .count();
    let title = Line::from(vec![
        Span::raw(format!("Log ({} lines, ", state.log.len())),
        Span::styled(
            format!("{warnings} assertion errors"),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(")"),
    ]);

    let log = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(log, area);
}
