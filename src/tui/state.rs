use crate::model::{RunSummary, UiEvent};
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};
use std::time::Instant;

const MAX_LOG_LINES: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub kind: LogKind,
    pub text: String,
}

impl LogLine {
    pub fn to_line(&self) -> Line<'static> {
        let style = match self.kind {
            LogKind::Info => Style::default(),
            LogKind::Warn => Style::default().fg(Color::Yellow),
            LogKind::Error => Style::default().fg(Color::Red),
        };
        Line::from(Span::styled(self.text.clone(), style))
    }
}

pub struct UiState {
    pub tab: usize,
    pub info: String,
    /// Saved collection path (empty means bundled sample).
    pub collection_path: String,
    /// Edit buffer while the user is typing a new collection path.
    pub editing: Option<String>,

    pub progress: f64,
    /// Run tasks handed to the controller that have not finished yet.
    pub outstanding_runs: usize,
    pub run_start: Option<Instant>,
    pub last_summary: Option<RunSummary>,
    pub error_count: usize,
    pub log: Vec<LogLine>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            collection_path: String::new(),
            editing: None,
            progress: 0.0,
            outstanding_runs: 0,
            run_start: None,
            last_summary: None,
            error_count: 0,
            log: Vec::new(),
        }
    }
}

impl UiState {
    pub fn is_running(&self) -> bool {
        self.outstanding_runs > 0
    }

    pub fn push_log(&mut self, kind: LogKind, text: String) {
        self.log.push(LogLine { kind, text });
        if self.log.len() > MAX_LOG_LINES {
            let _ = self.log.drain(0..(self.log.len() - MAX_LOG_LINES));
        }
    }

    /// Reset per-run display state before a new run starts.
    pub fn begin_run(&mut self) {
        if !self.is_running() {
            self.progress = 0.0;
            self.last_summary = None;
            self.error_count = 0;
            self.run_start = Some(Instant::now());
            self.info = "Run requested…".into();
        }
        self.outstanding_runs += 1;
    }

    pub fn finish_run(&mut self) {
        self.outstanding_runs = self.outstanding_runs.saturating_sub(1);
    }

    pub fn apply_event(&mut self, ev: UiEvent) {
        match ev {
            UiEvent::Log(line) => {
                let kind = if line.starts_with("Assertion error") {
                    LogKind::Warn
                } else {
                    LogKind::Info
                };
                self.push_log(kind, line);
            }
            UiEvent::Error(msg) => {
                self.error_count += 1;
                self.info = msg.clone();
                self.push_log(LogKind::Error, msg);
            }
            UiEvent::Progress(pct) => {
                self.progress = pct.clamp(0.0, 100.0);
            }
            UiEvent::Done(summary) => {
                self.last_summary = Some(summary);
                self.info = if summary.failures == 0 {
                    "Run completed".into()
                } else {
                    format!("Run completed with {} failure(s)", summary.failures)
                };
            }
        }
    }

    /// Label shown in the status box.
    pub fn status_label(&self) -> &'static str {
        if self.is_running() {
            "Running"
        } else if self.last_summary.is_some() {
            "Finished"
        } else {
            "Idle"
        }
    }

    pub fn collection_display(&self) -> String {
        if self.collection_path.trim().is_empty() {
            format!("(bundled {})", crate::resolver::SAMPLE_COLLECTION)
        } else {
            self.collection_path.clone()
        }
    }
}
