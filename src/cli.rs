use crate::engine::{HttpRunner, HttpRunnerConfig};
use crate::model::{PrefsUpdate, RunRequest, RunSummary, UiEvent};
use crate::orchestrator::{self, Bridge, RunCoordinator};
use crate::resolver::{CollectionResolver, ResolverBases};
use crate::run_log::LogSink;
use crate::storage::PreferenceStore;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "nmrunner",
    version,
    about = "Run Postman collections with live progress"
)]
pub struct Cli {
    /// Collection file to run (defaults to the saved preference, then the bundled sample)
    #[arg(long)]
    pub collection: Option<String>,

    /// Save --collection as the default collection path
    #[arg(long, requires = "collection")]
    pub remember: bool,

    /// Stream progress as plain text and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Print the run summary as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print saved preferences as JSON and exit
    #[arg(long)]
    pub show_prefs: bool,

    /// Save a default collection path and exit
    #[arg(long, value_name = "PATH")]
    pub set_collection: Option<String>,

    /// Directory relative collection paths and bundled samples are looked up in
    /// (defaults to the directory of the executable)
    #[arg(long, value_name = "DIR")]
    pub app_root: Option<PathBuf>,

    /// Timeout for each HTTP request
    #[arg(long, default_value = "30s")]
    pub request_timeout: humantime::Duration,

    /// Start a run as soon as the TUI opens
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub run_on_launch: bool,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !(self.text || self.json || self.show_prefs || self.set_collection.is_some())
    }
}

/// Build the runner configuration from CLI arguments.
pub fn build_runner_config(args: &Cli) -> HttpRunnerConfig {
    HttpRunnerConfig {
        request_timeout: args.request_timeout.into(),
        ..HttpRunnerConfig::default()
    }
}

/// Wire the coordinator with its per-user files and the HTTP runner.
pub async fn build_bridge(args: &Cli) -> Result<Bridge> {
    let runner = HttpRunner::new(&build_runner_config(args))?;
    let prefs = PreferenceStore::load(crate::paths::prefs_path()).await;
    let log = LogSink::new(crate::paths::run_log_path());
    tracing::debug!(
        prefs = %prefs.path().display(),
        run_log = %log.path().display(),
        "per-user files"
    );
    let coordinator = RunCoordinator::new(
        prefs,
        log,
        CollectionResolver::new(ResolverBases::detect(args.app_root.clone())),
        Arc::new(runner),
    );
    Ok(Bridge::new(Arc::new(coordinator)))
}

/// Outcome of a non-interactive run, used for the exit code.
pub struct RunOutcome {
    pub summary: Option<RunSummary>,
    pub errors: Vec<String>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.summary, Some(s) if s.failures == 0) && self.errors.is_empty()
    }
}

pub async fn run(args: Cli) -> Result<bool> {
    let bridge = build_bridge(&args).await?;

    if let Some(path) = args.set_collection.as_deref() {
        let prefs = bridge
            .set_preferences(PrefsUpdate {
                collection_path: Some(path.trim().to_string()),
            })
            .await;
        println!("{}", serde_json::to_string_pretty(&prefs)?);
        return Ok(true);
    }

    if args.show_prefs {
        let prefs = bridge.get_preferences();
        println!("{}", serde_json::to_string_pretty(&prefs)?);
        return Ok(true);
    }

    if args.remember {
        bridge.set_preferences(remembered_collection(&args)).await;
    }

    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            crate::tui::run(args, bridge).await?;
            return Ok(true);
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            let outcome = run_text(&args, &bridge).await?;
            return Ok(outcome.succeeded());
        }
    }

    let outcome = if args.json {
        run_json(&args, &bridge).await?
    } else {
        run_text(&args, &bridge).await?
    };
    Ok(outcome.succeeded())
}

/// Preference update for `--remember`, trimmed like every other path entry.
fn remembered_collection(args: &Cli) -> PrefsUpdate {
    PrefsUpdate {
        collection_path: args.collection.as_deref().map(|p| p.trim().to_string()),
    }
}

fn request_for(args: &Cli, bridge: &Bridge) -> RunRequest {
    RunRequest::new(orchestrator::effective_path(
        args.collection.clone(),
        &bridge.get_preferences(),
    ))
}

/// Run once and collect every signal until the run is over.
async fn run_collect(
    args: &Cli,
    bridge: &Bridge,
    mut on_event: impl FnMut(&UiEvent),
) -> Result<RunOutcome> {
    let mut subs = orchestrator::subscribe_all(bridge);
    let request = request_for(args, bridge);
    let run_bridge = bridge.clone();
    let mut handle = tokio::spawn(async move { run_bridge.run_tests(request).await });

    let mut outcome = RunOutcome {
        summary: None,
        errors: Vec::new(),
    };
    let mut record = |ev: UiEvent, outcome: &mut RunOutcome| {
        match &ev {
            UiEvent::Done(s) => outcome.summary = Some(*s),
            UiEvent::Error(e) => outcome.errors.push(e.clone()),
            _ => {}
        }
        on_event(&ev);
    };

    loop {
        tokio::select! {
            res = &mut handle => {
                res.context("run task failed")?;
                break;
            }
            Some(ev) = subs.next() => record(ev, &mut outcome),
        }
    }
    // Signals published right before the run returned.
    for ev in subs.drain() {
        record(ev, &mut outcome);
    }
    subs.unsubscribe();

    Ok(outcome)
}

async fn run_text(args: &Cli, bridge: &Bridge) -> Result<RunOutcome> {
    let (out_tx, out_handle) = spawn_output_writer();

    let outcome = run_collect(args, bridge, |ev| match ev {
        UiEvent::Log(line) => {
            let _ = out_tx.send(OutputLine::Stdout(line.clone()));
        }
        UiEvent::Error(msg) => {
            let _ = out_tx.send(OutputLine::Stderr(format!("error: {msg}")));
        }
        UiEvent::Progress(_) | UiEvent::Done(_) => {}
    })
    .await?;

    if let Some(summary) = outcome.summary.as_ref() {
        for line in crate::text_summary::build_text_summary(summary).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(outcome)
}

async fn run_json(args: &Cli, bridge: &Bridge) -> Result<RunOutcome> {
    let (out_tx, out_handle) = spawn_output_writer();

    let outcome = run_collect(args, bridge, |ev| {
        if let UiEvent::Error(msg) = ev {
            let _ = out_tx.send(OutputLine::Stderr(format!("error: {msg}")));
        }
    })
    .await?;

    if let Some(summary) = outcome.summary.as_ref() {
        let out = serde_json::to_string_pretty(summary)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_interactive() {
        let args = Cli::parse_from(["nmrunner"]);
        assert!(args.is_interactive());
        assert!(!args.run_on_launch);
        assert_eq!(
            build_runner_config(&args).request_timeout,
            std::time::Duration::from_secs(30)
        );
    }

    #[test]
    fn output_modes_are_not_interactive() {
        assert!(!Cli::parse_from(["nmrunner", "--text"]).is_interactive());
        assert!(!Cli::parse_from(["nmrunner", "--json"]).is_interactive());
        assert!(!Cli::parse_from(["nmrunner", "--show-prefs"]).is_interactive());
        assert!(!Cli::parse_from(["nmrunner", "--set-collection", "/a.json"]).is_interactive());
    }

    #[test]
    fn remember_requires_a_collection() {
        assert!(Cli::try_parse_from(["nmrunner", "--remember"]).is_err());
        assert!(Cli::try_parse_from(["nmrunner", "--remember", "--collection", "a.json"]).is_ok());
    }

    #[test]
    fn remembered_collection_is_trimmed() {
        let args = Cli::parse_from(["nmrunner", "--remember", "--collection", "  /a/b.json "]);
        assert_eq!(
            remembered_collection(&args).collection_path.as_deref(),
            Some("/a/b.json")
        );
    }

    #[test]
    fn text_and_json_conflict() {
        assert!(Cli::try_parse_from(["nmrunner", "--text", "--json"]).is_err());
    }

    #[test]
    fn request_timeout_accepts_humantime() {
        let args = Cli::parse_from(["nmrunner", "--request-timeout", "1500ms"]);
        assert_eq!(
            build_runner_config(&args).request_timeout,
            std::time::Duration::from_millis(1500)
        );
    }

    #[test]
    fn outcome_requires_summary_without_failures_or_errors() {
        let ok = RunOutcome {
            summary: Some(RunSummary::default()),
            errors: vec![],
        };
        assert!(ok.succeeded());

        let failed = RunOutcome {
            summary: Some(RunSummary {
                failures: 1,
                ..RunSummary::default()
            }),
            errors: vec![],
        };
        assert!(!failed.succeeded());

        let fatal = RunOutcome {
            summary: None,
            errors: vec!["Collection file not found. Provide a valid path.".into()],
        };
        assert!(!fatal.succeeded());
    }
}
