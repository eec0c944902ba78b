//! Run coordinator.
//!
//! Owns the run state, the preference store and the signal topics. One run at
//! a time: a second request while a run is active is rejected, never queued.

use super::events::EventHub;
use crate::collection::Collection;
use crate::engine::{CollectionRunner, RunCompletion, RunnerEvent};
use crate::error::RunError;
use crate::model::{RunRequest, RunSummary, UiEvent};
use crate::resolver::CollectionResolver;
use crate::run_log::LogSink;
use crate::storage::PreferenceStore;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct RunCoordinator {
    running: AtomicBool,
    pub(crate) prefs: PreferenceStore,
    pub(crate) events: EventHub,
    log: LogSink,
    resolver: CollectionResolver,
    runner: Arc<dyn CollectionRunner>,
}

/// Clears the running flag on every exit path.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-run relay state.
struct Progress {
    total: u64,
    completed: u64,
}

impl Progress {
    fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (100.0 * self.completed as f64 / self.total as f64).min(100.0)
    }
}

impl RunCoordinator {
    pub fn new(
        prefs: PreferenceStore,
        log: LogSink,
        resolver: CollectionResolver,
        runner: Arc<dyn CollectionRunner>,
    ) -> Self {
        Self {
            running: AtomicBool::new(false),
            prefs,
            events: EventHub::default(),
            log,
            resolver,
            runner,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Execute one run end to end. Results are delivered through the signal
    /// topics; this returns once the run has finished or failed.
    pub async fn start_run(&self, request: RunRequest) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.events.emit(UiEvent::Error(RunError::AlreadyRunning.to_string()));
            return;
        }
        let _guard = RunGuard(&self.running);

        self.events.emit(UiEvent::Progress(0.0));
        self.events.emit(UiEvent::Log("Starting collection run...".into()));
        self.log.info("Starting collection run.").await;

        let (path, collection) = match self.load(request.collection_path.as_deref()).await {
            Ok(loaded) => loaded,
            Err(e) => {
                let message = e.to_string();
                self.events.emit(UiEvent::Error(message.clone()));
                self.log.error(&message).await;
                return;
            }
        };

        let total = collection.request_count();
        tracing::info!(
            collection = collection.name().unwrap_or("unnamed"),
            requests = total,
            listeners = self.events.log.subscriber_count(),
            "run starting"
        );
        let mut progress = Progress {
            total,
            completed: 0,
        };

        let using = format!("Using collection: {}", path.display());
        self.events.emit(UiEvent::Log(using.clone()));
        self.log.info(&using).await;

        let (tx, mut rx) = mpsc::unbounded_channel::<RunnerEvent>();
        let relay = async {
            while let Some(ev) = rx.recv().await {
                self.relay(ev, &mut progress).await;
            }
        };
        // The runner drops its sender when it finishes, which ends the relay,
        // so every runner event is relayed before the completion is handled.
        let (completion, ()) = tokio::join!(self.runner.execute(collection, tx), relay);

        self.finish(completion, total).await;
    }

    async fn load(&self, input: Option<&str>) -> Result<(PathBuf, Arc<Collection>), RunError> {
        let path = self.resolver.resolve(input).await?;
        let collection = Collection::load(&path).await?;
        Ok((path, Arc::new(collection)))
    }

    async fn relay(&self, ev: RunnerEvent, progress: &mut Progress) {
        match ev {
            RunnerEvent::RequestFailed { item, error } => {
                tracing::debug!(
                    item = item.as_deref().unwrap_or("Request"),
                    %error,
                    "request failed"
                );
                self.events.emit(UiEvent::Error(error.clone()));
                self.log.error(&error).await;
            }
            RunnerEvent::RequestCompleted {
                item,
                status,
                elapsed_ms,
            } => {
                progress.completed += 1;
                let label = item.as_deref().unwrap_or("Request");
                tracing::debug!(item = label, ?status, elapsed_ms, "request completed");
                let line = format!("Request: {label}");
                self.events.emit(UiEvent::Log(line.clone()));
                self.log.info(&line).await;
                if progress.total > 0 {
                    self.events.emit(UiEvent::Progress(progress.percent()));
                }
            }
            RunnerEvent::AssertionEvaluated {
                item,
                assertion,
                error: Some(error),
            } => {
                tracing::debug!(
                    item = item.as_deref().unwrap_or("Request"),
                    %assertion,
                    %error,
                    "assertion failed"
                );
                let line = format!("Assertion error: {assertion}");
                self.events.emit(UiEvent::Log(line.clone()));
                self.log.warn(&line).await;
            }
            RunnerEvent::AssertionEvaluated { error: None, .. } => {}
        }
    }

    async fn finish(&self, completion: RunCompletion, local_total: u64) {
        if let Some(err) = completion.error.as_ref() {
            self.events.emit(UiEvent::Error(err.clone()));
            self.log.error(err).await;
        }

        let summary = summarize(&completion, local_total);
        self.events.emit(UiEvent::Done(summary));
        self.events.emit(UiEvent::Progress(100.0));
        self.log
            .info(&format!(
                "Run completed. Requests={} Failures={} DurationMs={}",
                summary.total, summary.failures, summary.duration_ms
            ))
            .await;
    }
}

/// Build the run summary, filling gaps in the runner's report.
pub(crate) fn summarize(completion: &RunCompletion, local_total: u64) -> RunSummary {
    let report = completion.report.clone().unwrap_or_default();
    let started = report.started_ms.unwrap_or(0);
    let completed = report.completed_ms.unwrap_or(started);
    RunSummary {
        total: report.requests_total.unwrap_or(local_total),
        failures: report.failures.unwrap_or(0),
        duration_ms: completed.saturating_sub(started).max(0) as u64,
    }
}
