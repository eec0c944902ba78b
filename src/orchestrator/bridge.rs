//! Presentation bridge.
//!
//! The only surface presentation layers get: start a run, subscribe to the
//! four signals, read and update preferences. Nothing else of the coordinator
//! (file system access, runner, resolver) is reachable through it.

use super::coordinator::RunCoordinator;
use super::events::{Subscription, UiSubscriptions};
use crate::model::{PrefsUpdate, RunRequest, RunSummary, UserPrefs};
use std::sync::Arc;

#[derive(Clone)]
pub struct Bridge {
    coordinator: Arc<RunCoordinator>,
}

impl Bridge {
    pub fn new(coordinator: Arc<RunCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Start a run. Outcome is reported through the signals, not returned.
    pub async fn run_tests(&self, request: RunRequest) {
        self.coordinator.start_run(request).await;
    }

    pub fn on_log(&self) -> Subscription<String> {
        self.coordinator.events.log.subscribe()
    }

    pub fn on_progress(&self) -> Subscription<f64> {
        self.coordinator.events.progress.subscribe()
    }

    pub fn on_done(&self) -> Subscription<RunSummary> {
        self.coordinator.events.done.subscribe()
    }

    pub fn on_error(&self) -> Subscription<String> {
        self.coordinator.events.error.subscribe()
    }

    pub fn get_preferences(&self) -> UserPrefs {
        self.coordinator.prefs.get()
    }

    pub async fn set_preferences(&self, update: PrefsUpdate) -> UserPrefs {
        self.coordinator.prefs.update(update).await
    }
}

/// Subscribe to all four signals as one stream in emission order.
pub fn subscribe_all(bridge: &Bridge) -> UiSubscriptions {
    bridge.coordinator.events.subscribe_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::engine::{CollectionRunner, RunCompletion, RunnerEvent};
    use crate::resolver::{CollectionResolver, ResolverBases};
    use crate::run_log::LogSink;
    use crate::storage::PreferenceStore;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct NoopRunner;

    #[async_trait]
    impl CollectionRunner for NoopRunner {
        async fn execute(
            &self,
            _collection: Arc<Collection>,
            _events: mpsc::UnboundedSender<RunnerEvent>,
        ) -> RunCompletion {
            RunCompletion::default()
        }
    }

    async fn bridge(root: &std::path::Path) -> Bridge {
        let coordinator = RunCoordinator::new(
            PreferenceStore::load(root.join("config.json")).await,
            LogSink::new(root.join("nmrunner.log")),
            CollectionResolver::new(ResolverBases {
                app_root: root.to_path_buf(),
                cwd: root.to_path_buf(),
                resources_dir: root.to_path_buf(),
            }),
            Arc::new(NoopRunner),
        );
        Bridge::new(Arc::new(coordinator))
    }

    #[tokio::test]
    async fn preferences_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let b = bridge(dir.path()).await;

        assert_eq!(b.get_preferences().collection_path, "");
        let set = b
            .set_preferences(PrefsUpdate {
                collection_path: Some("/a/b.json".into()),
            })
            .await;
        assert_eq!(set.collection_path, "/a/b.json");
        assert_eq!(b.get_preferences().collection_path, "/a/b.json");

        let unchanged = b.set_preferences(PrefsUpdate::default()).await;
        assert_eq!(unchanged.collection_path, "/a/b.json");
    }

    #[tokio::test]
    async fn unsubscribed_listener_gets_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("c.json"), "{}").unwrap();
        let b = bridge(dir.path()).await;

        let mut log = b.on_log();
        let mut done = b.on_done();
        b.on_error().unsubscribe();

        b.run_tests(RunRequest::new(Some("c.json".into()))).await;
        assert_eq!(log.try_recv().as_deref(), Some("Starting collection run..."));
        assert_eq!(done.try_recv(), Some(RunSummary::default()));

        log.unsubscribe();
        let mut progress = b.on_progress();
        b.run_tests(RunRequest::new(Some("c.json".into()))).await;
        assert_eq!(progress.try_recv(), Some(0.0));
    }
}
