//! UI command loop.
//!
//! Turns commands from interactive presentation layers into bridge calls and
//! reports preference changes back. Run outcomes travel over the bridge's
//! signals, not through this loop.

use super::bridge::Bridge;
use crate::model::{PrefsUpdate, RunRequest, UserPrefs};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Run the given collection, or the saved preference when `None`.
    Run(Option<String>),
    SetCollection(String),
    Quit,
}

/// Notifications from the controller back to the UI.
#[derive(Debug, Clone)]
pub(crate) enum ControllerEvent {
    Prefs(UserPrefs),
    /// A run task returned, whether it completed, failed or was rejected.
    RunFinished,
}

/// Path a run should use: the explicit one, else the saved preference.
/// An empty result lets the resolver fall back to the bundled sample.
pub(crate) fn effective_path(explicit: Option<String>, prefs: &UserPrefs) -> Option<String> {
    explicit
        .filter(|p| !p.trim().is_empty())
        .or_else(|| Some(prefs.collection_path.clone()).filter(|p| !p.trim().is_empty()))
}

pub(crate) async fn run_controller(
    bridge: Bridge,
    run_on_launch: Option<Option<String>>,
    notify_tx: UnboundedSender<ControllerEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let _ = notify_tx.send(ControllerEvent::Prefs(bridge.get_preferences()));

    let mut runs: Vec<JoinHandle<()>> = Vec::new();
    let spawn_run = |path: Option<String>| {
        let bridge = bridge.clone();
        let notify_tx = notify_tx.clone();
        let path = effective_path(path, &bridge.get_preferences());
        tokio::spawn(async move {
            bridge.run_tests(RunRequest::new(path)).await;
            let _ = notify_tx.send(ControllerEvent::RunFinished);
        })
    };

    if let Some(path) = run_on_launch {
        runs.push(spawn_run(path));
    }

    while let Some(cmd) = cmd_rx.recv().await {
        // Finished runs need no further tracking.
        runs.retain(|h| !h.is_finished());
        match cmd {
            // A run already in flight is rejected by the coordinator with an
            // error signal, so no guard is needed here.
            UiCommand::Run(path) => runs.push(spawn_run(path)),
            UiCommand::SetCollection(path) => {
                let prefs = bridge
                    .set_preferences(PrefsUpdate {
                        collection_path: Some(path.trim().to_string()),
                    })
                    .await;
                let _ = notify_tx.send(ControllerEvent::Prefs(prefs));
            }
            UiCommand::Quit => break,
        }
    }

    for handle in runs {
        handle.abort();
    }
    Ok(())
}
