//! Application-level orchestration.
//!
//! This module owns the run lifecycle (`coordinator`), the signals it emits
//! (`events`), the narrow surface handed to presentation layers (`bridge`) and
//! the command loop interactive UIs drive (`controller`). UI/CLI layers only
//! talk to the bridge and the controller.

mod bridge;
mod controller;
mod coordinator;
mod events;

pub(crate) use bridge::{subscribe_all, Bridge};
#[cfg_attr(not(feature = "tui"), allow(unused_imports))]
pub(crate) use controller::{run_controller, ControllerEvent, UiCommand};
pub(crate) use controller::effective_path;
pub(crate) use coordinator::RunCoordinator;
pub(crate) use events::UiSubscriptions;
