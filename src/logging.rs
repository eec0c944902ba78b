//! Diagnostics (`tracing`) setup.
//!
//! Controlled by `RUST_LOG`. This is separate from the run log in `run_log`,
//! whose lines are mirrored under the `nmrunner::run` target.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log compactly to stderr (text/JSON modes).
///
/// Run log lines already reach stdout in these modes, so their mirror is off
/// unless `RUST_LOG` asks for it.
pub fn init_stderr() {
    let _ = tracing_subscriber::registry()
        .with(filter("warn,nmrunner::run=off"))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}

/// Log to a file while the TUI owns the terminal.
///
/// The returned guard flushes pending lines when dropped; keep it alive for
/// the lifetime of the program.
#[cfg_attr(not(feature = "tui"), allow(dead_code))]
pub fn init_file() -> Option<WorkerGuard> {
    let dir = crate::paths::log_dir();
    if std::fs::create_dir_all(&dir).is_err() {
        return None;
    }
    let appender = tracing_appender::rolling::never(&dir, crate::paths::diagnostics_log_name());
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::registry()
        .with(filter("nmrunner=info,warn"))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();
    Some(guard)
}
