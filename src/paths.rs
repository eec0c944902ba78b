//! Per-user file locations.
//!
//! - Linux: `~/.config/nmrunner/config.json`, `~/.local/share/nmrunner/logs/`
//! - macOS: `~/Library/Application Support/nmrunner/...`
//! - Windows: `%APPDATA%\nmrunner\...`

use std::path::PathBuf;

const APP_DIR: &str = "nmrunner";

/// Directory holding the preference file.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Path to the preference file.
pub fn prefs_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("logs")
}

/// Run log written by the log sink.
pub fn run_log_path() -> PathBuf {
    log_dir().join("nmrunner.log")
}

/// Diagnostics written by `tracing` while the TUI owns the terminal.
pub fn diagnostics_log_name() -> &'static str {
    "diagnostics.log"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefs_live_in_the_app_config_dir() {
        let p = prefs_path();
        assert!(p.ends_with("nmrunner/config.json"));
    }

    #[test]
    fn run_log_lives_in_log_dir() {
        assert_eq!(run_log_path().parent().unwrap(), log_dir());
    }
}
