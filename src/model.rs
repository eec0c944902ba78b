use serde::{Deserialize, Serialize};
use std::fmt;

/// A request to run a collection. `None` means "use the fallbacks".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub collection_path: Option<String>,
}

impl RunRequest {
    pub fn new(collection_path: Option<String>) -> Self {
        Self { collection_path }
    }
}

/// Aggregate result of a completed run, handed to the presentation layer once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: u64,
    pub failures: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPrefs {
    pub collection_path: String,
}

/// Partial preference update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefsUpdate {
    pub collection_path: Option<String>,
}

impl UserPrefs {
    pub fn merged(&self, update: PrefsUpdate) -> UserPrefs {
        UserPrefs {
            collection_path: update
                .collection_path
                .unwrap_or_else(|| self.collection_path.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals delivered to presentation layers.
///
/// Only used where a single tagged stream is more convenient than four
/// subscriptions (text output, the TUI event drain).
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Log(String),
    Progress(f64),
    Done(RunSummary),
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefs_serialize_as_camel_case() {
        let prefs = UserPrefs {
            collection_path: "/a/b.json".into(),
        };
        let json = serde_json::to_string(&prefs).unwrap();
        assert_eq!(json, r#"{"collectionPath":"/a/b.json"}"#);
    }

    #[test]
    fn summary_serializes_duration_in_camel_case() {
        let summary = RunSummary {
            total: 4,
            failures: 1,
            duration_ms: 250,
        };
        let v = serde_json::to_value(summary).unwrap();
        assert_eq!(v["durationMs"], 250);
        assert_eq!(v["total"], 4);
    }

    #[test]
    fn merge_keeps_current_value_when_field_absent() {
        let current = UserPrefs {
            collection_path: "/keep.json".into(),
        };
        assert_eq!(current.merged(PrefsUpdate::default()), current);

        let next = current.merged(PrefsUpdate {
            collection_path: Some("/new.json".into()),
        });
        assert_eq!(next.collection_path, "/new.json");
    }
}
