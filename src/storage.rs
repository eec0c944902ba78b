//! Preference persistence.
//!
//! The preference file is tiny and rewritten wholesale on every change, so the
//! in-memory copy is authoritative and a failed write only leaves the file stale.

use crate::model::{PrefsUpdate, UserPrefs};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub struct PreferenceStore {
    path: PathBuf,
    current: RwLock<UserPrefs>,
}

impl PreferenceStore {
    /// Load preferences from `path`.
    ///
    /// A missing, unreadable or malformed file is a normal first-run condition
    /// and yields the defaults.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<UserPrefs>(&raw) {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "ignoring malformed preferences");
                    UserPrefs::default()
                }
            },
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no preferences on disk");
                UserPrefs::default()
            }
        };
        Self {
            path,
            current: RwLock::new(prefs),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> UserPrefs {
        self.current
            .read()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Replace the preferences and write them to disk.
    ///
    /// Memory is updated before the write starts, so `get` observes `next`
    /// even when the write fails.
    pub async fn save(&self, next: UserPrefs) -> std::io::Result<()> {
        {
            let mut guard = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = next.clone();
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&next)?;
        tokio::fs::write(&self.path, json).await
    }

    /// Merge `update` over the current value, persist it and return the result.
    /// Write failures are logged and otherwise ignored.
    pub async fn update(&self, update: PrefsUpdate) -> UserPrefs {
        let next = self.get().merged(update);
        if let Err(e) = self.save(next.clone()).await {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist preferences");
        }
        next
    }
}
