//! Best-effort run log.
//!
//! Every notable run event is appended as one line:
//! `[2024-05-01T12:00:00.000Z] [INFO] message`.
//! Failing to log must never affect the run, so all I/O errors are dropped.

use crate::model::LogLevel;
use std::path::{Path, PathBuf};
use time::{macros::format_description, OffsetDateTime};
use tokio::io::AsyncWriteExt;

pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn info(&self, message: &str) {
        self.write(LogLevel::Info, message).await;
    }

    pub async fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, message).await;
    }

    pub async fn error(&self, message: &str) {
        self.write(LogLevel::Error, message).await;
    }

    pub async fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "nmrunner::run", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "nmrunner::run", "{message}"),
            LogLevel::Error => tracing::error!(target: "nmrunner::run", "{message}"),
        }

        if let Err(e) = self.append(&format_line(level, message)).await {
            tracing::debug!(path = %self.path.display(), error = %e, "run log write failed");
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .unwrap_or_else(|_| "now".into())
}

pub(crate) fn format_line(level: LogLevel, message: &str) -> String {
    format!("[{}] [{}] {}\n", timestamp(), level, message)
}
