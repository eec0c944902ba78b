//! Collection path resolution.
//!
//! Turns an optional user-supplied path into one existing file by probing an
//! ordered list of candidates. The first candidate that exists wins.

use crate::error::RunError;
use std::path::{Path, PathBuf};

pub const SAMPLE_COLLECTION: &str = "sample.postman_collection.json";

/// Base directories candidates are joined against.
#[derive(Debug, Clone)]
pub struct ResolverBases {
    /// Where the application is installed.
    pub app_root: PathBuf,
    pub cwd: PathBuf,
    /// Packaged resources shipped next to the binary.
    pub resources_dir: PathBuf,
}

impl ResolverBases {
    /// Detect bases from the running executable and the current directory.
    /// `app_root` overrides the executable's directory.
    pub fn detect(app_root: Option<PathBuf>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let app_root = app_root
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(Path::to_path_buf))
            })
            .unwrap_or_else(|| cwd.clone());
        let resources_dir = resources_dir_for(&app_root);
        Self {
            app_root,
            cwd,
            resources_dir,
        }
    }
}

fn resources_dir_for(app_root: &Path) -> PathBuf {
    // macOS bundles keep resources in Contents/Resources next to Contents/MacOS.
    if cfg!(target_os = "macos") {
        if let Some(contents) = app_root.parent() {
            let bundled = contents.join("Resources");
            if bundled.is_dir() {
                return bundled;
            }
        }
    }
    app_root.join("resources")
}

#[derive(Debug, Clone)]
pub struct CollectionResolver {
    bases: ResolverBases,
}

impl CollectionResolver {
    pub fn new(bases: ResolverBases) -> Self {
        Self { bases }
    }

    /// Candidate paths for `input`, in probing order.
    pub fn candidates(&self, input: Option<&str>) -> Vec<PathBuf> {
        let b = &self.bases;
        match input.map(str::trim).filter(|s| !s.is_empty()) {
            Some(p) if Path::new(p).is_absolute() => vec![PathBuf::from(p)],
            Some(p) => vec![b.app_root.join(p), b.cwd.join(p)],
            None => vec![
                b.app_root.join(SAMPLE_COLLECTION),
                b.app_root.join("public").join(SAMPLE_COLLECTION),
                b.app_root
                    .join("src")
                    .join("collections")
                    .join(SAMPLE_COLLECTION),
                b.cwd.join("public").join(SAMPLE_COLLECTION),
                b.resources_dir.join(SAMPLE_COLLECTION),
            ],
        }
    }

    /// Return the first candidate that exists.
    pub async fn resolve(&self, input: Option<&str>) -> Result<PathBuf, RunError> {
        for candidate in self.candidates(input) {
            match tokio::fs::metadata(&candidate).await {
                Ok(_) => return Ok(candidate),
                Err(e) => {
                    tracing::debug!(candidate = %candidate.display(), error = %e, "collection candidate skipped");
                }
            }
        }
        Err(RunError::CollectionNotFound)
    }
}
