// src/infra/paths.rs — Filesystem locations
//
// TUTORLINK_HOME overrides everything. Otherwise config lives in
// ~/.tutorlink/ and cached artifacts in the platform cache directory.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;
use std::sync::OnceLock;

static PROJECT_DIRS: OnceLock<Option<ProjectDirs>> = OnceLock::new();

fn project_dirs() -> Option<&'static ProjectDirs> {
    PROJECT_DIRS
        .get_or_init(|| ProjectDirs::from("", "", "tutorlink"))
        .as_ref()
}

fn tutorlink_home() -> Option<PathBuf> {
    std::env::var_os("TUTORLINK_HOME").map(PathBuf::from)
}

/// Home directory, or the working directory when none can be determined.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// $TUTORLINK_HOME/ or ~/.tutorlink/
pub fn config_dir() -> PathBuf {
    if let Some(home) = tutorlink_home() {
        return home;
    }
    dirs_home().join(".tutorlink")
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// $TUTORLINK_HOME/cache/ or the platform cache dir (~/.cache/tutorlink on Linux)
pub fn cache_dir() -> PathBuf {
    if let Some(home) = tutorlink_home() {
        return home.join("cache");
    }
    match project_dirs() {
        Some(p) => p.cache_dir().to_path_buf(),
        None => config_dir().join("cache"),
    }
}

/// Quiz and test artifacts awaiting submission.
pub fn artifacts_dir() -> PathBuf {
    cache_dir().join("artifacts")
}

pub async fn ensure_dirs() -> anyhow::Result<()> {
    for dir in [config_dir(), cache_dir(), artifacts_dir()] {
        tokio::fs::create_dir_all(&dir).await?;
    }
    Ok(())
}
