// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::infra::errors::TutorError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub learner: LearnerConfig,

    #[serde(default)]
    pub lesson: LessonConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Endpoints of the two remote services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Profile/curriculum REST service.
    pub api_base: String,
    /// AI completion service (quiz, grading, chat-stream).
    pub ai_base: String,
    /// Timeout for buffered calls. Streams only get the connect timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8080/".into(),
            ai_base: "http://127.0.0.1:8081/".into(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerConfig {
    pub email: Option<String>,
    pub grade: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonConfig {
    /// Also push each finished exchange to the REST `lessons/chat` endpoint.
    /// The AI service already persists exchanges, so this is off by default.
    #[serde(default)]
    pub sync_history: bool,
    /// Ask before finishing a lesson in the interactive session.
    #[serde(default = "default_true")]
    pub confirm_finish: bool,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            sync_history: false,
            confirm_finish: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Artifact directory. Defaults to the platform cache dir.
    pub dir: Option<PathBuf>,
    /// Keep artifacts in memory only.
    #[serde(default)]
    pub ephemeral: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        let config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_env())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply TUTORLINK_* environment overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(v) = std::env::var("TUTORLINK_API_BASE") {
            self.service.api_base = v;
        }
        if let Ok(v) = std::env::var("TUTORLINK_AI_BASE") {
            self.service.ai_base = v;
        }
        if let Ok(v) = std::env::var("TUTORLINK_EMAIL") {
            self.learner.email = Some(v);
        }
        self
    }

    pub fn api_base_url(&self) -> Result<Url, TutorError> {
        parse_base(&self.service.api_base, "service.api_base")
    }

    pub fn ai_base_url(&self) -> Result<Url, TutorError> {
        parse_base(&self.service.ai_base, "service.ai_base")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(paths::artifacts_dir)
    }

    pub fn require_email(&self) -> Result<&str, TutorError> {
        self.learner
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                TutorError::Config(
                    "no learner email. Set learner.email, TUTORLINK_EMAIL or --email".into(),
                )
            })
    }
}

/// Base URLs must end in '/' so that `Url::join` keeps the last path segment.
fn parse_base(raw: &str, key: &str) -> Result<Url, TutorError> {
    let mut s = raw.trim().to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    let url = Url::parse(&s).map_err(|e| TutorError::Config(format!("{key}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TutorError::Config(format!(
            "{key}: unsupported scheme '{other}'"
        ))),
    }
}
