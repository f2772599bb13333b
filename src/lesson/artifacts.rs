// src/lesson/artifacts.rs — Generated quiz/test cache
//
// Artifacts are keyed by lesson id and consumed by `take_*`: reading one at
// submission time removes it. Nothing is evicted otherwise.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::client::schema::{GeneratedTest, QuizQuestion};
use crate::infra::errors::TutorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Quiz,
    Test,
}

impl ArtifactKind {
    fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::Test => "test",
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Entry<T> {
    cached_at: DateTime<Utc>,
    payload: T,
}

enum Backend {
    Memory(HashMap<String, String>),
    Disk(PathBuf),
}

pub struct ArtifactCache {
    backend: Backend,
}

impl ArtifactCache {
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(HashMap::new()),
        }
    }

    /// One JSON file per artifact under `dir`.
    pub fn on_disk(dir: impl Into<PathBuf>) -> Result<Self, TutorError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            backend: Backend::Disk(dir),
        })
    }

    pub fn put_quiz(&mut self, lesson_id: &str, quiz: &[QuizQuestion]) -> Result<(), TutorError> {
        self.put(ArtifactKind::Quiz, lesson_id, &quiz)
    }

    pub fn take_quiz(&mut self, lesson_id: &str) -> Result<Option<Vec<QuizQuestion>>, TutorError> {
        self.take(ArtifactKind::Quiz, lesson_id)
    }

    pub fn put_test(&mut self, lesson_id: &str, test: &GeneratedTest) -> Result<(), TutorError> {
        self.put(ArtifactKind::Test, lesson_id, test)
    }

    pub fn take_test(&mut self, lesson_id: &str) -> Result<Option<GeneratedTest>, TutorError> {
        self.take(ArtifactKind::Test, lesson_id)
    }

    pub fn contains(&self, kind: ArtifactKind, lesson_id: &str) -> bool {
        let key = key_for(kind, lesson_id);
        match &self.backend {
            Backend::Memory(map) => map.contains_key(&key),
            Backend::Disk(dir) => dir.join(format!("{key}.json")).exists(),
        }
    }

    fn put<T: Serialize>(&mut self, kind: ArtifactKind, lesson_id: &str, payload: &T) -> Result<(), TutorError> {
        let key = key_for(kind, lesson_id);
        let raw = serde_json::to_string(&Entry {
            cached_at: Utc::now(),
            payload,
        })?;
        match &mut self.backend {
            Backend::Memory(map) => {
                map.insert(key, raw);
            }
            Backend::Disk(dir) => write_atomic(dir, &key, &raw)?,
        }
        tracing::debug!(kind = kind.prefix(), lesson_id, "artifact cached");
        Ok(())
    }

    fn take<T: DeserializeOwned>(&mut self, kind: ArtifactKind, lesson_id: &str) -> Result<Option<T>, TutorError> {
        let key = key_for(kind, lesson_id);
        let Some(raw) = self.read_raw(&key)? else {
            return Ok(None);
        };
        // A corrupt entry stays in place; only a decoded one is consumed.
        let entry: Entry<T> = serde_json::from_str(&raw)?;
        self.remove_raw(&key)?;
        tracing::debug!(
            kind = kind.prefix(),
            lesson_id,
            age_secs = (Utc::now() - entry.cached_at).num_seconds(),
            "artifact consumed"
        );
        Ok(Some(entry.payload))
    }

    fn read_raw(&self, key: &str) -> Result<Option<String>, TutorError> {
        match &self.backend {
            Backend::Memory(map) => Ok(map.get(key).cloned()),
            Backend::Disk(dir) => match std::fs::read_to_string(dir.join(format!("{key}.json"))) {
                Ok(raw) => Ok(Some(raw)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn remove_raw(&mut self, key: &str) -> Result<(), TutorError> {
        match &mut self.backend {
            Backend::Memory(map) => {
                map.remove(key);
            }
            Backend::Disk(dir) => std::fs::remove_file(dir.join(format!("{key}.json")))?,
        }
        Ok(())
    }
}

/// Write via a temp file and rename it over the target.
fn write_atomic(dir: &Path, key: &str, raw: &str) -> Result<(), TutorError> {
    let tmp = dir.join(format!(".{key}.json.tmp"));
    let dst = dir.join(format!("{key}.json"));

    let mut f = std::fs::File::create(&tmp)?;
    f.write_all(raw.as_bytes())?;
    f.flush()?;
    f.sync_all()?;
    std::fs::rename(&tmp, &dst)?;
    Ok(())
}

/// `quiz_L_1a2b` etc. Anything outside `[A-Za-z0-9_-]` becomes `_` so ids
/// can't escape the cache directory.
fn key_for(kind: ArtifactKind, lesson_id: &str) -> String {
    let safe: String = lesson_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{safe}", kind.prefix())
}
