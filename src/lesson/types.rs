// src/lesson/types.rs — Lesson session data model

use serde::{Deserialize, Serialize};

use super::state::{self, Transition};
use crate::infra::errors::TutorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "model", alias = "assistant")]
    Ai,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Ai => "ai",
        }
    }
}

/// One entry of a lesson's history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    #[default]
    NotStarted,
    /// The REST service writes `teaching` when a lesson starts.
    #[serde(alias = "teaching")]
    Active,
    Finished,
    Completed,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::NotStarted => "not started",
            LessonStatus::Active => "active",
            LessonStatus::Finished => "finished",
            LessonStatus::Completed => "completed",
        }
    }

    pub fn accepts_chat(&self) -> bool {
        *self == LessonStatus::Active
    }

    /// Quiz/test generation and grading are offered from here on.
    pub fn offers_test(&self) -> bool {
        matches!(self, LessonStatus::Finished | LessonStatus::Completed)
    }
}

impl std::fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side copy of one tutoring conversation. The remote service owns
/// persistence; this copy is only ever appended to.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonSession {
    id: String,
    pub topic_id: String,
    pub topic_name: Option<String>,
    pub subject_name: Option<String>,
    pub grade: Option<String>,
    status: LessonStatus,
    history: Vec<Message>,
    quiz_score: Option<f64>,
    assessment_score: Option<f64>,
}

impl LessonSession {
    /// A lesson the service has not started yet.
    pub fn pending(topic_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            topic_id: topic_id.into(),
            topic_name: None,
            subject_name: None,
            grade: None,
            status: LessonStatus::NotStarted,
            history: Vec::new(),
            quiz_score: None,
            assessment_score: None,
        }
    }

    /// Rebuild a session from a record the service returned.
    pub fn restore(
        id: impl Into<String>,
        topic_id: impl Into<String>,
        status: LessonStatus,
        history: Vec<Message>,
    ) -> Self {
        Self {
            id: id.into(),
            status,
            history,
            ..Self::pending(topic_id)
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> LessonStatus {
        self.status
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn quiz_score(&self) -> Option<f64> {
        self.quiz_score
    }

    pub fn assessment_score(&self) -> Option<f64> {
        self.assessment_score
    }

    pub fn title(&self) -> &str {
        self.topic_name.as_deref().unwrap_or(&self.topic_id)
    }

    /// `not_started -> active`: the service allocated an id and seeded the
    /// history (usually a welcome message).
    pub fn start(&mut self, id: impl Into<String>, seed: Vec<Message>) -> Result<(), TutorError> {
        self.status = state::next(self.status, Transition::Start)?;
        self.id = id.into();
        self.history = seed;
        Ok(())
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> Result<(), TutorError> {
        self.status = state::next(self.status, Transition::Exchange)?;
        self.history.push(Message::user(content));
        Ok(())
    }

    /// Freeze a streamed reply into the history.
    pub fn push_ai(&mut self, content: impl Into<String>) -> Result<(), TutorError> {
        self.status = state::next(self.status, Transition::Exchange)?;
        self.history.push(Message::ai(content));
        Ok(())
    }

    /// `active -> finished`, appending the closing message if one was sent.
    pub fn finish(&mut self, closing: Option<String>) -> Result<(), TutorError> {
        self.status = state::next(self.status, Transition::Finish)?;
        if let Some(text) = closing.filter(|t| !t.trim().is_empty()) {
            self.history.push(Message::ai(text));
        }
        Ok(())
    }

    pub fn record_quiz(&mut self, score: f64) -> Result<(), TutorError> {
        self.status = state::next(self.status, Transition::Grade)?;
        self.quiz_score = Some(score);
        Ok(())
    }

    pub fn record_assessment(&mut self, score: f64) -> Result<(), TutorError> {
        self.status = state::next(self.status, Transition::Grade)?;
        self.assessment_score = Some(score);
        Ok(())
    }

    pub(crate) fn with_scores(mut self, quiz: Option<f64>, assessment: Option<f64>) -> Self {
        self.quiz_score = quiz;
        self.assessment_score = assessment;
        self
    }
}
