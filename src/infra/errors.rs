// src/infra/errors.rs — Error types for tutorlink

use thiserror::Error;

use crate::lesson::types::LessonStatus;

#[derive(Error, Debug)]
pub enum TutorError {
    // Transport errors (category a)
    #[error("Request to '{endpoint}' failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("'{endpoint}' returned HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
        debug: Option<String>,
    },

    // Terminal stream error frame (category c)
    #[error("{0}")]
    StreamAborted(String),

    // Caught before any network call (category d)
    #[error("{0}")]
    Precondition(String),

    #[error("Cannot {action} a lesson that is {from}")]
    InvalidTransition {
        from: LessonStatus,
        action: &'static str,
    },

    // Boundary validation
    #[error("Unexpected payload from '{endpoint}': {message}")]
    Schema { endpoint: String, message: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("No lesson is open")]
    NoLesson,

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification used when deciding how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    StreamFrame,
    Precondition,
    Local,
}

impl TutorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TutorError::Transport { .. } | TutorError::Status { .. } => ErrorCategory::Transport,
            TutorError::StreamAborted(_) => ErrorCategory::StreamFrame,
            TutorError::Precondition(_)
            | TutorError::InvalidTransition { .. }
            | TutorError::NoLesson => ErrorCategory::Precondition,
            _ => ErrorCategory::Local,
        }
    }

    /// Errors the learner can act on, as opposed to local faults worth a log.
    pub fn is_user_facing(&self) -> bool {
        self.category() != ErrorCategory::Local
            || matches!(self, TutorError::NotFound { .. } | TutorError::Config(_))
    }

    /// Text shown in an error bubble or alert.
    pub fn user_message(&self) -> String {
        match self {
            TutorError::Status {
                status, message, ..
            } if message.is_empty() => format!("HTTP {status}"),
            TutorError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub(crate) fn schema(endpoint: impl Into<String>, message: impl std::fmt::Display) -> Self {
        TutorError::Schema {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_user_message_prefers_body() {
        let e = TutorError::Status {
            endpoint: "lessons/start".into(),
            status: 400,
            message: "grade parameter required".into(),
            debug: None,
        };
        assert_eq!(e.user_message(), "grade parameter required");
        assert_eq!(e.category(), ErrorCategory::Transport);
    }

    #[test]
    fn test_status_user_message_falls_back_to_code() {
        let e = TutorError::Status {
            endpoint: "stats".into(),
            status: 502,
            message: String::new(),
            debug: None,
        };
        assert_eq!(e.user_message(), "HTTP 502");
    }

    #[test]
    fn test_invalid_transition_display() {
        let e = TutorError::InvalidTransition {
            from: LessonStatus::Finished,
            action: "finish",
        };
        assert_eq!(e.to_string(), "Cannot finish a lesson that is finished");
        assert_eq!(e.category(), ErrorCategory::Precondition);
    }

    #[test]
    fn test_stream_aborted_keeps_message() {
        let e = TutorError::StreamAborted("quota exceeded".into());
        assert_eq!(e.user_message(), "quota exceeded");
        assert_eq!(e.category(), ErrorCategory::StreamFrame);
    }

    #[test]
    fn test_user_facing() {
        assert!(TutorError::NoLesson.is_user_facing());
        assert!(TutorError::NotFound { what: "Lesson".into() }.is_user_facing());
        assert!(!TutorError::schema("rest:grades", "expected array").is_user_facing());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(!TutorError::from(io).is_user_facing());
    }
}
