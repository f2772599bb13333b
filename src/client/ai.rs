// src/client/ai.rs — AI completion service (chat stream, quiz, test, grading)

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::Stream;
use std::sync::Arc;

use super::schema::*;
use crate::infra::errors::TutorError;
use crate::stream::{delta_stream, StreamDelta};
use crate::transport::{send_json, send_stream, ApiRequest, Service, Transport};

/// A photo to send along with a chat message or an assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Guess the mime type from the file extension; the service treats
    /// everything as JPEG anyway.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "image/jpeg",
        };
        Ok(Self::new(mime, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[derive(Clone)]
pub struct AiClient {
    transport: Arc<dyn Transport>,
}

impl AiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, TutorError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let body = serde_json::to_value(body)?;
        send_json(self.transport.as_ref(), ApiRequest::post(Service::Ai, path, body)).await
    }

    /// Open the tutoring stream for one message.
    pub async fn chat_stream(
        &self,
        lesson_id: &str,
        message: &str,
        image: Option<&ImageUpload>,
    ) -> Result<impl Stream<Item = Result<StreamDelta, TutorError>> + Send, TutorError> {
        let body = serde_json::to_value(ChatStreamRequest {
            message: message.to_string(),
            lesson_id: lesson_id.to_string(),
            image: image.map(ImageUpload::to_data_url),
        })?;
        let bytes = send_stream(
            self.transport.as_ref(),
            ApiRequest::stream(Service::Ai, "chat-stream", body),
        )
        .await?;
        Ok(delta_stream(bytes))
    }

    pub async fn generate_quiz(&self, lesson_id: &str) -> Result<Vec<QuizQuestion>, TutorError> {
        let env: QuizEnvelope = self
            .post(
                "generate-quiz",
                &LessonOnly {
                    lesson_id: lesson_id.to_string(),
                },
            )
            .await?;
        match env.quiz {
            Some(q) if !q.is_empty() => Ok(q),
            _ => Err(TutorError::schema("ai:generate-quiz", "no quiz in response")),
        }
    }

    pub async fn grade_quiz(
        &self,
        lesson_id: &str,
        quiz: &[QuizQuestion],
        answers: &QuizAnswers,
    ) -> Result<QuizResult, TutorError> {
        self.post(
            "grade-quiz",
            &GradeQuizRequest {
                lesson_id,
                quiz,
                answers,
            },
        )
        .await
    }

    pub async fn generate_test(&self, lesson_id: &str) -> Result<GeneratedTest, TutorError> {
        let env: TestEnvelope = self
            .post(
                "generate-test",
                &LessonOnly {
                    lesson_id: lesson_id.to_string(),
                },
            )
            .await?;
        env.test
            .ok_or_else(|| TutorError::schema("ai:generate-test", "no test in response"))
    }

    /// Grade a photo of the learner's workings. The service also marks the
    /// lesson completed and stores the score.
    pub async fn grade_image(
        &self,
        lesson_id: &str,
        image: &ImageUpload,
    ) -> Result<AssessmentResult, TutorError> {
        self.post(
            "grade-image",
            &GradeImageRequest {
                lesson_id: lesson_id.to_string(),
                image: image.to_data_url(),
            },
        )
        .await
    }
}
