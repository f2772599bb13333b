// src/lesson/controller.rs — Lesson session controller
//
// Owns the learner context and the one open lesson. Every user action goes
// through `dispatch`, which validates the transition locally before any
// network call, so a rejected action never reaches the services. A failed
// action leaves the session as it was and sets a notice for the view.

use std::sync::Arc;

use super::artifacts::ArtifactCache;
use super::state::{self, Transition};
use super::types::LessonSession;
use crate::client::schema::{
    AssessmentResult, ChatAppend, GeneratedTest, QuizAnswers, QuizQuestion, QuizResult,
    ScoreUpdate, StartLesson,
};
use crate::client::{AiClient, ImageUpload, RestClient};
use crate::infra::errors::TutorError;
use crate::render::view::{render, ConversationView, RenderContext, RenderMode};
use crate::stream::collect_reply;
use crate::transport::Transport;

/// Who is learning and where they are in the curriculum.
#[derive(Debug, Clone, Default)]
pub struct LearnerContext {
    pub email: String,
    pub grade: Option<String>,
    pub subject: Option<String>,
    pub topic_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Action {
    Start { topic_id: String },
    Resume { lesson_id: String },
    Recap { lesson_id: String },
    Send { text: String, image: Option<ImageUpload> },
    Finish,
    GenerateQuiz,
    SubmitQuiz { answers: QuizAnswers },
    GenerateTest,
    SubmitAssessment { image: Option<ImageUpload> },
    Exit,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Start { .. } => "start",
            Action::Resume { .. } => "resume",
            Action::Recap { .. } => "recap",
            Action::Send { .. } => "send",
            Action::Finish => "finish",
            Action::GenerateQuiz => "generate_quiz",
            Action::SubmitQuiz { .. } => "submit_quiz",
            Action::GenerateTest => "generate_test",
            Action::SubmitAssessment { .. } => "submit_assessment",
            Action::Exit => "exit",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Opened(RenderMode),
    /// Nothing to do (e.g. an empty message).
    Ignored,
    Replied(String),
    Finished,
    Quiz(Vec<QuizQuestion>),
    QuizGraded(QuizResult),
    Test(GeneratedTest),
    Assessed(AssessmentResult),
    Closed,
}

pub struct LessonController {
    rest: RestClient,
    ai: AiClient,
    learner: LearnerContext,
    session: Option<LessonSession>,
    mode: RenderMode,
    artifacts: ArtifactCache,
    notice: Option<String>,
    sync_history: bool,
}

impl LessonController {
    pub fn new(transport: Arc<dyn Transport>, learner: LearnerContext, artifacts: ArtifactCache) -> Self {
        Self {
            rest: RestClient::new(transport.clone()),
            ai: AiClient::new(transport),
            learner,
            session: None,
            mode: RenderMode::Interactive,
            artifacts,
            notice: None,
            sync_history: false,
        }
    }

    /// Also push finished exchanges to the REST history endpoint.
    pub fn with_history_sync(mut self, enabled: bool) -> Self {
        self.sync_history = enabled;
        self
    }

    pub fn session(&self) -> Option<&LessonSession> {
        self.session.as_ref()
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn learner(&self) -> &LearnerContext {
        &self.learner
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn artifacts(&self) -> &ArtifactCache {
        &self.artifacts
    }

    /// Current view, including the last notice.
    pub fn view(&self) -> Option<ConversationView> {
        self.view_with_pending(None)
    }

    /// View while a reply is streaming in.
    pub fn view_with_pending(&self, pending: Option<&str>) -> Option<ConversationView> {
        let session = self.session.as_ref()?;
        Some(render(
            session,
            &RenderContext {
                mode: self.mode,
                pending_reply: pending,
                notice: self.notice.as_deref(),
            },
        ))
    }

    /// Run one user action. Streamed reply text is passed to `on_delta` as
    /// it arrives.
    pub async fn dispatch(
        &mut self,
        action: Action,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<Outcome, TutorError> {
        let name = action.name();
        self.notice = None;

        let result = match action {
            Action::Start { topic_id } => self.start(topic_id).await,
            Action::Resume { lesson_id } => self.open(&lesson_id, RenderMode::Interactive).await,
            Action::Recap { lesson_id } => self.open(&lesson_id, RenderMode::Recap).await,
            Action::Send { text, image } => self.send(&text, image, on_delta).await,
            Action::Finish => self.finish().await,
            Action::GenerateQuiz => self.generate_quiz().await,
            Action::SubmitQuiz { answers } => self.submit_quiz(answers).await,
            Action::GenerateTest => self.generate_test().await,
            Action::SubmitAssessment { image } => self.submit_assessment(image).await,
            Action::Exit => {
                self.session = None;
                self.mode = RenderMode::Interactive;
                Ok(Outcome::Closed)
            }
        };

        match &result {
            Ok(_) => tracing::debug!(action = name, "action done"),
            Err(e) => {
                tracing::warn!(action = name, category = ?e.category(), "action failed: {e}");
                self.notice = Some(format!("Error: {}", e.user_message()));
            }
        }
        result
    }

    async fn start(&mut self, topic_id: String) -> Result<Outcome, TutorError> {
        let mut session = LessonSession::pending(&topic_id);
        let record = self
            .rest
            .start_lesson(&StartLesson {
                email: self.learner.email.clone(),
                topic_id: topic_id.clone(),
                subject_name: self.learner.subject.clone(),
                grade: self.learner.grade.clone(),
            })
            .await?;
        if record.lesson_id.is_empty() {
            return Err(TutorError::schema("rest:lessons/start", "empty lessonId"));
        }

        session.start(record.lesson_id, record.history)?;
        session.topic_name = record.topic_name;
        session.subject_name = record.subject_name.or_else(|| self.learner.subject.clone());
        session.grade = record.grade.or_else(|| self.learner.grade.clone());
        tracing::info!(lesson_id = session.id(), topic_id = %topic_id, "lesson started");

        self.learner.topic_id = Some(topic_id);
        self.session = Some(session);
        self.mode = RenderMode::Interactive;
        Ok(Outcome::Opened(RenderMode::Interactive))
    }

    async fn open(&mut self, lesson_id: &str, mode: RenderMode) -> Result<Outcome, TutorError> {
        let record = self.rest.get_lesson(lesson_id).await?;
        let session = record.into_session();
        self.learner.topic_id = Some(session.topic_id.clone());
        if let Some(subject) = &session.subject_name {
            self.learner.subject = Some(subject.clone());
        }
        self.session = Some(session);
        self.mode = mode;
        Ok(Outcome::Opened(mode))
    }

    fn interactive_session(&mut self) -> Result<&mut LessonSession, TutorError> {
        if self.mode == RenderMode::Recap {
            return Err(TutorError::Precondition(
                "This is a read-only recap. Resume the lesson to interact.".into(),
            ));
        }
        self.session.as_mut().ok_or(TutorError::NoLesson)
    }

    fn require(&self, transition: Transition) -> Result<&LessonSession, TutorError> {
        let session = self.session.as_ref().ok_or(TutorError::NoLesson)?;
        state::next(session.status(), transition)?;
        Ok(session)
    }

    async fn send(
        &mut self,
        text: &str,
        image: Option<ImageUpload>,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<Outcome, TutorError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Outcome::Ignored);
        }
        let image = image.filter(|i| !i.is_empty());

        let session = self.interactive_session()?;
        session.push_user(text)?;
        let lesson_id = session.id().to_string();

        let stream = self.ai.chat_stream(&lesson_id, text, image.as_ref()).await?;
        let reply = collect_reply(stream, on_delta).await?;

        if let Some(session) = self.session.as_mut() {
            session.push_ai(reply.clone())?;
        }

        if self.sync_history {
            let sync = ChatAppend {
                lesson_id,
                message: text.to_string(),
                ai_response: reply.clone(),
            };
            if let Err(e) = self.rest.append_chat(&sync).await {
                tracing::warn!("history sync failed: {e}");
            }
        }
        Ok(Outcome::Replied(reply))
    }

    async fn finish(&mut self) -> Result<Outcome, TutorError> {
        self.interactive_session()?;
        let lesson_id = self.require(Transition::Finish)?.id().to_string();

        let reply = self.rest.finish_lesson(&lesson_id).await?;
        if let Some(session) = self.session.as_mut() {
            session.finish(reply.goodbye)?;
        }
        tracing::info!(lesson_id = %lesson_id, "lesson finished");
        Ok(Outcome::Finished)
    }

    fn require_test_phase(&self) -> Result<String, TutorError> {
        let session = self.session.as_ref().ok_or(TutorError::NoLesson)?;
        if !session.status().offers_test() {
            return Err(TutorError::InvalidTransition {
                from: session.status(),
                action: "take a test for",
            });
        }
        Ok(session.id().to_string())
    }

    async fn generate_quiz(&mut self) -> Result<Outcome, TutorError> {
        let lesson_id = self.require_test_phase()?;
        let quiz = self.ai.generate_quiz(&lesson_id).await?;
        self.artifacts.put_quiz(&lesson_id, &quiz)?;
        Ok(Outcome::Quiz(quiz))
    }

    async fn submit_quiz(&mut self, mut answers: QuizAnswers) -> Result<Outcome, TutorError> {
        let lesson_id = self.require(Transition::Grade)?.id().to_string();
        let quiz = self.artifacts.take_quiz(&lesson_id)?.ok_or_else(|| {
            TutorError::Precondition("No quiz has been generated for this lesson yet.".into())
        })?;
        for q in &quiz {
            answers.entry(q.id.clone()).or_insert(-1);
        }

        let result = match self.ai.grade_quiz(&lesson_id, &quiz, &answers).await {
            Ok(r) => r,
            Err(e) => {
                // let the learner resubmit the same quiz
                self.artifacts.put_quiz(&lesson_id, &quiz)?;
                return Err(e);
            }
        };

        if let Some(session) = self.session.as_mut() {
            session.record_quiz(result.score)?;
        }
        if let Err(e) = self.rest.complete_lesson(&lesson_id).await {
            tracing::warn!(lesson_id = %lesson_id, "could not mark lesson completed: {e}");
        }
        Ok(Outcome::QuizGraded(result))
    }

    async fn generate_test(&mut self) -> Result<Outcome, TutorError> {
        let lesson_id = self.require_test_phase()?;
        let test = self.ai.generate_test(&lesson_id).await?;
        self.artifacts.put_test(&lesson_id, &test)?;
        Ok(Outcome::Test(test))
    }

    async fn submit_assessment(&mut self, image: Option<ImageUpload>) -> Result<Outcome, TutorError> {
        let lesson_id = self.require(Transition::Grade)?.id().to_string();
        let image = image.filter(|i| !i.is_empty()).ok_or_else(|| {
            TutorError::Precondition("Upload a photo of your workings before submitting.".into())
        })?;

        let test = self.artifacts.take_test(&lesson_id)?;
        let result = match self.ai.grade_image(&lesson_id, &image).await {
            Ok(r) => r,
            Err(e) => {
                if let Some(test) = &test {
                    self.artifacts.put_test(&lesson_id, test)?;
                }
                return Err(e);
            }
        };

        if let Some(session) = self.session.as_mut() {
            session.record_assessment(result.score)?;
        }
        let update = ScoreUpdate {
            lesson_id: lesson_id.clone(),
            score: result.score,
            feedback: result.feedback.clone(),
            solution: result.model_solution.clone(),
        };
        if let Err(e) = self.rest.save_score(&update).await {
            tracing::warn!(lesson_id = %lesson_id, "could not store assessment feedback: {e}");
        }
        Ok(Outcome::Assessed(result))
    }
}
