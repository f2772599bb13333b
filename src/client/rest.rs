// src/client/rest.rs — Profile/curriculum REST service

use std::sync::Arc;

use super::schema::*;
use crate::infra::errors::TutorError;
use crate::transport::{send_json, ApiRequest, Service, Transport};

#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn Transport>,
}

impl RestClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, req: ApiRequest) -> Result<T, TutorError> {
        send_json(self.transport.as_ref(), req).await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, TutorError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let body = serde_json::to_value(body)?;
        send_json(
            self.transport.as_ref(),
            ApiRequest::post(Service::Rest, path, body),
        )
        .await
    }

    // ─── Profile ────────────────────────────────────────────

    pub async fn get_profile(&self, email: &str) -> Result<Profile, TutorError> {
        self.get(ApiRequest::get(Service::Rest, "profile").query("email", email))
            .await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Ack, TutorError> {
        self.post("profile", update).await
    }

    // ─── Curriculum ─────────────────────────────────────────

    pub async fn list_subjects(&self, curriculum: &str) -> Result<Vec<Subject>, TutorError> {
        self.get(ApiRequest::get(Service::Rest, "subjects").query("curriculum", curriculum))
            .await
    }

    pub async fn subject_details(
        &self,
        curriculum: &str,
        subject_name: &str,
    ) -> Result<Subject, TutorError> {
        let value: serde_json::Value = self
            .get(
                ApiRequest::get(Service::Rest, "subject-details")
                    .query("curriculum", curriculum)
                    .query("subjectName", subject_name),
            )
            .await?;
        if is_empty_object(&value) {
            return Err(TutorError::NotFound {
                what: format!("Subject '{subject_name}'"),
            });
        }
        serde_json::from_value(value).map_err(|e| TutorError::schema("rest:subject-details", e))
    }

    pub async fn list_grades(&self) -> Result<Vec<String>, TutorError> {
        let grades: Vec<serde_json::Value> = self.get(ApiRequest::get(Service::Rest, "grades")).await?;
        Ok(grades
            .into_iter()
            .map(|g| match g {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }

    pub async fn curriculum_for_grade(&self, grade: &str) -> Result<Vec<CurriculumEntry>, TutorError> {
        self.get(ApiRequest::get(Service::Rest, "curriculum").query("grade", grade))
            .await
    }

    /// Topics come back ordered by term, then order index.
    pub async fn curriculum_topics(&self, curriculum_id: &str) -> Result<Vec<Topic>, TutorError> {
        self.get(
            ApiRequest::get(Service::Rest, "curriculum/topics").query("curriculumId", curriculum_id),
        )
        .await
    }

    pub async fn add_topic(&self, topic: &NewTopic) -> Result<Ack, TutorError> {
        self.post("topics", topic).await
    }

    pub async fn enroll(&self, request: &EnrollRequest) -> Result<Ack, TutorError> {
        self.post("enroll", request).await
    }

    pub async fn stats(&self, email: &str) -> Result<Vec<SubjectStat>, TutorError> {
        self.get(ApiRequest::get(Service::Rest, "stats").query("email", email))
            .await
    }

    // ─── Lessons ────────────────────────────────────────────

    pub async fn list_lessons(&self, email: &str, topic_id: &str) -> Result<Vec<LessonRecord>, TutorError> {
        self.get(
            ApiRequest::get(Service::Rest, "lessons")
                .query("email", email)
                .query("topicId", topic_id),
        )
        .await
    }

    /// The service answers `{}` for unknown ids.
    pub async fn get_lesson(&self, lesson_id: &str) -> Result<LessonRecord, TutorError> {
        let value: serde_json::Value = self
            .get(ApiRequest::get(Service::Rest, "lessons").query("lessonId", lesson_id))
            .await?;
        if is_empty_object(&value) || value.is_null() {
            return Err(TutorError::NotFound {
                what: format!("Lesson {lesson_id}"),
            });
        }
        serde_json::from_value(value).map_err(|e| TutorError::schema("rest:lessons", e))
    }

    pub async fn start_lesson(&self, request: &StartLesson) -> Result<LessonRecord, TutorError> {
        self.post("lessons/start", request).await
    }

    pub async fn append_chat(&self, request: &ChatAppend) -> Result<Ack, TutorError> {
        self.post("lessons/chat", request).await
    }

    pub async fn finish_lesson(&self, lesson_id: &str) -> Result<FinishReply, TutorError> {
        self.post(
            "lessons/finish",
            &LessonRef {
                lesson_id: lesson_id.to_string(),
            },
        )
        .await
    }

    pub async fn complete_lesson(&self, lesson_id: &str) -> Result<Ack, TutorError> {
        self.post(
            "lessons/complete",
            &LessonRef {
                lesson_id: lesson_id.to_string(),
            },
        )
        .await
    }

    pub async fn save_score(&self, update: &ScoreUpdate) -> Result<Ack, TutorError> {
        self.post("lessons/score", update).await
    }
}

fn is_empty_object(v: &serde_json::Value) -> bool {
    v.as_object().is_some_and(|o| o.is_empty())
}
