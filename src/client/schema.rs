// src/client/schema.rs — Typed payloads for the REST and AI services
//
// The REST service speaks camelCase, the AI service snake_case requests and
// camelCase results. Numbers persisted by the service sometimes come back as
// strings (and vice versa), so a few fields accept either.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::lesson::types::{LessonSession, LessonStatus, Message};

/// Accept `"10"`, `10` or `10.0` and keep it as text.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        }),
        Some(other) => Some(other.to_string()),
    })
}

/// Accept `85`, `85.5` or `"85"`.
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    match v {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

fn required_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    number_or_string(deserializer)?.ok_or_else(|| serde::de::Error::custom("score is missing"))
}

// ─── Profile & curriculum ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub grade: Option<String>,
    pub curriculum: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl Profile {
    /// An empty object from the service means no profile yet.
    pub fn exists(&self) -> bool {
        self.name.is_some()
    }

    pub fn display_name(&self, fallback: &str) -> String {
        match (&self.name, &self.surname) {
            (Some(n), Some(s)) => format!("{n} {s}"),
            (Some(n), None) => n.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub email: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub grade: Option<String>,
    pub curriculum: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTopic {
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub term: Option<String>,
    pub topic_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub curriculum: Option<String>,
    pub subject_name: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub student_count: Option<f64>,
    #[serde(default)]
    pub topics: Vec<SubjectTopic>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumEntry {
    pub curriculum_id: Option<String>,
    pub subject_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub grade: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(alias = "id")]
    pub topic_id: Option<String>,
    pub topic_name: Option<String>,
    pub curriculum_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub term: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub order_index: Option<f64>,
    pub context: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTopic {
    pub curriculum: String,
    pub subject_name: String,
    pub term: String,
    pub topic_name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub email: String,
    pub subject_name: String,
    pub curriculum: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStat {
    pub subject_name: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub average: Option<f64>,
}

// ─── Lessons ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    pub lesson_id: String,
    pub email: Option<String>,
    pub topic_id: String,
    pub topic_name: Option<String>,
    pub subject_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub grade: Option<String>,
    #[serde(default)]
    pub status: LessonStatus,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub quiz_score: Option<f64>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub assessment_score: Option<f64>,
}

impl LessonRecord {
    /// Short label, e.g. `L_1a2b3c4d` -> `1a2b3c4d`.
    pub fn short_id(&self) -> &str {
        self.lesson_id.strip_prefix("L_").unwrap_or(&self.lesson_id)
    }

    pub fn into_session(self) -> LessonSession {
        let mut session =
            LessonSession::restore(self.lesson_id, self.topic_id, self.status, self.history)
                .with_scores(self.quiz_score, self.assessment_score);
        session.topic_name = self.topic_name;
        session.subject_name = self.subject_name;
        session.grade = self.grade;
        session
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLesson {
    pub email: String,
    pub topic_id: String,
    pub subject_name: Option<String>,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAppend {
    pub lesson_id: String,
    pub message: String,
    pub ai_response: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRef {
    pub lesson_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinishReply {
    pub message: Option<String>,
    pub goodbye: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub lesson_id: String,
    pub score: f64,
    pub feedback: String,
    pub solution: String,
}

// ─── AI service ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChatStreamRequest {
    pub message: String,
    pub lesson_id: String,
    /// Data URL of an attached photo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonOnly {
    pub lesson_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizEnvelope {
    pub quiz: Option<Vec<QuizQuestion>>,
}

/// Selected option index per question id; -1 when unanswered.
pub type QuizAnswers = BTreeMap<String, i64>;

#[derive(Debug, Clone, Serialize)]
pub struct GradeQuizRequest<'a> {
    pub lesson_id: &'a str,
    pub quiz: &'a [QuizQuestion],
    pub answers: &'a QuizAnswers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    #[serde(deserialize_with = "required_score")]
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub detailed_analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub marks: Option<f64>,
    pub expected_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTest {
    pub subject: Option<String>,
    pub questions: Vec<TestQuestion>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_marks: Option<f64>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestEnvelope {
    pub test: Option<GeneratedTest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeImageRequest {
    pub lesson_id: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub marks_awarded: Option<f64>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub marks_available: Option<f64>,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    #[serde(deserialize_with = "required_score")]
    pub score: f64,
    #[serde(default, deserialize_with = "number_or_string")]
    pub marks_awarded: Option<f64>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_marks: Option<f64>,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub question_results: Vec<QuestionResult>,
    #[serde(default)]
    pub model_solution: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_grade_as_number_or_string() {
        let p: Profile =
            serde_json::from_str(r#"{"email":"a@b.c","name":"Thandi","grade":10}"#).unwrap();
        assert_eq!(p.grade.as_deref(), Some("10"));
        let p: Profile = serde_json::from_str(r#"{"grade":"8"}"#).unwrap();
        assert_eq!(p.grade.as_deref(), Some("8"));
        assert!(!p.exists());
    }

    #[test]
    fn test_profile_display_name() {
        let p = Profile {
            name: Some("Thandi".into()),
            surname: Some("Mokoena".into()),
            ..Default::default()
        };
        assert_eq!(p.display_name("x"), "Thandi Mokoena");
        assert_eq!(Profile::default().display_name("a@b.c"), "a@b.c");
    }

    #[test]
    fn test_lesson_record_from_service() {
        let json = r#"{
            "lessonId": "L_1a2b3c4d",
            "email": "a@b.c",
            "topicId": "T_alg",
            "topicName": "Algebra",
            "subjectName": "Mathematics",
            "grade": "10",
            "status": "teaching",
            "history": [{"role":"ai","content":"Welcome"}],
            "quizScore": 80.0,
            "topicContext": "ignored"
        }"#;
        let r: LessonRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.short_id(), "1a2b3c4d");
        assert_eq!(r.status, LessonStatus::Active);
        let s = r.into_session();
        assert_eq!(s.id(), "L_1a2b3c4d");
        assert_eq!(s.title(), "Algebra");
        assert_eq!(s.quiz_score(), Some(80.0));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn test_lesson_record_requires_id() {
        assert!(serde_json::from_str::<LessonRecord>(r#"{"topicId":"T"}"#).is_err());
    }

    #[test]
    fn test_quiz_result_score_as_string() {
        let r: QuizResult = serde_json::from_str(r#"{"score":"85%","feedback":"Good"}"#).unwrap();
        assert_eq!(r.score, 85.0);
        assert_eq!(r.detailed_analysis, "");
    }

    #[test]
    fn test_quiz_result_missing_score_rejected() {
        assert!(serde_json::from_str::<QuizResult>(r#"{"feedback":"?"}"#).is_err());
    }

    #[test]
    fn test_chat_stream_request_omits_missing_image() {
        let req = ChatStreamRequest {
            message: "hi".into(),
            lesson_id: "L_1".into(),
            image: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"message": "hi", "lesson_id": "L_1"})
        );
    }

    #[test]
    fn test_generated_test_shape() {
        let json = r#"{
            "subject": "Physical Sciences",
            "questions": [{"id":"q1","question":"State $F=ma$","type":"open_ended","marks":10,"expectedAnswer":"..."}],
            "totalMarks": 30,
            "instructions": "Answer all questions."
        }"#;
        let t: GeneratedTest = serde_json::from_str(json).unwrap();
        assert_eq!(t.questions[0].kind.as_deref(), Some("open_ended"));
        assert_eq!(t.total_marks, Some(30.0));
    }

    #[test]
    fn test_curriculum_entry_keeps_extra_fields() {
        let e: CurriculumEntry = serde_json::from_str(
            r#"{"curriculumId":"C1","subjectName":"Life Sciences","grade":11,"term":"2"}"#,
        )
        .unwrap();
        assert_eq!(e.grade.as_deref(), Some("11"));
        assert_eq!(e.extra.get("term"), Some(&serde_json::json!("2")));
    }
}
