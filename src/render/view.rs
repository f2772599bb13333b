// src/render/view.rs — Pure projections from lesson state to views
//
// Nothing here mutates or remembers anything: the same inputs always give
// the same view, so re-rendering never duplicates messages.

use std::fmt::Write as _;

use super::format::{escape_html, format_content};
use crate::client::schema::{
    AssessmentResult, GeneratedTest, LessonRecord, QuizQuestion, QuizResult, SubjectStat,
};
use crate::lesson::types::{LessonSession, LessonStatus, Role};

pub const RECAP_BANNER: &str = "This lesson is completed. You can review the history above.";
pub const PENDING_PLACEHOLDER: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Interactive,
    /// Read-only: never input, never appends.
    Recap,
}

/// Transient overlays that are not part of the session itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext<'a> {
    pub mode: RenderMode,
    /// Text streamed so far for the reply in flight.
    pub pending_reply: Option<&'a str>,
    /// Error or status line from the last action.
    pub notice: Option<&'a str>,
}

impl<'a> RenderContext<'a> {
    pub fn interactive() -> Self {
        Self::default()
    }

    pub fn recap() -> Self {
        Self {
            mode: RenderMode::Recap,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    History,
    Pending,
    Notice,
    Banner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub role: Role,
    pub kind: BubbleKind,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub input_enabled: bool,
    pub finish_enabled: bool,
    pub take_test: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView {
    pub lesson_id: String,
    pub title: String,
    pub subtitle: &'static str,
    pub status: LessonStatus,
    pub messages: Vec<RenderedMessage>,
    pub controls: Controls,
}

pub fn render(session: &LessonSession, ctx: &RenderContext<'_>) -> ConversationView {
    let interactive = ctx.mode == RenderMode::Interactive;
    let status = session.status();

    let mut messages: Vec<RenderedMessage> = session
        .history()
        .iter()
        .map(|m| RenderedMessage {
            role: m.role,
            kind: BubbleKind::History,
            html: format_content(&m.content),
            text: m.content.clone(),
        })
        .collect();

    if interactive {
        if let Some(partial) = ctx.pending_reply {
            let shown = if partial.is_empty() {
                PENDING_PLACEHOLDER
            } else {
                partial
            };
            messages.push(RenderedMessage {
                role: Role::Ai,
                kind: BubbleKind::Pending,
                html: escape_html(shown),
                text: shown.to_string(),
            });
        }
    }

    if let Some(notice) = ctx.notice {
        messages.push(RenderedMessage {
            role: Role::Ai,
            kind: BubbleKind::Notice,
            html: escape_html(notice),
            text: notice.to_string(),
        });
    }

    if !interactive {
        let banner = if status == LessonStatus::Completed {
            RECAP_BANNER.to_string()
        } else {
            format!("Read-only recap. This lesson is {status}.")
        };
        messages.push(RenderedMessage {
            role: Role::Ai,
            kind: BubbleKind::Banner,
            html: escape_html(&banner),
            text: banner,
        });
    }

    let chat_open = interactive && status.accepts_chat();
    ConversationView {
        lesson_id: session.id().to_string(),
        title: session.title().to_string(),
        subtitle: if interactive {
            "Active Session"
        } else {
            "Lesson Recap"
        },
        status,
        messages,
        controls: Controls {
            input_enabled: chat_open,
            finish_enabled: chat_open,
            take_test: status.offers_test(),
        },
    }
}

impl ConversationView {
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let id = escape_html(&self.lesson_id);
        let _ = writeln!(
            html,
            "<div class=\"chat-room\" data-lesson=\"{id}\" data-status=\"{}\">",
            self.status.as_str()
        );
        let _ = writeln!(
            html,
            "  <div class=\"chat-header\"><h4>{}</h4><span>{}</span>{}</div>",
            escape_html(&self.title),
            self.subtitle,
            if self.controls.finish_enabled {
                "<button class=\"finish\">FINISH</button>"
            } else {
                ""
            }
        );
        html.push_str("  <div class=\"chat-messages\">\n");
        for m in &self.messages {
            let class = match m.kind {
                BubbleKind::History => format!("message {}", m.role.as_str()),
                BubbleKind::Pending => "message ai pending".to_string(),
                BubbleKind::Notice => "message ai error".to_string(),
                BubbleKind::Banner => "message ai recap".to_string(),
            };
            let _ = writeln!(html, "    <div class=\"{class}\">{}</div>", m.html);
        }
        html.push_str("  </div>\n");
        if self.controls.input_enabled {
            html.push_str(
                "  <div class=\"chat-input-area\"><input type=\"text\" class=\"chat-input\" placeholder=\"Message...\"><button class=\"chat-send\">Send</button></div>\n",
            );
        }
        if self.controls.take_test {
            html.push_str(
                "  <div class=\"test-actions\"><button class=\"quiz\">TAKE QUIZ</button><button class=\"test\">TAKE TEST</button></div>\n",
            );
        }
        html.push_str("</div>\n");
        html
    }

    pub fn to_plain(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {} ({}) [{}] ==", self.title, self.subtitle, self.status);
        for m in &self.messages {
            let label = match (m.kind, m.role) {
                (BubbleKind::Notice, _) => "!",
                (BubbleKind::Banner, _) => "--",
                (_, Role::User) => "You:",
                (_, Role::Ai) => "Tutor:",
            };
            let _ = writeln!(out, "{label} {}\n", m.text.trim_end());
        }
        let mut hints = Vec::new();
        if self.controls.input_enabled {
            hints.push("type to chat");
        }
        if self.controls.finish_enabled {
            hints.push("/finish");
        }
        if self.controls.take_test {
            hints.push("/quiz");
            hints.push("/test");
        }
        if !hints.is_empty() {
            let _ = writeln!(out, "[{}]", hints.join(" | "));
        }
        out
    }
}

// ─── Auxiliary views ─────────────────────────────────────────────────────

/// A rendered view in both output flavours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub html: String,
    pub plain: String,
}

pub fn render_quiz(lesson_id: &str, quiz: &[QuizQuestion]) -> Panel {
    let mut html = format!(
        "<div class=\"message ai quiz-container\" id=\"quiz-{}\">\n<h3>Knowledge Check</h3>\n",
        escape_html(lesson_id)
    );
    let mut plain = String::from("Knowledge Check\n");
    for (idx, q) in quiz.iter().enumerate() {
        let name = escape_html(&q.id);
        let _ = writeln!(
            html,
            "<div class=\"quiz-question\"><p><strong>Q{}:</strong> {}</p>",
            idx + 1,
            format_content(&q.question)
        );
        let _ = writeln!(plain, "\nQ{}: {}", idx + 1, q.question);
        for (o_idx, opt) in q.options.iter().enumerate() {
            let _ = writeln!(
                html,
                "<label><input type=\"radio\" name=\"{name}\" value=\"{o_idx}\"> {}</label>",
                format_content(opt)
            );
            let _ = writeln!(plain, "  {}) {}", o_idx + 1, opt);
        }
        html.push_str("</div><hr>\n");
    }
    html.push_str("<button class=\"btn-primary\">Submit Quiz</button></div>\n");
    Panel { html, plain }
}

pub fn render_quiz_result(result: &QuizResult) -> Panel {
    let html = format!(
        "<div class=\"quiz-result\"><h3>Quiz Result: {}%</h3><p>{}</p><div class=\"analysis\">{}</div></div>\n",
        fmt_score(result.score),
        format_content(&result.feedback),
        format_content(&result.detailed_analysis)
    );
    let mut plain = format!("Quiz Result: {}%\n", fmt_score(result.score));
    if !result.feedback.is_empty() {
        let _ = writeln!(plain, "{}", result.feedback);
    }
    if !result.detailed_analysis.is_empty() {
        let _ = writeln!(plain, "\n{}", result.detailed_analysis);
    }
    Panel { html, plain }
}

pub fn render_test(test: &GeneratedTest) -> Panel {
    let mut html = String::from("<div class=\"assessment-view\">\n");
    let mut plain = String::new();
    if let Some(subject) = &test.subject {
        let _ = writeln!(html, "<h3>{} Assessment</h3>", escape_html(subject));
        let _ = writeln!(plain, "{subject} Assessment");
    }
    if let Some(instructions) = &test.instructions {
        let _ = writeln!(html, "<p class=\"instructions\">{}</p>", format_content(instructions));
        let _ = writeln!(plain, "{instructions}");
    }
    for (idx, q) in test.questions.iter().enumerate() {
        let marks = q.marks.map(|m| format!(" ({} marks)", fmt_score(m))).unwrap_or_default();
        let _ = writeln!(
            html,
            "<div class=\"question-box\"><p><strong>{}.</strong> {}{}</p></div>",
            idx + 1,
            format_content(&q.question),
            escape_html(&marks)
        );
        let _ = writeln!(plain, "\n{}. {}{}", idx + 1, q.question, marks);
    }
    if let Some(total) = test.total_marks {
        let _ = writeln!(html, "<p>Total: {} marks</p>", fmt_score(total));
        let _ = writeln!(plain, "\nTotal: {} marks", fmt_score(total));
    }
    html.push_str(
        "<p class=\"upload-hint\">Solve these on paper, take a photo, and upload it for grading.</p>\n</div>\n",
    );
    plain.push_str("\nSolve these on paper, take a photo, and submit it with /submit <image>.\n");
    Panel { html, plain }
}

pub fn render_assessment_result(result: &AssessmentResult) -> Panel {
    let mut html = format!(
        "<div class=\"grading-result\"><h3>Grade: {}%</h3><p class=\"text-dim\">{}</p>\n",
        fmt_score(result.score),
        format_content(&result.feedback)
    );
    let mut plain = format!("Grade: {}%\n", fmt_score(result.score));
    if let (Some(awarded), Some(total)) = (result.marks_awarded, result.total_marks) {
        let _ = writeln!(html, "<p>Marks: {} / {}</p>", fmt_score(awarded), fmt_score(total));
        let _ = writeln!(plain, "Marks: {} / {}", fmt_score(awarded), fmt_score(total));
    }
    if !result.feedback.is_empty() {
        let _ = writeln!(plain, "{}", result.feedback);
    }
    for q in &result.question_results {
        let marks = match (q.marks_awarded, q.marks_available) {
            (Some(a), Some(t)) => format!("{}/{}", fmt_score(a), fmt_score(t)),
            (Some(a), None) => fmt_score(a),
            _ => "-".to_string(),
        };
        let _ = writeln!(
            html,
            "<div class=\"question-result\"><strong>{}</strong> {}: {}</div>",
            escape_html(&q.question_id),
            escape_html(&marks),
            format_content(&q.feedback)
        );
        let _ = writeln!(plain, "  {} {}: {}", q.question_id, marks, q.feedback);
    }
    if !result.model_solution.is_empty() {
        let _ = writeln!(
            html,
            "<div class=\"stats-card\"><h4>Verified Solution</h4><div class=\"solution\">{}</div></div>",
            format_content(&result.model_solution)
        );
        let _ = writeln!(plain, "\nVerified solution:\n{}", result.model_solution);
    }
    html.push_str("</div>\n");
    Panel { html, plain }
}

pub fn render_lesson_list(topic_id: &str, lessons: &[LessonRecord]) -> Panel {
    let mut html = format!(
        "<div class=\"portal-header\"><h1>Topic: {}</h1></div>\n<div class=\"lesson-history-grid\">\n",
        escape_html(topic_id)
    );
    let mut plain = format!("Topic: {topic_id}\n");
    if lessons.is_empty() {
        html.push_str("<p class=\"text-dim\">No lessons found for this topic yet.</p>\n");
        plain.push_str("  No lessons yet. Start one with `tutorlink learn <topic>`.\n");
    }
    for l in lessons {
        let actions = if l.status == LessonStatus::Completed {
            "RECAP | TEST"
        } else {
            "RESUME"
        };
        let _ = writeln!(
            html,
            "<div class=\"lesson-card\" data-lesson=\"{}\"><h4>Lesson {}</h4><p>Status: {}</p><p>{}</p></div>",
            escape_html(&l.lesson_id),
            escape_html(l.short_id()),
            l.status.as_str(),
            actions
        );
        let _ = writeln!(
            plain,
            "  {:<14} {:<12} {}",
            l.lesson_id,
            l.status.as_str(),
            actions
        );
    }
    html.push_str("</div>\n");
    Panel { html, plain }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Critical,
    Good,
}

/// Averages below 50% need attention.
pub fn standing(average: f64) -> Standing {
    if average < 50.0 {
        Standing::Critical
    } else {
        Standing::Good
    }
}

pub fn render_stats(stats: &[SubjectStat]) -> Panel {
    let mut html = String::from("<div class=\"critical-cards\">\n");
    let mut plain = String::new();
    if stats.is_empty() {
        plain.push_str("No scores yet.\n");
    }
    for s in stats {
        let avg = s.average.unwrap_or(0.0);
        let class = match standing(avg) {
            Standing::Critical => "critical",
            Standing::Good => "good",
        };
        let _ = writeln!(
            html,
            "<div class=\"card\"><h4>{}</h4><span class=\"card-score {class}\">{}%</span></div>",
            escape_html(&s.subject_name),
            fmt_score(avg)
        );
        let _ = writeln!(plain, "  {:<28} {:>6}%  {class}", s.subject_name, fmt_score(avg));
    }
    html.push_str("</div>\n");
    Panel { html, plain }
}

/// `85` rather than `85.0`, one decimal otherwise.
pub fn fmt_score(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::types::Message;
    use pretty_assertions::assert_eq;

    fn session(status: LessonStatus) -> LessonSession {
        LessonSession::restore(
            "L_1",
            "Algebra",
            status,
            vec![Message::ai("Welcome"), Message::user("what is <b>?")],
        )
    }

    #[test]
    fn test_controls_by_state() {
        let ctx = RenderContext::interactive();
        let active = render(&session(LessonStatus::Active), &ctx).controls;
        assert_eq!(
            active,
            Controls {
                input_enabled: true,
                finish_enabled: true,
                take_test: false
            }
        );
        let finished = render(&session(LessonStatus::Finished), &ctx).controls;
        assert!(!finished.input_enabled);
        assert!(finished.take_test);
        let completed = render(&session(LessonStatus::Completed), &ctx).controls;
        assert!(completed.take_test);
        assert!(!completed.finish_enabled);
    }

    #[test]
    fn test_recap_never_enables_input() {
        let v = render(&session(LessonStatus::Active), &RenderContext::recap());
        assert!(!v.controls.input_enabled);
        assert!(!v.controls.finish_enabled);
        assert_eq!(v.subtitle, "Lesson Recap");
        assert!(!v.to_html().contains("chat-input"));
    }

    #[test]
    fn test_recap_rendering_is_idempotent() {
        let s = session(LessonStatus::Completed);
        let first = render(&s, &RenderContext::recap());
        let second = render(&s, &RenderContext::recap());
        assert_eq!(first, second);
        assert_eq!(first.to_html(), second.to_html());
        // history + banner, nothing duplicated
        assert_eq!(first.messages.len(), 3);
        assert_eq!(first.to_html().matches("class=\"message ").count(), 3);
        assert_eq!(first.messages[2].text, RECAP_BANNER);
    }

    #[test]
    fn test_history_is_escaped() {
        let v = render(&session(LessonStatus::Active), &RenderContext::interactive());
        assert_eq!(v.messages[1].html, "what is &lt;b&gt;?");
        assert!(v.to_html().contains("<div class=\"message user\">what is &lt;b&gt;?</div>"));
    }

    #[test]
    fn test_pending_reply_placeholder_and_text() {
        let s = session(LessonStatus::Active);
        let ctx = RenderContext {
            pending_reply: Some(""),
            ..RenderContext::interactive()
        };
        let v = render(&s, &ctx);
        assert_eq!(v.messages.last().unwrap().text, PENDING_PLACEHOLDER);

        let ctx = RenderContext {
            pending_reply: Some("Hel"),
            ..RenderContext::interactive()
        };
        let v = render(&s, &ctx);
        assert_eq!(v.messages.last().unwrap().kind, BubbleKind::Pending);
        assert_eq!(v.messages.last().unwrap().text, "Hel");
        assert_eq!(v.messages.len(), 3);
    }

    #[test]
    fn test_notice_rendered_as_error_bubble() {
        let ctx = RenderContext {
            notice: Some("Error: quota exceeded"),
            ..RenderContext::interactive()
        };
        let html = render(&session(LessonStatus::Active), &ctx).to_html();
        assert!(html.contains("<div class=\"message ai error\">Error: quota exceeded</div>"));
    }

    #[test]
    fn test_plain_output() {
        let v = render(&session(LessonStatus::Finished), &RenderContext::interactive());
        let plain = v.to_plain();
        assert!(plain.starts_with("== Algebra (Active Session) [finished] =="));
        assert!(plain.contains("Tutor: Welcome"));
        assert!(plain.contains("You: what is <b>?"));
        assert!(plain.contains("[/quiz | /test]"));
    }

    #[test]
    fn test_quiz_panel() {
        let quiz = vec![QuizQuestion {
            id: "q1".into(),
            question: "Solve $x+1=2$".into(),
            options: vec!["x=1".into(), "x<2".into()],
            correct_answer: None,
        }];
        let p = render_quiz("L_1", &quiz);
        assert!(p.html.contains("id=\"quiz-L_1\""));
        assert!(p.html.contains("Solve $x+1=2$"));
        assert!(p.html.contains("x&lt;2"));
        assert!(p.plain.contains("Q1: Solve $x+1=2$"));
        assert!(p.plain.contains("  2) x<2"));
    }

    #[test]
    fn test_stats_standing() {
        assert_eq!(standing(49.9), Standing::Critical);
        assert_eq!(standing(50.0), Standing::Good);
        let p = render_stats(&[
            SubjectStat {
                subject_name: "Mathematics".into(),
                average: Some(42.5),
            },
            SubjectStat {
                subject_name: "History".into(),
                average: Some(80.0),
            },
        ]);
        assert!(p.html.contains("card-score critical\">42.5%"));
        assert!(p.html.contains("card-score good\">80%"));
    }

    #[test]
    fn test_lesson_list_actions() {
        let lessons = vec![
            LessonRecord {
                lesson_id: "L_aa".into(),
                topic_id: "T".into(),
                status: LessonStatus::Completed,
                ..Default::default()
            },
            LessonRecord {
                lesson_id: "L_bb".into(),
                topic_id: "T".into(),
                status: LessonStatus::Active,
                ..Default::default()
            },
        ];
        let p = render_lesson_list("T", &lessons);
        assert!(p.plain.contains("L_aa"));
        assert!(p.plain.contains("RECAP | TEST"));
        assert!(p.plain.contains("RESUME"));
        assert!(p.html.contains("<h4>Lesson aa</h4>"));
    }

    #[test]
    fn test_fmt_score() {
        assert_eq!(fmt_score(85.0), "85");
        assert_eq!(fmt_score(72.4), "72.4");
    }
}
