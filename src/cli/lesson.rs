// src/cli/lesson.rs — Interactive lesson REPL and recap

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use crate::client::schema::{QuizAnswers, QuizQuestion};
use crate::client::ImageUpload;
use crate::infra::config::Config;
use crate::infra::errors::TutorError;
use crate::lesson::{Action, ArtifactCache, LearnerContext, LessonController, Outcome};
use crate::render::view::{
    render_assessment_result, render_quiz, render_quiz_result, render_test,
};
use crate::transport::Transport;

/// How the REPL gets its lesson.
#[derive(Debug, Clone)]
pub enum Opening {
    Start(String),
    Resume(String),
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Image staged with `/image`, sent along with the next message.
#[derive(Default)]
struct ReplState {
    staged_image: Option<(String, ImageUpload)>,
}

pub fn build_controller(
    transport: Arc<dyn Transport>,
    config: &Config,
) -> anyhow::Result<LessonController> {
    let artifacts = if config.cache.ephemeral {
        ArtifactCache::in_memory()
    } else {
        ArtifactCache::on_disk(config.artifacts_dir())?
    };
    let learner = LearnerContext {
        email: config.learner.email.clone().unwrap_or_default(),
        grade: config.learner.grade.clone(),
        subject: config.learner.subject.clone(),
        topic_id: None,
    };
    Ok(LessonController::new(transport, learner, artifacts)
        .with_history_sync(config.lesson.sync_history))
}

/// Run the interactive lesson REPL.
pub async fn run_lesson(
    transport: Arc<dyn Transport>,
    config: &Config,
    opening: Opening,
) -> anyhow::Result<()> {
    let mut controller = build_controller(transport, config)?;
    let action = match opening {
        Opening::Start(topic_id) => Action::Start { topic_id },
        Opening::Resume(lesson_id) => Action::Resume { lesson_id },
    };
    controller.dispatch(action, &mut |_: &str| {}).await?;
    print_view(&controller);

    let mut state = ReplState::default();

    while let Some(input) = read_input("> ") {
        let trimmed = input.trim();

        if trimmed == "quit" || trimmed == "exit" {
            break;
        }

        if trimmed.starts_with('/') {
            if handle_slash_command(trimmed, &mut controller, &mut state, config).await
                == Flow::Quit
            {
                break;
            }
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        print!("Tutor: ");
        io::stdout().flush().ok();
        let result = send_message(&mut controller, &mut state, trimmed, &mut |delta: &str| {
            print!("{delta}");
            io::stdout().flush().ok();
        })
        .await;
        println!("\n");
        if let Err(e) = result {
            report(&e);
            if let Some((path, _)) = &state.staged_image {
                eprintln!("  {path} is still attached.");
            }
        }
    }

    if let Some(session) = controller.session() {
        eprintln!(
            "\nLesson {} left {}. Resume with `tutorlink resume {}`.",
            session.id(),
            session.status(),
            session.id()
        );
    }
    controller.dispatch(Action::Exit, &mut |_: &str| {}).await?;
    Ok(())
}

/// Print a lesson read-only, optionally writing its HTML view.
pub async fn run_recap(
    transport: Arc<dyn Transport>,
    config: &Config,
    lesson_id: &str,
    html: Option<&Path>,
) -> anyhow::Result<()> {
    let mut controller = build_controller(transport, config)?;
    controller
        .dispatch(
            Action::Recap {
                lesson_id: lesson_id.to_string(),
            },
            &mut |_: &str| {},
        )
        .await?;
    let view = controller
        .view()
        .ok_or_else(|| anyhow::anyhow!("lesson {lesson_id} could not be opened"))?;
    print!("{}", view.to_plain());
    if let Some(path) = html {
        std::fs::write(path, view.to_html())?;
        eprintln!("HTML written to {}", path.display());
    }
    Ok(())
}

/// Send one chat message with whatever image is staged. The image is only
/// dropped once the send succeeds.
async fn send_message(
    controller: &mut LessonController,
    state: &mut ReplState,
    text: &str,
    on_delta: &mut dyn FnMut(&str),
) -> Result<Outcome, TutorError> {
    let staged = state.staged_image.take();
    let image = staged.as_ref().map(|(_, img)| img.clone());
    let result = controller
        .dispatch(
            Action::Send {
                text: text.to_string(),
                image,
            },
            on_delta,
        )
        .await;
    if result.is_err() {
        state.staged_image = staged;
    }
    result
}

fn print_view(controller: &LessonController) {
    if let Some(view) = controller.view() {
        print!("{}", view.to_plain());
    }
}

fn report(e: &TutorError) {
    if e.is_user_facing() {
        eprintln!("[error] {}", e.user_message());
    } else {
        eprintln!("[error] {e} (run with -v for details)");
    }
}

fn read_input(prompt: &str) -> Option<String> {
    use std::io::BufRead;

    print!("{prompt}");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) => None, // EOF
        Ok(_) => Some(line),
        Err(_) => None,
    }
}

fn confirm(question: &str) -> bool {
    inquire::Confirm::new(question)
        .with_default(false)
        .prompt()
        .unwrap_or(false)
}

const SKIP_CHOICE: &str = "(skip)";

/// Select entries for one question: its options, then a skip entry.
fn quiz_choices(question: &QuizQuestion) -> Vec<String> {
    question
        .options
        .iter()
        .cloned()
        .chain(std::iter::once(SKIP_CHOICE.to_string()))
        .collect()
}

/// Index of the picked entry to the submitted answer; skip is unanswered (-1).
fn answer_for(picked: usize, options: usize) -> i64 {
    if picked < options {
        picked as i64
    } else {
        -1
    }
}

/// One select per question. `None` when the learner cancels.
fn prompt_answers(quiz: &[QuizQuestion]) -> Option<QuizAnswers> {
    let mut answers = QuizAnswers::new();
    for (idx, q) in quiz.iter().enumerate() {
        let message = format!("Q{}. {}", idx + 1, q.question);
        let picked = inquire::Select::new(&message, quiz_choices(q))
            .with_help_message("Esc abandons the quiz")
            .raw_prompt()
            .ok()?;
        answers.insert(q.id.clone(), answer_for(picked.index, q.options.len()));
    }
    Some(answers)
}

async fn handle_slash_command(
    input: &str,
    controller: &mut LessonController,
    state: &mut ReplState,
    config: &Config,
) -> Flow {
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/finish" => {
            if config.lesson.confirm_finish && !confirm("Finish this lesson?") {
                return Flow::Continue;
            }
            match controller.dispatch(Action::Finish, &mut |_: &str| {}).await {
                Ok(_) => {
                    if let Some(last) = controller.session().and_then(|s| s.history().last()) {
                        println!("Tutor: {}\n", last.content);
                    }
                    eprintln!("  Lesson finished. Try /quiz or /test.");
                }
                Err(e) => report(&e),
            }
        }

        "/quiz" => {
            let quiz = match controller.dispatch(Action::GenerateQuiz, &mut |_: &str| {}).await {
                Ok(Outcome::Quiz(quiz)) => quiz,
                Ok(_) => return Flow::Continue,
                Err(e) => {
                    report(&e);
                    return Flow::Continue;
                }
            };
            let lesson_id = controller.session().map(|s| s.id().to_string()).unwrap_or_default();
            println!("{}", render_quiz(&lesson_id, &quiz).plain);
            let Some(answers) = prompt_answers(&quiz) else {
                eprintln!("  Quiz abandoned. Run /quiz for a new one.");
                return Flow::Continue;
            };
            match controller
                .dispatch(Action::SubmitQuiz { answers }, &mut |_: &str| {})
                .await
            {
                Ok(Outcome::QuizGraded(result)) => println!("\n{}", render_quiz_result(&result).plain),
                Ok(_) => {}
                Err(e) => report(&e),
            }
        }

        "/test" => match controller.dispatch(Action::GenerateTest, &mut |_: &str| {}).await {
            Ok(Outcome::Test(test)) => println!("{}", render_test(&test).plain),
            Ok(_) => {}
            Err(e) => report(&e),
        },

        "/submit" => {
            let image = if arg.is_empty() {
                None
            } else {
                match ImageUpload::from_path(Path::new(arg)) {
                    Ok(img) => Some(img),
                    Err(e) => {
                        eprintln!("  Could not read {arg}: {e}");
                        return Flow::Continue;
                    }
                }
            };
            eprintln!("  Grading...");
            match controller
                .dispatch(Action::SubmitAssessment { image }, &mut |_: &str| {})
                .await
            {
                Ok(Outcome::Assessed(result)) => {
                    println!("{}", render_assessment_result(&result).plain)
                }
                Ok(_) => {}
                Err(e) => report(&e),
            }
        }

        "/image" => {
            if arg.is_empty() {
                if state.staged_image.take().is_some() {
                    eprintln!("  Image cleared.");
                } else {
                    eprintln!("  Usage: /image <path>");
                }
            } else {
                match ImageUpload::from_path(Path::new(arg)) {
                    Ok(img) => {
                        eprintln!("  {arg} will be sent with your next message.");
                        state.staged_image = Some((arg.to_string(), img));
                    }
                    Err(e) => eprintln!("  Could not read {arg}: {e}"),
                }
            }
        }

        "/view" => print_view(controller),

        "/quit" => return Flow::Quit,

        "/status" => match controller.session() {
            Some(session) => {
                eprintln!("  Lesson: {} | {}", session.id(), session.title());
                eprintln!(
                    "  Status: {} | {} message(s)",
                    session.status(),
                    session.history().len()
                );
                if let Some(q) = session.quiz_score() {
                    eprintln!("  Quiz score: {q:.1}%");
                }
                if let Some(a) = session.assessment_score() {
                    eprintln!("  Assessment score: {a:.1}%");
                }
                if let Some((path, _)) = &state.staged_image {
                    eprintln!("  Staged image: {path}");
                }
            }
            None => eprintln!("  No lesson is open."),
        },

        "/help" => {
            eprintln!("Slash commands:");
            eprintln!("  /finish            End the lesson (enables quiz and test)");
            eprintln!("  /quiz              Take a multiple-choice quiz");
            eprintln!("  /test              Get a written test to solve on paper");
            eprintln!("  /submit <image>    Submit a photo of your test workings");
            eprintln!("  /image [path]      Attach or clear an image for the next message");
            eprintln!("  /view              Show the whole conversation");
            eprintln!("  /status            Show lesson status and scores");
            eprintln!("  /help              Show this help");
            eprintln!("  /quit, quit, exit  Leave the lesson");
        }

        _ => {
            eprintln!("Unknown command: {}. Type /help for commands.", cmd);
        }
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str]) -> QuizQuestion {
        QuizQuestion {
            id: "q1".into(),
            question: "1/3 + 1/6?".into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: None,
        }
    }

    #[test]
    fn test_quiz_choices_end_with_skip() {
        let q = question(&["1/2", "2/9", "1/9"]);
        let choices = quiz_choices(&q);
        assert_eq!(choices, vec!["1/2", "2/9", "1/9", SKIP_CHOICE]);
        assert_eq!(answer_for(0, q.options.len()), 0);
        assert_eq!(answer_for(2, q.options.len()), 2);
        assert_eq!(answer_for(choices.len() - 1, q.options.len()), -1);
    }

    #[test]
    fn test_skip_only_question() {
        let q = question(&[]);
        assert_eq!(quiz_choices(&q), vec![SKIP_CHOICE]);
        assert_eq!(answer_for(0, 0), -1);
    }

    fn offline_controller() -> LessonController {
        use crate::transport::http::HttpTransport;

        let mut config = Config::default();
        config.cache.ephemeral = true;
        config.learner.email = Some("thandi@example.com".into());
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config).unwrap());
        build_controller(transport, &config).unwrap()
    }

    #[tokio::test]
    async fn test_failed_send_keeps_staged_image() {
        let mut controller = offline_controller();
        let mut state = ReplState {
            staged_image: Some(("work.jpg".into(), ImageUpload::new("image/jpeg", vec![0xFF, 0xD8]))),
        };

        // no lesson is open, so the send fails before any request
        let err = send_message(&mut controller, &mut state, "here is my working", &mut |_: &str| {})
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::NoLesson));
        let (path, image) = state.staged_image.as_ref().unwrap();
        assert_eq!(path, "work.jpg");
        assert_eq!(image.bytes, vec![0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_ignored_send_consumes_staged_image() {
        let mut controller = offline_controller();
        let mut state = ReplState {
            staged_image: Some(("work.jpg".into(), ImageUpload::new("image/jpeg", vec![1]))),
        };
        let outcome = send_message(&mut controller, &mut state, "   ", &mut |_: &str| {})
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(state.staged_image.is_none());
    }

    #[tokio::test]
    async fn test_quit_command_ends_repl() {
        let mut controller = offline_controller();
        let mut state = ReplState::default();
        let config = Config::default();
        assert_eq!(
            handle_slash_command("/quit", &mut controller, &mut state, &config).await,
            Flow::Quit
        );
        assert_eq!(
            handle_slash_command("/nope", &mut controller, &mut state, &config).await,
            Flow::Continue
        );
    }

    #[test]
    fn test_build_controller_ephemeral_cache() {
        let controller = offline_controller();
        assert_eq!(controller.learner().email, "thandi@example.com");
        assert!(controller.session().is_none());
    }
}
