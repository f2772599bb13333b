// src/cli/mod.rs — CLI definition (clap derive)

pub mod catalog;
pub mod lesson;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::client::schema::{NewTopic, ProfileUpdate};
use crate::client::RestClient;
use crate::infra::config::Config;
use crate::transport::http::HttpTransport;
use crate::transport::Transport;

/// Curriculum assumed when neither the flag nor the profile names one.
pub const DEFAULT_CURRICULUM: &str = "CAPS";

#[derive(Parser)]
#[command(name = "tutorlink", about = "Terminal client for the AI tutoring service", version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Learner email (overrides config and TUTORLINK_EMAIL)
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Show the learner profile
    Profile,
    /// Create or update the learner profile
    ProfileSet {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        grade: Option<String>,
        #[arg(long)]
        curriculum: Option<String>,
    },
    /// List subjects offered by a curriculum
    Subjects {
        #[arg(long)]
        curriculum: Option<String>,
    },
    /// Show one subject and its topics
    Subject {
        name: String,
        #[arg(long)]
        curriculum: Option<String>,
    },
    /// Enroll in a subject
    Enroll {
        subject: String,
        #[arg(long)]
        curriculum: Option<String>,
    },
    /// List known grades
    Grades,
    /// Curriculum entries for a grade (defaults to the learner's grade)
    Curriculum { grade: Option<String> },
    /// Topics of one curriculum entry
    Topics { curriculum_id: String },
    /// Add a topic to a subject
    AddTopic {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "1")]
        term: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        curriculum: Option<String>,
    },
    /// Past lessons for a topic
    Lessons { topic_id: String },
    /// Start a new lesson on a topic
    Learn { topic_id: String },
    /// Continue an existing lesson
    Resume { lesson_id: String },
    /// Read-only view of a lesson
    Recap {
        lesson_id: String,
        /// Also write the conversation as HTML
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Average scores per subject
    Stats,
}

/// Run one command against the configured services.
pub async fn dispatch(command: Commands, config: &Config) -> anyhow::Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(config)?);
    let rest = RestClient::new(transport.clone());

    match command {
        Commands::Profile => catalog::show_profile(&rest, config.require_email()?).await,
        Commands::ProfileSet {
            name,
            surname,
            grade,
            curriculum,
        } => {
            let update = ProfileUpdate {
                email: config.require_email()?.to_string(),
                name,
                surname,
                grade,
                curriculum,
            };
            catalog::set_profile(&rest, &update).await
        }
        Commands::Subjects { curriculum } => {
            let curriculum = catalog::resolve_curriculum(&rest, config, curriculum).await;
            catalog::list_subjects(&rest, &curriculum).await
        }
        Commands::Subject { name, curriculum } => {
            let curriculum = catalog::resolve_curriculum(&rest, config, curriculum).await;
            catalog::show_subject(&rest, &curriculum, &name).await
        }
        Commands::Enroll {
            subject,
            curriculum,
        } => {
            let email = config.require_email()?;
            let curriculum = catalog::resolve_curriculum(&rest, config, curriculum).await;
            catalog::enroll(&rest, email, &subject, &curriculum).await
        }
        Commands::Grades => catalog::list_grades(&rest).await,
        Commands::Curriculum { grade } => {
            let grade = grade.or_else(|| config.learner.grade.clone()).ok_or_else(|| {
                anyhow::anyhow!("no grade given. Pass one or set learner.grade")
            })?;
            catalog::show_curriculum(&rest, &grade).await
        }
        Commands::Topics { curriculum_id } => catalog::list_topics(&rest, &curriculum_id).await,
        Commands::AddTopic {
            subject,
            name,
            term,
            description,
            curriculum,
        } => {
            let curriculum = catalog::resolve_curriculum(&rest, config, curriculum).await;
            let topic = NewTopic {
                curriculum,
                subject_name: subject,
                term,
                topic_name: name,
                description,
            };
            catalog::add_topic(&rest, &topic).await
        }
        Commands::Lessons { topic_id } => {
            catalog::list_lessons(&rest, config.require_email()?, &topic_id).await
        }
        Commands::Stats => catalog::show_stats(&rest, config.require_email()?).await,
        Commands::Learn { topic_id } => {
            config.require_email()?;
            lesson::run_lesson(transport, config, lesson::Opening::Start(topic_id)).await
        }
        Commands::Resume { lesson_id } => {
            lesson::run_lesson(transport, config, lesson::Opening::Resume(lesson_id)).await
        }
        Commands::Recap { lesson_id, html } => {
            lesson::run_recap(transport, config, &lesson_id, html.as_deref()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_recap_with_html() {
        let cli = Cli::try_parse_from(["tutorlink", "recap", "L_1", "--html", "out.html"]).unwrap();
        match cli.command {
            Commands::Recap { lesson_id, html } => {
                assert_eq!(lesson_id, "L_1");
                assert_eq!(html, Some(PathBuf::from("out.html")));
            }
            _ => panic!("expected recap"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["tutorlink", "learn", "T1", "--email", "a@b.c", "-vv"]).unwrap();
        assert_eq!(cli.email.as_deref(), Some("a@b.c"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_add_topic_defaults() {
        let cli = Cli::try_parse_from([
            "tutorlink",
            "add-topic",
            "--subject",
            "Mathematics",
            "--name",
            "Fractions",
        ])
        .unwrap();
        match cli.command {
            Commands::AddTopic { term, description, curriculum, .. } => {
                assert_eq!(term, "1");
                assert_eq!(description, "");
                assert!(curriculum.is_none());
            }
            _ => panic!("expected add-topic"),
        }
    }
}
