// src/cli/catalog.rs — One-shot profile, curriculum and progress commands

use crate::client::schema::{EnrollRequest, NewTopic, ProfileUpdate};
use crate::client::RestClient;
use crate::infra::config::Config;
use crate::render::view::{render_lesson_list, render_stats};

use super::DEFAULT_CURRICULUM;

pub async fn show_profile(rest: &RestClient, email: &str) -> anyhow::Result<()> {
    let profile = rest.get_profile(email).await?;
    if !profile.exists() {
        println!("No profile for {email} yet. Create one with `tutorlink profile-set`.");
        return Ok(());
    }

    println!("{}", profile.display_name(email));
    println!();
    println!("  Email:       {email}");
    println!("  Grade:       {}", profile.grade.as_deref().unwrap_or("(not set)"));
    println!(
        "  Curriculum:  {}",
        profile.curriculum.as_deref().unwrap_or("(not set)")
    );
    if profile.subjects.is_empty() {
        println!("  Subjects:    (none enrolled)");
    } else {
        println!("  Subjects:    {}", profile.subjects.join(", "));
    }
    Ok(())
}

pub async fn set_profile(rest: &RestClient, update: &ProfileUpdate) -> anyhow::Result<()> {
    let ack = rest.update_profile(update).await?;
    println!("{}", ack.message.as_deref().unwrap_or("Profile saved."));
    Ok(())
}

/// Flag, then the learner's profile, then the default.
pub async fn resolve_curriculum(
    rest: &RestClient,
    config: &Config,
    explicit: Option<String>,
) -> String {
    if let Some(c) = explicit.filter(|c| !c.trim().is_empty()) {
        return c;
    }
    if let Ok(email) = config.require_email() {
        match rest.get_profile(email).await {
            Ok(profile) => {
                if let Some(c) = profile.curriculum.filter(|c| !c.is_empty()) {
                    return c;
                }
            }
            Err(e) => tracing::debug!("profile lookup for curriculum failed: {e}"),
        }
    }
    DEFAULT_CURRICULUM.to_string()
}

pub async fn list_subjects(rest: &RestClient, curriculum: &str) -> anyhow::Result<()> {
    let subjects = rest.list_subjects(curriculum).await?;
    if subjects.is_empty() {
        println!("No subjects for curriculum {curriculum}.");
        return Ok(());
    }
    println!("Subjects ({curriculum}):");
    for s in &subjects {
        let learners = s
            .student_count
            .map(|n| format!(" | {n:.0} learners"))
            .unwrap_or_default();
        println!("  {}{}", s.subject_name, learners);
        if let Some(desc) = s.description.as_deref().filter(|d| !d.is_empty()) {
            println!("    {desc}");
        }
    }
    Ok(())
}

pub async fn show_subject(rest: &RestClient, curriculum: &str, name: &str) -> anyhow::Result<()> {
    let subject = rest.subject_details(curriculum, name).await?;
    println!("{} ({})", subject.subject_name, curriculum);
    if let Some(desc) = subject.description.as_deref() {
        println!("  {desc}");
    }
    println!();
    if subject.topics.is_empty() {
        println!("  No topics yet. Add one with `tutorlink add-topic`.");
        return Ok(());
    }
    for t in &subject.topics {
        println!(
            "  [term {}] {}{}",
            t.term.as_deref().unwrap_or("?"),
            t.topic_name.as_deref().unwrap_or("(untitled)"),
            t.id.as_deref().map(|id| format!("  ({id})")).unwrap_or_default(),
        );
    }
    Ok(())
}

pub async fn enroll(
    rest: &RestClient,
    email: &str,
    subject: &str,
    curriculum: &str,
) -> anyhow::Result<()> {
    let ack = rest
        .enroll(&EnrollRequest {
            email: email.to_string(),
            subject_name: subject.to_string(),
            curriculum: curriculum.to_string(),
        })
        .await?;
    println!(
        "{}",
        ack.message
            .unwrap_or_else(|| format!("Enrolled in {subject}."))
    );
    Ok(())
}

pub async fn list_grades(rest: &RestClient) -> anyhow::Result<()> {
    let grades = rest.list_grades().await?;
    if grades.is_empty() {
        println!("No grades found.");
    } else {
        println!("Grades: {}", grades.join(", "));
    }
    Ok(())
}

pub async fn show_curriculum(rest: &RestClient, grade: &str) -> anyhow::Result<()> {
    let entries = rest.curriculum_for_grade(grade).await?;
    if entries.is_empty() {
        println!("No curriculum entries for grade {grade}.");
        return Ok(());
    }
    println!("Curriculum for grade {grade}:");
    for e in &entries {
        println!(
            "  {:<24} {}",
            e.subject_name.as_deref().unwrap_or("(unnamed)"),
            e.curriculum_id.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

pub async fn list_topics(rest: &RestClient, curriculum_id: &str) -> anyhow::Result<()> {
    let mut topics = rest.curriculum_topics(curriculum_id).await?;
    topics.sort_by(|a, b| {
        a.order_index
            .unwrap_or(f64::MAX)
            .total_cmp(&b.order_index.unwrap_or(f64::MAX))
    });
    if topics.is_empty() {
        println!("No topics for {curriculum_id}.");
        return Ok(());
    }
    for t in &topics {
        println!(
            "  {:<28} {}",
            t.topic_id.as_deref().unwrap_or("-"),
            t.topic_name.as_deref().unwrap_or("(untitled)"),
        );
    }
    Ok(())
}

pub async fn add_topic(rest: &RestClient, topic: &NewTopic) -> anyhow::Result<()> {
    if topic.topic_name.trim().is_empty() {
        anyhow::bail!("topic name must not be empty");
    }
    let ack = rest.add_topic(topic).await?;
    println!("{}", ack.message.as_deref().unwrap_or("Topic added."));
    Ok(())
}

pub async fn list_lessons(rest: &RestClient, email: &str, topic_id: &str) -> anyhow::Result<()> {
    let lessons = rest.list_lessons(email, topic_id).await?;
    print!("{}", render_lesson_list(topic_id, &lessons).plain);
    Ok(())
}

pub async fn show_stats(rest: &RestClient, email: &str) -> anyhow::Result<()> {
    let stats = rest.stats(email).await?;
    print!("{}", render_stats(&stats).plain);
    Ok(())
}
