// src/lesson/mod.rs — Lesson sessions: state machine, artifacts, controller

pub mod artifacts;
pub mod controller;
pub mod state;
pub mod types;

pub use artifacts::ArtifactCache;
pub use controller::{Action, LearnerContext, LessonController, Outcome};
pub use types::{LessonSession, LessonStatus, Message, Role};
