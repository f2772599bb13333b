// src/lesson/state.rs — Lesson lifecycle transitions
//
//   not_started --start--> active --finish--> finished --grade--> completed
//                          active --exchange--> active
//                                                completed --grade--> completed
//
// `finished` is a mandatory gate: grading an active lesson is rejected.

use super::types::LessonStatus;
use crate::infra::errors::TutorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Exchange,
    Finish,
    Grade,
}

impl Transition {
    pub fn verb(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Exchange => "chat in",
            Transition::Finish => "finish",
            Transition::Grade => "grade",
        }
    }
}

pub fn next(from: LessonStatus, transition: Transition) -> Result<LessonStatus, TutorError> {
    use LessonStatus::*;
    use Transition::*;

    match (from, transition) {
        (NotStarted, Start) => Ok(Active),
        (Active, Exchange) => Ok(Active),
        (Active, Finish) => Ok(Finished),
        (Finished | Completed, Grade) => Ok(Completed),
        _ => Err(TutorError::InvalidTransition {
            from,
            action: transition.verb(),
        }),
    }
}
