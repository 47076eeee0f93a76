//! Validation errors raised by the aggregation engine.
//!
//! Every variant names the record that failed so the caller can point at
//! the bad row. Orphaned references are not errors; they are skipped.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("duplicate attendance mark for lesson {lesson_id}, student {student_id}")]
    DuplicateMark {
        lesson_id: String,
        student_id: String,
    },

    #[error("assignment {assignment_id} has invalid max score {max_score}")]
    InvalidMaxScore { assignment_id: String, max_score: f64 },

    #[error("checked submission for assignment {assignment_id}, student {student_id} has no score")]
    MissingScore {
        assignment_id: String,
        student_id: String,
    },

    #[error("submission for assignment {assignment_id}, student {student_id} has score {score} outside 0..={max_score}")]
    ScoreOutOfRange {
        assignment_id: String,
        student_id: String,
        score: f64,
        max_score: f64,
    },

    #[error("duplicate submission for assignment {assignment_id}, student {student_id}")]
    DuplicateSubmission {
        assignment_id: String,
        student_id: String,
    },

    #[error("answer to question {question_id} in response {response_id} has value {value} outside 0..=10")]
    AnswerOutOfRange {
        response_id: String,
        question_id: String,
        value: i32,
    },

    #[error("duplicate answer to question {question_id} in response {response_id}")]
    DuplicateAnswer {
        response_id: String,
        question_id: String,
    },
}

pub type Result<T> = std::result::Result<T, ValidationError>;
