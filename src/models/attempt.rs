// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::quiz::PresentedQuestionView;

/// Lifecycle of a quiz attempt. `Completed` is terminal: answers and score
/// are frozen, and a retake (if allowed) is a new record, not a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Paused,
    Completed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Paused => "paused",
            AttemptStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(AttemptStatus::InProgress),
            "paused" => Some(AttemptStatus::Paused),
            "completed" => Some(AttemptStatus::Completed),
            _ => None,
        }
    }
}

/// Final grade of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct_count: i64,
    pub total_questions: i64,
    /// Rounded percentage in [0, 100].
    pub percentage: i64,
}

/// One student's attempt at one quiz, as persisted through the progress store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub student_id: i64,
    pub quiz_id: i64,
    pub status: AttemptStatus,

    /// Sparse map: question index -> chosen option index.
    /// Unanswered questions are simply absent.
    pub answers: HashMap<usize, usize>,

    /// Cursor for resuming where the student left off.
    pub current_question_index: usize,

    /// Set exactly once, on completion.
    pub score: Option<QuizScore>,

    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Cursor navigation. Moving past either end is clamped, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Previous,
}

/// DTO for recording an answer choice.
#[derive(Debug, Deserialize)]
pub struct SelectAnswerRequest {
    pub question_index: usize,
    pub option_index: usize,
}

/// DTO for moving the question cursor.
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub direction: Direction,
}

/// Client view of a live session. Correct indices stay server-side.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub quiz_id: i64,
    pub title: String,
    pub status: AttemptStatus,
    pub current_question_index: usize,
    pub total_questions: usize,
    pub answers: HashMap<usize, usize>,
    pub questions: Vec<PresentedQuestionView>,
    pub score: Option<QuizScore>,
}

/// Per-category tally derived after completion; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTally {
    pub correct: i64,
    pub total: i64,
}
