// src/models/quiz.rs

use serde::{Deserialize, Serialize};

/// Immutable quiz content as authored.
/// Each question has exactly one correct answer plus any number of distractors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,

    pub correct_answer: String,

    /// Wrong options, stored as a JSON array alongside the question.
    pub distractors: Vec<String>,

    /// Optional reporting tag (e.g. "reading", "numbers").
    /// Feeds the post-completion category breakdown only.
    pub category: Option<String>,
}

/// A question as shown to the student: correct answer and distractors merged
/// into one deterministically ordered option list. Derived once per session
/// and re-derived identically on every resume, so option indices stored in
/// the answer map keep pointing at the same texts after a reload.
#[derive(Debug, Clone)]
pub struct PresentedQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub category: Option<String>,
}

/// DTO for sending a presented question to the client (hides `correct_index`).
#[derive(Debug, Serialize)]
pub struct PresentedQuestionView {
    pub prompt: String,
    pub options: Vec<String>,
    pub category: Option<String>,
}

impl PresentedQuestion {
    pub fn view(&self) -> PresentedQuestionView {
        PresentedQuestionView {
            prompt: self.prompt.clone(),
            options: self.options.clone(),
            category: self.category.clone(),
        }
    }
}
