// src/store/mod.rs

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        achievement::{Achievement, EarnedAchievement},
        attempt::{QuizAttempt, QuizScore},
        progress::CourseProgress,
        quiz::Quiz,
    },
};

pub use memory::MemoryProgressStore;
pub use postgres::PgProgressStore;

/// Durable per-student persistence boundary for quiz attempts, course
/// progress and achievements.
///
/// Every method is a potential suspension point. A crash between "transition
/// applied in memory" and "write acknowledged" is tolerated by re-deriving
/// from the last durable state on the next `start`, which is why the quiz
/// handlers always re-check this gateway instead of trusting a local cache.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Quiz content, read-only.
    async fn load_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError>;

    /// The active (non-completed) attempt for (student, quiz), if any.
    /// "No attempt" stays distinguishable from "in progress, empty".
    async fn load_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<Option<QuizAttempt>, AppError>;

    /// Whether the student already has a completed attempt on record.
    async fn has_completed_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<bool, AppError>;

    /// Get-or-create: ensures an in-progress attempt row exists for the pair.
    async fn open_attempt(&self, student_id: i64, quiz_id: i64) -> Result<(), AppError>;

    /// Pause path: persists status=paused together with the answer map and
    /// cursor. This write is the recovery point for a later resume.
    async fn save_attempt_progress(
        &self,
        student_id: i64,
        quiz_id: i64,
        answers: &HashMap<usize, usize>,
        current_question_index: usize,
    ) -> Result<(), AppError>;

    /// Submit path: marks the attempt completed with its final score.
    /// Idempotent upsert keyed on (student, quiz).
    async fn save_attempt_completed(
        &self,
        student_id: i64,
        quiz_id: i64,
        answers: &HashMap<usize, usize>,
        score: &QuizScore,
    ) -> Result<(), AppError>;

    /// Downstream grade notification for reporting. Failures here must never
    /// roll back a completion that is already recorded.
    async fn record_final_grade(
        &self,
        student_id: i64,
        quiz_id: i64,
        score: &QuizScore,
    ) -> Result<(), AppError>;

    async fn load_course_progress(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<CourseProgress>, AppError>;

    /// Conditional increment: sets completed_lessons_count = expected + 1
    /// only if the stored count still equals `expected`. Returns whether the
    /// update applied; `false` means a concurrent or duplicate call won, so
    /// two calls for the same lesson can never both succeed.
    async fn complete_lesson_cas(
        &self,
        student_id: i64,
        course_id: i64,
        expected_count: i64,
        total_lessons: i64,
    ) -> Result<bool, AppError>;

    async fn load_achievement_catalog(&self) -> Result<Vec<Achievement>, AppError>;

    async fn load_earned_achievements(
        &self,
        student_id: i64,
    ) -> Result<Vec<EarnedAchievement>, AppError>;

    /// Records the grant at most once per (student, achievement). A redundant
    /// grant is reported as `false`, never surfaced as an error.
    async fn grant_achievement(
        &self,
        student_id: i64,
        achievement_id: i64,
    ) -> Result<bool, AppError>;
}
