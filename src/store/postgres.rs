// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use crate::{
    error::AppError,
    models::{
        achievement::{Achievement, BadgeTier, EarnedAchievement},
        attempt::{AttemptStatus, QuizAttempt, QuizScore},
        progress::{CourseProgress, CourseStatus},
        quiz::{Quiz, QuizQuestion},
    },
    store::ProgressStore,
};

/// Postgres-backed gateway. Queries are runtime-checked (no compile-time
/// database connection needed) and keyed the way the tables are: attempts on
/// (student_id, quiz_id) with a partial unique index over non-completed rows,
/// course progress on its (student_id, course_id) primary key.
pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct QuizRow {
    id: i64,
    title: String,
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    prompt: String,
    correct_answer: String,
    distractors: Json<Vec<String>>,
    category: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    student_id: i64,
    quiz_id: i64,
    status: String,
    answers: Json<HashMap<usize, usize>>,
    current_question_index: i64,
    correct_count: Option<i64>,
    total_questions: Option<i64>,
    percentage: Option<i64>,
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AttemptRow {
    fn into_attempt(self) -> Result<QuizAttempt, AppError> {
        let status = AttemptStatus::parse(&self.status).ok_or_else(|| {
            AppError::InternalServerError(format!("Unknown attempt status '{}'", self.status))
        })?;

        let score = match (self.correct_count, self.total_questions, self.percentage) {
            (Some(correct_count), Some(total_questions), Some(percentage)) => Some(QuizScore {
                correct_count,
                total_questions,
                percentage,
            }),
            _ => None,
        };

        Ok(QuizAttempt {
            student_id: self.student_id,
            quiz_id: self.quiz_id,
            status,
            answers: self.answers.0,
            current_question_index: self.current_question_index.max(0) as usize,
            score,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    student_id: i64,
    course_id: i64,
    completed_lessons_count: i64,
    total_lessons: i64,
    status: String,
}

#[derive(sqlx::FromRow)]
struct AchievementRow {
    id: i64,
    title: String,
    description: String,
    tier: String,
}

#[derive(sqlx::FromRow)]
struct EarnedRow {
    student_id: i64,
    achievement_id: i64,
    earned_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn load_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz_row: Option<QuizRow> =
            sqlx::query_as("SELECT id, title FROM quizzes WHERE id = $1")
                .bind(quiz_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(quiz_row) = quiz_row else {
            return Ok(None);
        };

        let question_rows: Vec<QuestionRow> = sqlx::query_as(
            "SELECT prompt, correct_answer, distractors, category
             FROM quiz_questions
             WHERE quiz_id = $1
             ORDER BY position",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let questions = question_rows
            .into_iter()
            .map(|row| QuizQuestion {
                prompt: row.prompt,
                correct_answer: row.correct_answer,
                distractors: row.distractors.0,
                category: row.category,
            })
            .collect();

        Ok(Some(Quiz {
            id: quiz_row.id,
            title: quiz_row.title,
            questions,
        }))
    }

    async fn load_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let row: Option<AttemptRow> = sqlx::query_as(
            "SELECT student_id, quiz_id, status, answers, current_question_index,
                    correct_count, total_questions, percentage, updated_at
             FROM quiz_attempts
             WHERE student_id = $1 AND quiz_id = $2 AND status <> 'completed'",
        )
        .bind(student_id)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AttemptRow::into_attempt).transpose()
    }

    async fn has_completed_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_attempts
             WHERE student_id = $1 AND quiz_id = $2 AND status = 'completed'",
        )
        .bind(student_id)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn open_attempt(&self, student_id: i64, quiz_id: i64) -> Result<(), AppError> {
        // No-op when an active attempt already exists (partial unique index).
        sqlx::query(
            "INSERT INTO quiz_attempts (student_id, quiz_id, status)
             VALUES ($1, $2, 'in_progress')
             ON CONFLICT (student_id, quiz_id) WHERE status <> 'completed' DO NOTHING",
        )
        .bind(student_id)
        .bind(quiz_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_attempt_progress(
        &self,
        student_id: i64,
        quiz_id: i64,
        answers: &HashMap<usize, usize>,
        current_question_index: usize,
    ) -> Result<(), AppError> {
        let updated = sqlx::query(
            "UPDATE quiz_attempts
             SET status = 'paused', answers = $3, current_question_index = $4, updated_at = NOW()
             WHERE student_id = $1 AND quiz_id = $2 AND status <> 'completed'",
        )
        .bind(student_id)
        .bind(quiz_id)
        .bind(Json(answers))
        .bind(current_question_index as i64)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            // The active row went missing (e.g. cleanup); recreate it paused.
            sqlx::query(
                "INSERT INTO quiz_attempts
                     (student_id, quiz_id, status, answers, current_question_index)
                 VALUES ($1, $2, 'paused', $3, $4)",
            )
            .bind(student_id)
            .bind(quiz_id)
            .bind(Json(answers))
            .bind(current_question_index as i64)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn save_attempt_completed(
        &self,
        student_id: i64,
        quiz_id: i64,
        answers: &HashMap<usize, usize>,
        score: &QuizScore,
    ) -> Result<(), AppError> {
        let updated = sqlx::query(
            "UPDATE quiz_attempts
             SET status = 'completed', answers = $3, correct_count = $4,
                 total_questions = $5, percentage = $6, updated_at = NOW()
             WHERE student_id = $1 AND quiz_id = $2 AND status <> 'completed'",
        )
        .bind(student_id)
        .bind(quiz_id)
        .bind(Json(answers))
        .bind(score.correct_count)
        .bind(score.total_questions)
        .bind(score.percentage)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO quiz_attempts
                     (student_id, quiz_id, status, answers, correct_count,
                      total_questions, percentage)
                 VALUES ($1, $2, 'completed', $3, $4, $5, $6)",
            )
            .bind(student_id)
            .bind(quiz_id)
            .bind(Json(answers))
            .bind(score.correct_count)
            .bind(score.total_questions)
            .bind(score.percentage)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn record_final_grade(
        &self,
        student_id: i64,
        quiz_id: i64,
        score: &QuizScore,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO final_grades
                 (student_id, quiz_id, correct_count, total_questions, percentage)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (student_id, quiz_id) DO UPDATE SET
                 correct_count = EXCLUDED.correct_count,
                 total_questions = EXCLUDED.total_questions,
                 percentage = EXCLUDED.percentage,
                 recorded_at = NOW()",
        )
        .bind(student_id)
        .bind(quiz_id)
        .bind(score.correct_count)
        .bind(score.total_questions)
        .bind(score.percentage)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_course_progress(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<CourseProgress>, AppError> {
        let row: Option<ProgressRow> = sqlx::query_as(
            "SELECT student_id, course_id, completed_lessons_count, total_lessons, status
             FROM course_progress
             WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status = CourseStatus::parse(&row.status).ok_or_else(|| {
            AppError::InternalServerError(format!("Unknown course status '{}'", row.status))
        })?;

        Ok(Some(CourseProgress {
            student_id: row.student_id,
            course_id: row.course_id,
            completed_lessons_count: row.completed_lessons_count,
            total_lessons: row.total_lessons,
            status,
        }))
    }

    async fn complete_lesson_cas(
        &self,
        student_id: i64,
        course_id: i64,
        expected_count: i64,
        total_lessons: i64,
    ) -> Result<bool, AppError> {
        let updated = sqlx::query(
            "UPDATE course_progress
             SET completed_lessons_count = completed_lessons_count + 1,
                 total_lessons = GREATEST(total_lessons, $4),
                 status = CASE
                     WHEN completed_lessons_count + 1 >= GREATEST(total_lessons, $4)
                     THEN 'completed' ELSE 'active'
                 END,
                 updated_at = NOW()
             WHERE student_id = $1 AND course_id = $2 AND completed_lessons_count = $3",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(expected_count)
        .bind(total_lessons)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            return Ok(true);
        }

        // No row yet is only valid for the very first completion; a losing
        // concurrent insert falls through to `false`.
        if expected_count == 0 {
            let inserted = sqlx::query(
                "INSERT INTO course_progress
                     (student_id, course_id, completed_lessons_count, total_lessons, status)
                 VALUES ($1, $2, 1, $3, CASE WHEN $3 <= 1 THEN 'completed' ELSE 'active' END)
                 ON CONFLICT (student_id, course_id) DO NOTHING",
            )
            .bind(student_id)
            .bind(course_id)
            .bind(total_lessons)
            .execute(&self.pool)
            .await?;

            return Ok(inserted.rows_affected() > 0);
        }

        Ok(false)
    }

    async fn load_achievement_catalog(&self) -> Result<Vec<Achievement>, AppError> {
        let rows: Vec<AchievementRow> =
            sqlx::query_as("SELECT id, title, description, tier FROM achievements ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|row| {
                let tier = BadgeTier::parse(&row.tier).ok_or_else(|| {
                    AppError::InternalServerError(format!("Unknown badge tier '{}'", row.tier))
                })?;
                Ok(Achievement {
                    id: row.id,
                    title: row.title,
                    description: row.description,
                    tier,
                })
            })
            .collect()
    }

    async fn load_earned_achievements(
        &self,
        student_id: i64,
    ) -> Result<Vec<EarnedAchievement>, AppError> {
        let rows: Vec<EarnedRow> = sqlx::query_as(
            "SELECT student_id, achievement_id, earned_at
             FROM earned_achievements
             WHERE student_id = $1
             ORDER BY earned_at",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EarnedAchievement {
                student_id: row.student_id,
                achievement_id: row.achievement_id,
                earned_at: row.earned_at,
            })
            .collect())
    }

    async fn grant_achievement(
        &self,
        student_id: i64,
        achievement_id: i64,
    ) -> Result<bool, AppError> {
        // Duplicate grants collapse into a no-op success here, which keeps
        // completeLesson idempotent from the caller's point of view.
        let inserted = sqlx::query(
            "INSERT INTO earned_achievements (student_id, achievement_id)
             VALUES ($1, $2)
             ON CONFLICT (student_id, achievement_id) DO NOTHING",
        )
        .bind(student_id)
        .bind(achievement_id)
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() > 0)
    }
}
