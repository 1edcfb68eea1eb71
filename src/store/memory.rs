// src/store/memory.rs

//! In-memory `ProgressStore`. The subsystem is storage-agnostic behind the
//! gateway trait; this implementation backs the integration tests and local
//! demos without a database, and doubles as a readable reference for the
//! gateway semantics (conditional update, at-most-once grants).

use std::collections::HashMap;
use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::AppError,
    models::{
        achievement::{Achievement, EarnedAchievement},
        attempt::{AttemptStatus, QuizAttempt, QuizScore},
        progress::{CourseProgress, CourseStatus},
        quiz::Quiz,
    },
    store::ProgressStore,
};

#[derive(Default)]
struct Inner {
    quizzes: HashMap<i64, Quiz>,
    /// Active (non-completed) attempts, keyed by (student_id, quiz_id).
    attempts: HashMap<(i64, i64), QuizAttempt>,
    /// Completed attempts kept as history, latest per (student, quiz).
    completed: HashMap<(i64, i64), QuizAttempt>,
    final_grades: HashMap<(i64, i64), QuizScore>,
    progress: HashMap<(i64, i64), CourseProgress>,
    catalog: Vec<Achievement>,
    earned: HashMap<(i64, i64), EarnedAchievement>,
}

#[derive(Default)]
pub struct MemoryProgressStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_quiz(&self, quiz: Quiz) {
        self.lock_inner(|inner| {
            inner.quizzes.insert(quiz.id, quiz);
        });
    }

    pub fn insert_achievement(&self, achievement: Achievement) {
        self.lock_inner(|inner| {
            inner.catalog.push(achievement);
            inner.catalog.sort_by_key(|a| a.id);
        });
    }

    /// Makes every subsequent gateway call fail as transient. Used to
    /// exercise the persistence-failure paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn final_grade(&self, student_id: i64, quiz_id: i64) -> Option<QuizScore> {
        self.lock_inner(|inner| inner.final_grades.get(&(student_id, quiz_id)).cloned())
    }

    pub fn earned_count(&self, student_id: i64) -> usize {
        self.lock_inner(|inner| {
            inner
                .earned
                .keys()
                .filter(|(student, _)| *student == student_id)
                .count()
        })
    }

    fn lock_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut inner)
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, AppError> {
        self.check_available()?;
        Ok(self.lock_inner(|inner| inner.quizzes.get(&quiz_id).cloned()))
    }

    async fn load_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<Option<QuizAttempt>, AppError> {
        self.check_available()?;
        Ok(self.lock_inner(|inner| inner.attempts.get(&(student_id, quiz_id)).cloned()))
    }

    async fn has_completed_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<bool, AppError> {
        self.check_available()?;
        Ok(self.lock_inner(|inner| inner.completed.contains_key(&(student_id, quiz_id))))
    }

    async fn open_attempt(&self, student_id: i64, quiz_id: i64) -> Result<(), AppError> {
        self.check_available()?;
        self.lock_inner(|inner| {
            inner
                .attempts
                .entry((student_id, quiz_id))
                .or_insert_with(|| QuizAttempt {
                    student_id,
                    quiz_id,
                    status: AttemptStatus::InProgress,
                    answers: HashMap::new(),
                    current_question_index: 0,
                    score: None,
                    updated_at: Some(Utc::now()),
                });
        });
        Ok(())
    }

    async fn save_attempt_progress(
        &self,
        student_id: i64,
        quiz_id: i64,
        answers: &HashMap<usize, usize>,
        current_question_index: usize,
    ) -> Result<(), AppError> {
        self.check_available()?;
        self.lock_inner(|inner| {
            inner.attempts.insert(
                (student_id, quiz_id),
                QuizAttempt {
                    student_id,
                    quiz_id,
                    status: AttemptStatus::Paused,
                    answers: answers.clone(),
                    current_question_index,
                    score: None,
                    updated_at: Some(Utc::now()),
                },
            );
        });
        Ok(())
    }

    async fn save_attempt_completed(
        &self,
        student_id: i64,
        quiz_id: i64,
        answers: &HashMap<usize, usize>,
        score: &QuizScore,
    ) -> Result<(), AppError> {
        self.check_available()?;
        self.lock_inner(|inner| {
            inner.attempts.remove(&(student_id, quiz_id));
            inner.completed.insert(
                (student_id, quiz_id),
                QuizAttempt {
                    student_id,
                    quiz_id,
                    status: AttemptStatus::Completed,
                    answers: answers.clone(),
                    current_question_index: 0,
                    score: Some(score.clone()),
                    updated_at: Some(Utc::now()),
                },
            );
        });
        Ok(())
    }

    async fn record_final_grade(
        &self,
        student_id: i64,
        quiz_id: i64,
        score: &QuizScore,
    ) -> Result<(), AppError> {
        self.check_available()?;
        self.lock_inner(|inner| {
            inner
                .final_grades
                .insert((student_id, quiz_id), score.clone());
        });
        Ok(())
    }

    async fn load_course_progress(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<CourseProgress>, AppError> {
        self.check_available()?;
        Ok(self.lock_inner(|inner| inner.progress.get(&(student_id, course_id)).cloned()))
    }

    async fn complete_lesson_cas(
        &self,
        student_id: i64,
        course_id: i64,
        expected_count: i64,
        total_lessons: i64,
    ) -> Result<bool, AppError> {
        self.check_available()?;
        Ok(self.lock_inner(|inner| {
            match inner.progress.get_mut(&(student_id, course_id)) {
                Some(progress) => {
                    if progress.completed_lessons_count != expected_count {
                        return false;
                    }
                    progress.completed_lessons_count += 1;
                    progress.total_lessons = progress.total_lessons.max(total_lessons);
                    progress.status = if progress.completed_lessons_count >= progress.total_lessons
                    {
                        CourseStatus::Completed
                    } else {
                        CourseStatus::Active
                    };
                    true
                }
                None => {
                    if expected_count != 0 {
                        return false;
                    }
                    let status = if total_lessons <= 1 {
                        CourseStatus::Completed
                    } else {
                        CourseStatus::Active
                    };
                    inner.progress.insert(
                        (student_id, course_id),
                        CourseProgress {
                            student_id,
                            course_id,
                            completed_lessons_count: 1,
                            total_lessons,
                            status,
                        },
                    );
                    true
                }
            }
        }))
    }

    async fn load_achievement_catalog(&self) -> Result<Vec<Achievement>, AppError> {
        self.check_available()?;
        Ok(self.lock_inner(|inner| inner.catalog.clone()))
    }

    async fn load_earned_achievements(
        &self,
        student_id: i64,
    ) -> Result<Vec<EarnedAchievement>, AppError> {
        self.check_available()?;
        Ok(self.lock_inner(|inner| {
            let mut earned: Vec<EarnedAchievement> = inner
                .earned
                .values()
                .filter(|e| e.student_id == student_id)
                .cloned()
                .collect();
            earned.sort_by_key(|e| e.earned_at);
            earned
        }))
    }

    async fn grant_achievement(
        &self,
        student_id: i64,
        achievement_id: i64,
    ) -> Result<bool, AppError> {
        self.check_available()?;
        Ok(self.lock_inner(|inner| {
            if inner.earned.contains_key(&(student_id, achievement_id)) {
                return false;
            }
            inner.earned.insert(
                (student_id, achievement_id),
                EarnedAchievement {
                    student_id,
                    achievement_id,
                    earned_at: Utc::now(),
                },
            );
            true
        }))
    }
}
