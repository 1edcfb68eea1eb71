// src/models/progress.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::achievement::AchievementView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Active,
    Completed,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Active => "active",
            CourseStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(CourseStatus::Active),
            "completed" => Some(CourseStatus::Completed),
            _ => None,
        }
    }
}

/// One student's traversal of one course. The single counter is the only
/// stored progression state; per-lesson states are derived from it.
///
/// Invariant: `completed_lessons_count` is monotonically non-decreasing and
/// never exceeds `total_lessons`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseProgress {
    pub student_id: i64,
    pub course_id: i64,
    pub completed_lessons_count: i64,
    pub total_lessons: i64,
    pub status: CourseStatus,
}

impl CourseProgress {
    /// Lazy zero-state returned before the student has completed anything.
    /// Nothing is persisted until the first lesson completion.
    pub fn fresh(student_id: i64, course_id: i64, total_lessons: i64) -> Self {
        Self {
            student_id,
            course_id,
            completed_lessons_count: 0,
            total_lessons,
            status: CourseStatus::Active,
        }
    }
}

/// Derived state of a single lesson position within a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonState {
    Locked,
    Active,
    Completed,
}

/// DTO for marking the active lesson complete.
#[derive(Debug, Deserialize, Validate)]
pub struct CompleteLessonRequest {
    /// Current lesson count of the course; picked up here because course
    /// content can be edited while students are mid-course.
    #[validate(range(min = 1))]
    pub total_lessons: i64,

    /// Score of the assessment quiz that justified this completion, if any.
    #[validate(range(min = 0, max = 100))]
    pub quiz_score: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    /// Lets the client render the full lesson rail even before any
    /// progress row exists.
    pub total_lessons: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CourseProgressResponse {
    pub course_id: i64,
    pub completed_lessons_count: i64,
    pub total_lessons: i64,
    pub status: CourseStatus,
    pub lessons: Vec<LessonState>,
}

#[derive(Debug, Serialize)]
pub struct CompleteLessonResponse {
    pub completed_lessons_count: i64,
    pub total_lessons: i64,
    pub course_completed: bool,
    pub newly_earned: Vec<AchievementView>,
}
