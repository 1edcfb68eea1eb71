// src/handlers/progress.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        achievement::AchievementView,
        progress::{
            CompleteLessonRequest, CompleteLessonResponse, CourseProgressResponse, ProgressQuery,
        },
    },
    progression::gate,
    state::AppState,
    utils::jwt::Claims,
};

fn student_id(claims: &Claims) -> i64 {
    claims.sub.parse::<i64>().unwrap_or(0)
}

/// Course progress plus the derived per-lesson state rail, so the client
/// never re-implements the gating rule.
pub async fn get_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Query(query): Query<ProgressQuery>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let progress = gate::get_state(
        state.store.as_ref(),
        student_id,
        course_id,
        query.total_lessons,
    )
    .await?;

    let lessons = gate::lesson_states(progress.completed_lessons_count, progress.total_lessons);

    Ok(Json(CourseProgressResponse {
        course_id: progress.course_id,
        completed_lessons_count: progress.completed_lessons_count,
        total_lessons: progress.total_lessons,
        status: progress.status,
        lessons,
    }))
}

/// Pure read: is the lesson reachable for this student right now?
pub async fn lesson_unlocked(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, lesson_index)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let progress = gate::get_state(state.store.as_ref(), student_id, course_id, None).await?;

    Ok(Json(json!({
        "lesson_index": lesson_index,
        "unlocked": gate::is_unlocked(progress.completed_lessons_count, lesson_index),
    })))
}

/// Marks the active lesson complete and reports any newly earned
/// achievements. Re-completing or skipping ahead is rejected with 409.
pub async fn complete_lesson(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, lesson_index)): Path<(i64, i64)>,
    Json(payload): Json<CompleteLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let student_id = student_id(&claims);

    let outcome = gate::complete_lesson(
        state.store.as_ref(),
        student_id,
        course_id,
        lesson_index,
        payload.total_lessons,
    )
    .await?;

    if let Some(quiz_score) = payload.quiz_score {
        tracing::info!(
            "Lesson {} of course {} completed by student {} with quiz score {}",
            lesson_index,
            course_id,
            student_id,
            quiz_score
        );
    }

    Ok(Json(CompleteLessonResponse {
        completed_lessons_count: outcome.completed_lessons_count,
        total_lessons: outcome.total_lessons,
        course_completed: outcome.course_completed,
        newly_earned: outcome
            .newly_earned
            .iter()
            .map(AchievementView::from)
            .collect(),
    }))
}
