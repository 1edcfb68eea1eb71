// src/handlers/quiz.rs

use std::time::Duration;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::{RetakePolicy, SUBMIT_RETRY_BACKOFF_MS, SUBMIT_WRITE_ATTEMPTS},
    error::AppError,
    models::attempt::{AdvanceRequest, SelectAnswerRequest},
    session::engine::QuizSession,
    state::AppState,
    utils::jwt::Claims,
};

fn student_id(claims: &Claims) -> i64 {
    claims.sub.parse::<i64>().unwrap_or(0)
}

/// Opens the student's session for a quiz.
///
/// Starting and resuming share this entry point: the durable attempt is
/// always re-checked, so after a page reload the student lands exactly where
/// they paused, with the same option ordering. Whatever was in the in-memory
/// registry is replaced - the store is the source of truth here.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let quiz = state
        .store
        .load_quiz(quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))?;

    let session = match state.store.load_attempt(student_id, quiz_id).await? {
        Some(attempt) => QuizSession::restore(student_id, &quiz, &attempt)?,
        None => {
            if state.config.retake_policy == RetakePolicy::Deny
                && state.store.has_completed_attempt(student_id, quiz_id).await?
            {
                return Err(AppError::RetakeNotAllowed);
            }
            state.store.open_attempt(student_id, quiz_id).await?;
            QuizSession::begin(student_id, &quiz)?
        }
    };

    let view = session.view();
    state.sessions.insert((student_id, quiz_id), session).await;

    tracing::info!("Student {} opened a session for quiz {}", student_id, quiz_id);

    Ok(Json(view))
}

/// Current state of the live session: status, cursor, answers, options.
pub async fn session_view(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let handle = state
        .sessions
        .get((student_id, quiz_id))
        .await
        .ok_or_else(|| AppError::NotFound(format!("No open session for quiz {}", quiz_id)))?;
    let session = handle.lock().await;

    Ok(Json(session.view()))
}

/// Records an answer choice. Overwrites any earlier answer for the question
/// and leaves the cursor where it is.
pub async fn select_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let handle = state
        .sessions
        .get((student_id, quiz_id))
        .await
        .ok_or_else(|| AppError::NotFound(format!("No open session for quiz {}", quiz_id)))?;
    let mut session = handle.lock().await;

    session.select_answer(payload.question_index, payload.option_index)?;

    Ok(Json(json!({
        "question_index": payload.question_index,
        "option_index": payload.option_index,
    })))
}

/// Moves the question cursor one step, clamped at both ends.
pub async fn advance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let handle = state
        .sessions
        .get((student_id, quiz_id))
        .await
        .ok_or_else(|| AppError::NotFound(format!("No open session for quiz {}", quiz_id)))?;
    let mut session = handle.lock().await;

    let cursor = session.advance(payload.direction)?;

    Ok(Json(json!({ "current_question_index": cursor })))
}

/// Pauses the session. The durable write happens first; only once it has
/// resolved does the session transition, so a failed write leaves the
/// attempt InProgress and the student can simply retry pausing.
pub async fn pause(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let handle = state
        .sessions
        .get((student_id, quiz_id))
        .await
        .ok_or_else(|| AppError::NotFound(format!("No open session for quiz {}", quiz_id)))?;
    let mut session = handle.lock().await;

    let (answers, cursor) = session.pause_snapshot()?;
    state
        .store
        .save_attempt_progress(student_id, quiz_id, &answers, cursor)
        .await?;
    session.mark_paused();

    tracing::info!("Student {} paused quiz {}", student_id, quiz_id);

    Ok(Json(json!({ "status": "paused" })))
}

/// Resumes a paused session in memory. No write is needed until the next
/// pause or submit; the paused record remains the recovery point.
pub async fn resume(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let handle = state
        .sessions
        .get((student_id, quiz_id))
        .await
        .ok_or_else(|| AppError::NotFound(format!("No open session for quiz {}", quiz_id)))?;
    let mut session = handle.lock().await;

    session.resume()?;

    Ok(Json(json!({ "status": "in_progress" })))
}

/// Grades and completes the attempt.
///
/// The completed write is retried with backoff before the failure is
/// surfaced - Completed is meant to be terminal, and a completed-in-memory
/// attempt that never reached the store would silently vanish on reload.
/// The grade notification afterwards is fire-and-forget.
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let handle = state
        .sessions
        .get((student_id, quiz_id))
        .await
        .ok_or_else(|| AppError::NotFound(format!("No open session for quiz {}", quiz_id)))?;
    let mut session = handle.lock().await;

    let score = session.grade()?;
    let answers = session.answers_snapshot();

    let mut attempt = 0;
    loop {
        match state
            .store
            .save_attempt_completed(student_id, quiz_id, &answers, &score)
            .await
        {
            Ok(()) => break,
            Err(err) => {
                attempt += 1;
                if attempt >= SUBMIT_WRITE_ATTEMPTS {
                    tracing::error!(
                        "Submit write for student {} quiz {} failed after {} attempts: {}",
                        student_id,
                        quiz_id,
                        attempt,
                        err
                    );
                    return Err(err);
                }
                tracing::warn!(
                    "Submit write for student {} quiz {} failed (attempt {}), retrying: {}",
                    student_id,
                    quiz_id,
                    attempt,
                    err
                );
                tokio::time::sleep(Duration::from_millis(
                    SUBMIT_RETRY_BACKOFF_MS * attempt as u64,
                ))
                .await;
            }
        }
    }

    session.complete(score.clone());

    if let Err(err) = state
        .store
        .record_final_grade(student_id, quiz_id, &score)
        .await
    {
        tracing::warn!(
            "Final grade notification for student {} quiz {} failed: {}",
            student_id,
            quiz_id,
            err
        );
    }

    tracing::info!(
        "Student {} completed quiz {} with {}% ({}/{})",
        student_id,
        quiz_id,
        score.percentage,
        score.correct_count,
        score.total_questions
    );

    Ok(Json(json!({ "status": "completed", "score": score })))
}

/// Per-category score tally of a completed attempt.
pub async fn breakdown(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = student_id(&claims);

    let handle = state
        .sessions
        .get((student_id, quiz_id))
        .await
        .ok_or_else(|| AppError::NotFound(format!("No open session for quiz {}", quiz_id)))?;
    let session = handle.lock().await;

    Ok(Json(session.category_breakdown()?))
}
