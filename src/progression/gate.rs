// src/progression/gate.rs

use std::collections::HashSet;

use crate::{
    error::AppError,
    models::{
        achievement::Achievement,
        progress::{CourseProgress, LessonState},
    },
    progression::achievements,
    store::ProgressStore,
};

/// Result of a successful lesson completion.
#[derive(Debug)]
pub struct LessonCompletionOutcome {
    pub completed_lessons_count: i64,
    pub total_lessons: i64,
    pub course_completed: bool,
    pub newly_earned: Vec<Achievement>,
}

/// Derived state of one lesson position. Nothing is stored per lesson; the
/// whole gate runs off the single completed-lessons counter.
pub fn lesson_state(completed_lessons_count: i64, lesson_index: i64) -> LessonState {
    if lesson_index < completed_lessons_count {
        LessonState::Completed
    } else if lesson_index == completed_lessons_count {
        LessonState::Active
    } else {
        LessonState::Locked
    }
}

pub fn lesson_states(completed_lessons_count: i64, total_lessons: i64) -> Vec<LessonState> {
    (0..total_lessons)
        .map(|index| lesson_state(completed_lessons_count, index))
        .collect()
}

/// A lesson is reachable once every lesson before it is done: the first
/// `completed_lessons_count` lessons plus the one at that exact index.
pub fn is_unlocked(completed_lessons_count: i64, lesson_index: i64) -> bool {
    lesson_index <= completed_lessons_count
}

/// Preconditions for completing `lesson_index`: only the exact Active lesson
/// qualifies. Completing out of order - including re-completing an already
/// finished lesson - is rejected, never silently accepted. That rejection is
/// what keeps retried requests from double-incrementing or double-granting.
pub fn check_completable(progress: &CourseProgress, lesson_index: i64) -> Result<(), AppError> {
    if progress.total_lessons > 0 && progress.completed_lessons_count >= progress.total_lessons {
        return Err(AppError::CourseAlreadyComplete);
    }

    if lesson_index != progress.completed_lessons_count {
        return Err(AppError::LessonLocked(format!(
            "Lesson {} is not the active lesson (the active lesson is {})",
            lesson_index, progress.completed_lessons_count
        )));
    }

    Ok(())
}

/// Current progress for (student, course). When no row exists yet the
/// zero-state is returned without persisting anything; the first durable
/// write happens on the first lesson completion.
pub async fn get_state(
    store: &dyn ProgressStore,
    student_id: i64,
    course_id: i64,
    total_lessons_hint: Option<i64>,
) -> Result<CourseProgress, AppError> {
    match store.load_course_progress(student_id, course_id).await? {
        Some(mut progress) => {
            // Course content can grow while a student is mid-course.
            if let Some(total) = total_lessons_hint {
                progress.total_lessons = progress.total_lessons.max(total);
            }
            Ok(progress)
        }
        None => Ok(CourseProgress::fresh(
            student_id,
            course_id,
            total_lessons_hint.unwrap_or(0),
        )),
    }
}

/// Marks the active lesson complete: an at-most-once transition.
///
/// The increment goes through the gateway's conditional update keyed on the
/// expected prior count, so two concurrent calls for the same lesson cannot
/// both succeed; the loser gets `LessonLocked` just like an out-of-order
/// request. Achievement grants ride on the winning call only.
pub async fn complete_lesson(
    store: &dyn ProgressStore,
    student_id: i64,
    course_id: i64,
    lesson_index: i64,
    total_lessons: i64,
) -> Result<LessonCompletionOutcome, AppError> {
    let mut progress = store
        .load_course_progress(student_id, course_id)
        .await?
        .unwrap_or_else(|| CourseProgress::fresh(student_id, course_id, total_lessons));

    progress.total_lessons = progress.total_lessons.max(total_lessons);

    check_completable(&progress, lesson_index)?;

    let applied = store
        .complete_lesson_cas(
            student_id,
            course_id,
            progress.completed_lessons_count,
            progress.total_lessons,
        )
        .await?;

    if !applied {
        // A concurrent or retried call won the conditional update.
        return Err(AppError::LessonLocked(format!(
            "Lesson {} was already completed",
            lesson_index
        )));
    }

    let new_count = progress.completed_lessons_count + 1;

    let catalog = store.load_achievement_catalog().await?;
    let already_earned: HashSet<i64> = store
        .load_earned_achievements(student_id)
        .await?
        .into_iter()
        .map(|earned| earned.achievement_id)
        .collect();

    let mut newly_earned = Vec::new();
    for achievement in achievements::evaluate(new_count, &catalog, &already_earned) {
        // The gateway treats a redundant grant as a no-op, so a race between
        // the earned-set read and this write still cannot duplicate a row.
        if store.grant_achievement(student_id, achievement.id).await? {
            newly_earned.push(achievement.clone());
        }
    }

    tracing::info!(
        "Student {} completed lesson {} of course {} ({}/{})",
        student_id,
        lesson_index,
        course_id,
        new_count,
        progress.total_lessons
    );

    Ok(LessonCompletionOutcome {
        completed_lessons_count: new_count,
        total_lessons: progress.total_lessons,
        course_completed: new_count >= progress.total_lessons,
        newly_earned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::achievement::BadgeTier;
    use crate::models::progress::CourseStatus;
    use crate::store::MemoryProgressStore;

    fn progress(completed: i64, total: i64) -> CourseProgress {
        CourseProgress {
            student_id: 1,
            course_id: 1,
            completed_lessons_count: completed,
            total_lessons: total,
            status: CourseStatus::Active,
        }
    }

    fn seeded_store() -> MemoryProgressStore {
        let store = MemoryProgressStore::new();
        for (id, title, tier) in [
            (1, "First Steps", BadgeTier::Silver),
            (2, "Steady Learner", BadgeTier::Gold),
            (3, "Course Champion", BadgeTier::Platinum),
        ] {
            store.insert_achievement(Achievement {
                id,
                title: title.to_string(),
                description: String::new(),
                tier,
            });
        }
        store
    }

    #[test]
    fn lesson_states_derive_from_the_counter() {
        assert_eq!(
            lesson_states(2, 5),
            vec![
                LessonState::Completed,
                LessonState::Completed,
                LessonState::Active,
                LessonState::Locked,
                LessonState::Locked,
            ]
        );
    }

    #[test]
    fn unlock_check_is_inclusive_of_the_active_lesson() {
        assert!(is_unlocked(2, 0));
        assert!(is_unlocked(2, 2));
        assert!(!is_unlocked(2, 3));
    }

    #[test]
    fn only_the_active_lesson_is_completable() {
        let current = progress(2, 5);

        assert!(check_completable(&current, 2).is_ok());
        assert!(matches!(
            check_completable(&current, 0),
            Err(AppError::LessonLocked(_))
        ));
        assert!(matches!(
            check_completable(&current, 5),
            Err(AppError::LessonLocked(_))
        ));
    }

    #[test]
    fn finished_course_rejects_further_completions() {
        let current = progress(3, 3);

        assert!(matches!(
            check_completable(&current, 3),
            Err(AppError::CourseAlreadyComplete)
        ));
    }

    #[tokio::test]
    async fn get_state_returns_lazy_zero_state() {
        let store = seeded_store();

        let state = get_state(&store, 1, 9, Some(4)).await.unwrap();
        assert_eq!(state.completed_lessons_count, 0);
        assert_eq!(state.total_lessons, 4);

        // Still nothing persisted.
        assert!(store.load_course_progress(1, 9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completing_in_sequence_increments_by_exactly_one() {
        let store = seeded_store();

        for lesson in 0..3 {
            let outcome = complete_lesson(&store, 1, 9, lesson, 3).await.unwrap();
            assert_eq!(outcome.completed_lessons_count, lesson + 1);
        }

        let final_state = store.load_course_progress(1, 9).await.unwrap().unwrap();
        assert_eq!(final_state.completed_lessons_count, 3);
        assert_eq!(final_state.status, CourseStatus::Completed);
    }

    #[tokio::test]
    async fn out_of_order_completions_are_locked() {
        let store = seeded_store();

        complete_lesson(&store, 1, 9, 0, 5).await.unwrap();
        complete_lesson(&store, 1, 9, 1, 5).await.unwrap();

        assert!(matches!(
            complete_lesson(&store, 1, 9, 0, 5).await,
            Err(AppError::LessonLocked(_))
        ));
        assert!(matches!(
            complete_lesson(&store, 1, 9, 4, 5).await,
            Err(AppError::LessonLocked(_))
        ));

        let state = store.load_course_progress(1, 9).await.unwrap().unwrap();
        assert_eq!(state.completed_lessons_count, 2);
    }

    #[tokio::test]
    async fn duplicate_request_cannot_double_grant() {
        let store = seeded_store();

        let first = complete_lesson(&store, 1, 9, 0, 3).await.unwrap();
        assert_eq!(first.newly_earned.len(), 1);

        // Retried request for the same lesson loses at the gate.
        assert!(matches!(
            complete_lesson(&store, 1, 9, 0, 3).await,
            Err(AppError::LessonLocked(_))
        ));
        assert_eq!(store.earned_count(1), 1);
    }

    #[tokio::test]
    async fn losing_the_conditional_update_is_reported_as_locked() {
        let store = seeded_store();

        // Another device already applied the increment for lesson 0.
        assert!(store.complete_lesson_cas(1, 9, 0, 3).await.unwrap());
        assert!(!store.complete_lesson_cas(1, 9, 0, 3).await.unwrap());
    }

    #[tokio::test]
    async fn grant_lost_to_a_transient_failure_is_back_filled() {
        let store = seeded_store();

        // The first completion's increment landed but its grant write never
        // did (e.g. the store dropped out mid-operation).
        assert!(store.complete_lesson_cas(1, 9, 0, 3).await.unwrap());
        assert_eq!(store.earned_count(1), 0);

        // The next completion picks the missed grant up alongside its own.
        let second = complete_lesson(&store, 1, 9, 1, 3).await.unwrap();
        let ids: Vec<i64> = second.newly_earned.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.earned_count(1), 2);
    }

    #[tokio::test]
    async fn total_lessons_can_grow_but_never_shrink() {
        let store = seeded_store();

        complete_lesson(&store, 1, 9, 0, 3).await.unwrap();
        let grown = complete_lesson(&store, 1, 9, 1, 5).await.unwrap();
        assert_eq!(grown.total_lessons, 5);

        let shrunk_request = complete_lesson(&store, 1, 9, 2, 2).await.unwrap();
        assert_eq!(shrunk_request.total_lessons, 5);
    }
}
