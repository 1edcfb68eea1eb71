// src/handlers/achievements.rs

use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    error::AppError,
    models::achievement::{Achievement, AchievementView, EarnedAchievementView},
    state::AppState,
    utils::jwt::Claims,
};

/// The platform-wide achievement catalog with display points per badge tier.
pub async fn catalog(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let catalog = state.store.load_achievement_catalog().await?;

    let views: Vec<AchievementView> = catalog.iter().map(AchievementView::from).collect();
    Ok(Json(views))
}

/// Achievements the current student has earned, joined with catalog details.
pub async fn earned(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.sub.parse::<i64>().unwrap_or(0);

    let catalog = state.store.load_achievement_catalog().await?;
    let by_id: HashMap<i64, &Achievement> = catalog.iter().map(|a| (a.id, a)).collect();

    let earned = state.store.load_earned_achievements(student_id).await?;

    let views: Vec<EarnedAchievementView> = earned
        .iter()
        .filter_map(|row| {
            by_id.get(&row.achievement_id).map(|achievement| {
                EarnedAchievementView {
                    achievement: AchievementView::from(*achievement),
                    earned_at: row.earned_at,
                }
            })
        })
        .collect();

    Ok(Json(views))
}
