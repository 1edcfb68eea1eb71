// src/models/achievement.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTier {
    Silver,
    Gold,
    Platinum,
}

impl BadgeTier {
    /// Fixed display points shown next to a badge. Reporting only,
    /// never used for gating.
    pub fn points(&self) -> i64 {
        match self {
            BadgeTier::Platinum => 100,
            BadgeTier::Gold => 50,
            BadgeTier::Silver => 25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeTier::Silver => "silver",
            BadgeTier::Gold => "gold",
            BadgeTier::Platinum => "platinum",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "silver" => Some(BadgeTier::Silver),
            "gold" => Some(BadgeTier::Gold),
            "platinum" => Some(BadgeTier::Platinum),
            _ => None,
        }
    }
}

/// Catalog entry. The catalog is read-only platform content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub tier: BadgeTier,
}

/// Created at most once per (student, achievement) pair, as a side effect
/// of completing a lesson. Never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnedAchievement {
    pub student_id: i64,
    pub achievement_id: i64,
    pub earned_at: chrono::DateTime<chrono::Utc>,
}

/// DTO carrying the badge-to-points mapping for display.
#[derive(Debug, Serialize)]
pub struct AchievementView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub tier: BadgeTier,
    pub points: i64,
}

impl From<&Achievement> for AchievementView {
    fn from(achievement: &Achievement) -> Self {
        Self {
            id: achievement.id,
            title: achievement.title.clone(),
            description: achievement.description.clone(),
            tier: achievement.tier,
            points: achievement.tier.points(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EarnedAchievementView {
    pub achievement: AchievementView,
    pub earned_at: chrono::DateTime<chrono::Utc>,
}
