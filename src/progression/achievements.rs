// src/progression/achievements.rs

use std::collections::HashSet;

use crate::models::achievement::Achievement;

/// Decides which achievements a lesson completion newly earns.
///
/// Pure function: persisting the grants is the caller's job. Achievements
/// map to lesson positions by index modulo catalog size (the platform's
/// deterministic scheme; lessons beyond the catalog wrap around). Every
/// completed position up to the new count is re-evaluated against the earned
/// set, so a grant that was lost to a failure between the counter increment
/// and its write is picked up on the next completion. Anything in
/// `already_earned` is filtered out and each achievement appears at most
/// once, so nothing is ever granted twice for a student.
pub fn evaluate<'a>(
    new_completed_count: i64,
    catalog: &'a [Achievement],
    already_earned: &HashSet<i64>,
) -> Vec<&'a Achievement> {
    if new_completed_count < 1 || catalog.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut newly_earned = Vec::new();
    for count in 1..=new_completed_count {
        let achievement = &catalog[(count - 1) as usize % catalog.len()];
        if already_earned.contains(&achievement.id) || !seen.insert(achievement.id) {
            continue;
        }
        newly_earned.push(achievement);
    }

    newly_earned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::achievement::BadgeTier;

    fn catalog() -> Vec<Achievement> {
        vec![
            Achievement {
                id: 10,
                title: "First Steps".to_string(),
                description: "Completed a first lesson.".to_string(),
                tier: BadgeTier::Silver,
            },
            Achievement {
                id: 11,
                title: "Steady Learner".to_string(),
                description: "Kept the routine going.".to_string(),
                tier: BadgeTier::Gold,
            },
            Achievement {
                id: 12,
                title: "Course Champion".to_string(),
                description: "Finished a whole course.".to_string(),
                tier: BadgeTier::Platinum,
            },
        ]
    }

    #[test]
    fn maps_lesson_position_to_catalog_entry() {
        let catalog = catalog();

        let first = evaluate(1, &catalog, &HashSet::new());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, 10);

        let earned: HashSet<i64> = [10, 11].into_iter().collect();
        let third = evaluate(3, &catalog, &earned);
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].id, 12);
    }

    #[test]
    fn back_fills_grants_missed_by_earlier_completions() {
        let catalog = catalog();
        let earned = HashSet::new();

        // Nothing was earned for lesson 1; completing lesson 2 grants both.
        let ids: Vec<i64> = evaluate(2, &catalog, &earned)
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn wrapped_positions_never_repeat_a_grant() {
        let catalog = catalog();
        let earned: HashSet<i64> = [10, 11, 12].into_iter().collect();

        // Lesson 4 maps back to the first entry, which is already earned.
        assert!(evaluate(4, &catalog, &earned).is_empty());

        // Even with nothing earned, each achievement appears once.
        let ids: Vec<i64> = evaluate(5, &catalog, &HashSet::new())
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn never_grants_an_already_earned_achievement() {
        let catalog = catalog();
        let earned: HashSet<i64> = [10].into_iter().collect();

        assert!(evaluate(1, &catalog, &earned).is_empty());
        assert!(!evaluate(4, &catalog, &earned).iter().any(|a| a.id == 10));
    }

    #[test]
    fn empty_catalog_grants_nothing() {
        let earned = HashSet::new();
        assert!(evaluate(1, &[], &earned).is_empty());
    }

    #[test]
    fn zero_or_negative_count_grants_nothing() {
        let catalog = catalog();
        let earned = HashSet::new();

        assert!(evaluate(0, &catalog, &earned).is_empty());
        assert!(evaluate(-3, &catalog, &earned).is_empty());
    }
}
