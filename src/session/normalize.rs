// src/session/normalize.rs

/// A question's options in presentation order, plus where the correct one is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOptions {
    pub options: Vec<String>,
    pub correct_index: usize,
}

/// Merges the correct answer and its distractors into one deterministically
/// ordered list.
///
/// The order is plain lexicographic: the same inputs always yield the same
/// list and the same `correct_index`, so a chosen-option index stored in the
/// answer map still points at the same text after a pause and reload. The
/// trade-off (alphabetically early correct answers cluster near the top) is
/// accepted in exchange for resume stability.
///
/// If the correct answer also appears verbatim among the distractors (an
/// authoring error), the duplicates collapse into a single entry.
pub fn normalize(correct_answer: &str, distractors: &[String]) -> NormalizedOptions {
    let mut options = Vec::with_capacity(distractors.len() + 1);
    options.push(correct_answer.to_owned());
    options.extend(distractors.iter().cloned());

    options.sort();
    options.dedup();

    // The correct answer is always present; it was pushed above.
    let correct_index = options
        .iter()
        .position(|option| option == correct_answer)
        .unwrap_or_default();

    NormalizedOptions {
        options,
        correct_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_options_and_tracks_correct_index() {
        let result = normalize("Paris", &["Berlin".to_string(), "Madrid".to_string()]);

        assert_eq!(result.options, vec!["Berlin", "Madrid", "Paris"]);
        assert_eq!(result.correct_index, 2);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let distractors = vec!["Berlin".to_string(), "Madrid".to_string()];

        let first = normalize("Paris", &distractors);
        let second = normalize("Paris", &distractors);

        assert_eq!(first, second);
    }

    #[test]
    fn distractor_order_does_not_matter() {
        let forward = normalize("b", &["a".to_string(), "c".to_string()]);
        let backward = normalize("b", &["c".to_string(), "a".to_string()]);

        assert_eq!(forward, backward);
        assert_eq!(forward.correct_index, 1);
    }

    #[test]
    fn no_distractors_yields_single_option() {
        let result = normalize("Yes", &[]);

        assert_eq!(result.options, vec!["Yes"]);
        assert_eq!(result.correct_index, 0);
    }

    #[test]
    fn duplicate_of_correct_answer_collapses() {
        let result = normalize(
            "Paris",
            &["Paris".to_string(), "Berlin".to_string()],
        );

        assert_eq!(result.options, vec!["Berlin", "Paris"]);
        assert_eq!(result.correct_index, 1);
    }

    #[test]
    fn duplicate_distractors_collapse() {
        let result = normalize(
            "x",
            &["y".to_string(), "y".to_string(), "z".to_string()],
        );

        assert_eq!(result.options, vec!["x", "y", "z"]);
        assert_eq!(result.correct_index, 0);
    }
}
