// src/session/engine.rs

use std::collections::{BTreeMap, HashMap};

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptStatus, CategoryTally, Direction, QuizAttempt, QuizScore, SessionView},
        quiz::{PresentedQuestion, Quiz},
    },
    session::normalize::normalize,
};

/// State machine for one student's attempt at one quiz.
///
/// `InProgress ⇄ Paused`, then `Completed` (terminal; a retake is a new
/// session, never a transition out of Completed). The engine owns only
/// in-memory state: durable writes go through the `ProgressStore` and are
/// orchestrated by the handlers, so a crash between a transition and its
/// write is recovered by rebuilding from the last durable state on the next
/// start.
#[derive(Debug)]
pub struct QuizSession {
    student_id: i64,
    quiz_id: i64,
    title: String,
    questions: Vec<PresentedQuestion>,
    status: AttemptStatus,
    answers: HashMap<usize, usize>,
    cursor: usize,
    score: Option<QuizScore>,
}

/// Normalizes every question up front. Content problems (no questions, empty
/// answer key) are rejected here, before any attempt state exists.
fn presented_questions(quiz: &Quiz) -> Result<Vec<PresentedQuestion>, AppError> {
    if quiz.questions.is_empty() {
        return Err(AppError::InvalidQuiz(format!(
            "Quiz {} has no questions",
            quiz.id
        )));
    }

    quiz.questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            if question.correct_answer.is_empty() {
                return Err(AppError::InvalidQuiz(format!(
                    "Question {} of quiz {} has an empty correct answer",
                    index, quiz.id
                )));
            }
            let normalized = normalize(&question.correct_answer, &question.distractors);
            Ok(PresentedQuestion {
                prompt: question.prompt.clone(),
                options: normalized.options,
                correct_index: normalized.correct_index,
                category: question.category.clone(),
            })
        })
        .collect()
}

impl QuizSession {
    /// Fresh attempt: empty answer map, cursor at the first question.
    pub fn begin(student_id: i64, quiz: &Quiz) -> Result<Self, AppError> {
        let questions = presented_questions(quiz)?;
        Ok(Self {
            student_id,
            quiz_id: quiz.id,
            title: quiz.title.clone(),
            questions,
            status: AttemptStatus::InProgress,
            answers: HashMap::new(),
            cursor: 0,
            score: None,
        })
    }

    /// Restores a paused or in-progress attempt from its durable record.
    ///
    /// Options are re-derived from content; the deterministic normalization
    /// keeps stored option indices pointing at the same texts the student
    /// already saw. The cursor is clamped in case the quiz shrank since the
    /// attempt was saved.
    pub fn restore(student_id: i64, quiz: &Quiz, attempt: &QuizAttempt) -> Result<Self, AppError> {
        let questions = presented_questions(quiz)?;
        let cursor = attempt.current_question_index.min(questions.len() - 1);
        Ok(Self {
            student_id,
            quiz_id: quiz.id,
            title: quiz.title.clone(),
            questions,
            status: AttemptStatus::InProgress,
            answers: attempt.answers.clone(),
            cursor,
            score: None,
        })
    }

    pub fn student_id(&self) -> i64 {
        self.student_id
    }

    pub fn quiz_id(&self) -> i64 {
        self.quiz_id
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    /// Records (or overwrites) the answer for one question. The cursor does
    /// not move; navigation is a separate concern.
    pub fn select_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Result<(), AppError> {
        self.require(AttemptStatus::InProgress, "select an answer")?;

        let question = self.questions.get(question_index).ok_or_else(|| {
            AppError::OutOfRange(format!(
                "Question index {} is out of range (quiz has {} questions)",
                question_index,
                self.questions.len()
            ))
        })?;

        if option_index >= question.options.len() {
            return Err(AppError::OutOfRange(format!(
                "Option index {} is out of range (question {} has {} options)",
                option_index,
                question_index,
                question.options.len()
            )));
        }

        self.answers.insert(question_index, option_index);
        Ok(())
    }

    /// Moves the cursor one step, clamped at both ends. Moving past either
    /// end is a no-op, not an error.
    pub fn advance(&mut self, direction: Direction) -> Result<usize, AppError> {
        self.require(AttemptStatus::InProgress, "navigate")?;

        self.cursor = match direction {
            Direction::Next => (self.cursor + 1).min(self.questions.len() - 1),
            Direction::Previous => self.cursor.saturating_sub(1),
        };
        Ok(self.cursor)
    }

    /// Validates the pause transition and hands back what must be written
    /// durably. The caller persists first and only then calls `mark_paused`;
    /// a failed write leaves the session InProgress so pausing stays
    /// retryable without losing anything.
    pub fn pause_snapshot(&self) -> Result<(HashMap<usize, usize>, usize), AppError> {
        self.require(AttemptStatus::InProgress, "pause")?;
        Ok((self.answers.clone(), self.cursor))
    }

    pub fn mark_paused(&mut self) {
        self.status = AttemptStatus::Paused;
    }

    /// Back to InProgress. Purely in-memory; the paused record stays the
    /// recovery point until the next pause or submit.
    pub fn resume(&mut self) -> Result<(), AppError> {
        self.require(AttemptStatus::Paused, "resume")?;
        self.status = AttemptStatus::InProgress;
        Ok(())
    }

    /// Grades the attempt without transitioning, so the caller can persist
    /// the result before the terminal state is entered. Every question must
    /// be answered; the first gap is reported for the UI to focus.
    pub fn grade(&self) -> Result<QuizScore, AppError> {
        self.require(AttemptStatus::InProgress, "submit")?;

        let total = self.questions.len();
        for index in 0..total {
            if !self.answers.contains_key(&index) {
                return Err(AppError::IncompleteAttempt {
                    first_unanswered: index,
                });
            }
        }

        let correct_count = self
            .questions
            .iter()
            .enumerate()
            .filter(|(index, question)| self.answers.get(index) == Some(&question.correct_index))
            .count() as i64;

        let percentage = ((correct_count as f64 / total as f64) * 100.0).round() as i64;

        Ok(QuizScore {
            correct_count,
            total_questions: total as i64,
            percentage,
        })
    }

    /// Terminal transition. Answers and score are frozen afterwards; every
    /// mutating operation fails with `InvalidStateTransition`.
    pub fn complete(&mut self, score: QuizScore) {
        self.score = Some(score);
        self.status = AttemptStatus::Completed;
    }

    /// Per-category {correct, total} tally for reporting, available once
    /// completed. Untagged questions fall under "general". Derived on demand,
    /// never persisted.
    pub fn category_breakdown(&self) -> Result<BTreeMap<String, CategoryTally>, AppError> {
        if self.status != AttemptStatus::Completed {
            return Err(AppError::InvalidStateTransition(
                "The score breakdown is only available after submission".to_string(),
            ));
        }

        let mut tally: BTreeMap<String, CategoryTally> = BTreeMap::new();
        for (index, question) in self.questions.iter().enumerate() {
            let category = question
                .category
                .clone()
                .unwrap_or_else(|| "general".to_string());
            let entry = tally.entry(category).or_default();
            entry.total += 1;
            if self.answers.get(&index) == Some(&question.correct_index) {
                entry.correct += 1;
            }
        }
        Ok(tally)
    }

    pub fn answers_snapshot(&self) -> HashMap<usize, usize> {
        self.answers.clone()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            quiz_id: self.quiz_id,
            title: self.title.clone(),
            status: self.status,
            current_question_index: self.cursor,
            total_questions: self.questions.len(),
            answers: self.answers.clone(),
            questions: self.questions.iter().map(|q| q.view()).collect(),
            score: self.score.clone(),
        }
    }

    fn require(&self, expected: AttemptStatus, action: &str) -> Result<(), AppError> {
        if self.status != expected {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot {} while the attempt is {}",
                action,
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuizQuestion;

    fn question(prompt: &str, correct: &str, distractors: &[&str], category: Option<&str>) -> QuizQuestion {
        QuizQuestion {
            prompt: prompt.to_string(),
            correct_answer: correct.to_string(),
            distractors: distractors.iter().map(|d| d.to_string()).collect(),
            category: category.map(|c| c.to_string()),
        }
    }

    fn capitals_quiz() -> Quiz {
        Quiz {
            id: 7,
            title: "Capitals".to_string(),
            questions: vec![
                question("Capital of France?", "Paris", &["Berlin", "Madrid"], Some("geography")),
                question("Capital of Italy?", "Rome", &["Athens", "Vienna"], Some("geography")),
                question("2 + 2?", "4", &["3", "5"], Some("numbers")),
                question("Color of the sky?", "Blue", &["Green", "Red"], None),
            ],
        }
    }

    fn correct_option(session: &QuizSession, index: usize) -> usize {
        session.questions[index].correct_index
    }

    #[test]
    fn begin_rejects_empty_quiz() {
        let quiz = Quiz {
            id: 1,
            title: "Empty".to_string(),
            questions: vec![],
        };

        assert!(matches!(
            QuizSession::begin(1, &quiz),
            Err(AppError::InvalidQuiz(_))
        ));
    }

    #[test]
    fn begin_rejects_empty_correct_answer() {
        let quiz = Quiz {
            id: 1,
            title: "Broken".to_string(),
            questions: vec![question("?", "", &["a"], None)],
        };

        assert!(matches!(
            QuizSession::begin(1, &quiz),
            Err(AppError::InvalidQuiz(_))
        ));
    }

    #[test]
    fn select_answer_overwrites_without_moving_cursor() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(1, &quiz).unwrap();

        session.select_answer(0, 0).unwrap();
        session.select_answer(0, 2).unwrap();

        assert_eq!(session.answers_snapshot().get(&0), Some(&2));
        assert_eq!(session.view().current_question_index, 0);
    }

    #[test]
    fn select_answer_checks_bounds() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(1, &quiz).unwrap();

        assert!(matches!(
            session.select_answer(9, 0),
            Err(AppError::OutOfRange(_))
        ));
        assert!(matches!(
            session.select_answer(0, 9),
            Err(AppError::OutOfRange(_))
        ));
    }

    #[test]
    fn advance_clamps_at_both_ends() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(1, &quiz).unwrap();

        assert_eq!(session.advance(Direction::Previous).unwrap(), 0);

        for _ in 0..10 {
            session.advance(Direction::Next).unwrap();
        }
        assert_eq!(session.view().current_question_index, 3);
    }

    #[test]
    fn pause_then_restore_preserves_answers_and_cursor() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(42, &quiz).unwrap();

        session.select_answer(0, 1).unwrap();
        session.advance(Direction::Next).unwrap();
        let (answers, cursor) = session.pause_snapshot().unwrap();
        session.mark_paused();

        let attempt = QuizAttempt {
            student_id: 42,
            quiz_id: quiz.id,
            status: AttemptStatus::Paused,
            answers,
            current_question_index: cursor,
            score: None,
            updated_at: None,
        };

        let restored = QuizSession::restore(42, &quiz, &attempt).unwrap();
        assert_eq!(restored.status(), AttemptStatus::InProgress);
        assert_eq!(restored.answers_snapshot().get(&0), Some(&1));
        assert_eq!(restored.view().current_question_index, 1);
    }

    #[test]
    fn resume_is_only_valid_while_paused() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(1, &quiz).unwrap();

        assert!(matches!(
            session.resume(),
            Err(AppError::InvalidStateTransition(_))
        ));

        session.pause_snapshot().unwrap();
        session.mark_paused();
        session.resume().unwrap();
        assert_eq!(session.status(), AttemptStatus::InProgress);
    }

    #[test]
    fn paused_session_rejects_answers_and_navigation() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(1, &quiz).unwrap();
        session.pause_snapshot().unwrap();
        session.mark_paused();

        assert!(matches!(
            session.select_answer(0, 0),
            Err(AppError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            session.advance(Direction::Next),
            Err(AppError::InvalidStateTransition(_))
        ));
    }

    #[test]
    fn grade_names_first_unanswered_question() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(1, &quiz).unwrap();

        session.select_answer(0, 0).unwrap();
        session.select_answer(2, 0).unwrap();
        session.select_answer(3, 0).unwrap();

        assert!(matches!(
            session.grade(),
            Err(AppError::IncompleteAttempt { first_unanswered: 1 })
        ));
    }

    #[test]
    fn grade_scores_three_of_four_as_75() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(1, &quiz).unwrap();

        for index in 0..3 {
            let correct = correct_option(&session, index);
            session.select_answer(index, correct).unwrap();
        }
        // Deliberately wrong on the last question.
        let correct = correct_option(&session, 3);
        let wrong = (correct + 1) % session.questions[3].options.len();
        session.select_answer(3, wrong).unwrap();

        let score = session.grade().unwrap();
        assert_eq!(score.correct_count, 3);
        assert_eq!(score.total_questions, 4);
        assert_eq!(score.percentage, 75);
    }

    #[test]
    fn completed_session_is_frozen() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(1, &quiz).unwrap();

        for index in 0..4 {
            let correct = correct_option(&session, index);
            session.select_answer(index, correct).unwrap();
        }
        let score = session.grade().unwrap();
        session.complete(score.clone());

        let before = session.answers_snapshot();

        assert!(matches!(
            session.select_answer(0, 0),
            Err(AppError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            session.pause_snapshot(),
            Err(AppError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            session.grade(),
            Err(AppError::InvalidStateTransition(_))
        ));

        assert_eq!(session.answers_snapshot(), before);
        assert_eq!(session.view().score, Some(score));
    }

    #[test]
    fn category_breakdown_requires_completion_and_tallies_per_tag() {
        let quiz = capitals_quiz();
        let mut session = QuizSession::begin(1, &quiz).unwrap();

        assert!(matches!(
            session.category_breakdown(),
            Err(AppError::InvalidStateTransition(_))
        ));

        // Both geography questions right, numbers wrong, untagged right.
        session.select_answer(0, correct_option(&session, 0)).unwrap();
        session.select_answer(1, correct_option(&session, 1)).unwrap();
        let correct = correct_option(&session, 2);
        let wrong = (correct + 1) % session.questions[2].options.len();
        session.select_answer(2, wrong).unwrap();
        session.select_answer(3, correct_option(&session, 3)).unwrap();

        let score = session.grade().unwrap();
        session.complete(score);

        let breakdown = session.category_breakdown().unwrap();
        assert_eq!(breakdown["geography"], CategoryTally { correct: 2, total: 2 });
        assert_eq!(breakdown["numbers"], CategoryTally { correct: 0, total: 1 });
        assert_eq!(breakdown["general"], CategoryTally { correct: 1, total: 1 });
    }

    #[test]
    fn restore_clamps_cursor_to_shrunk_content() {
        let mut quiz = capitals_quiz();
        let attempt = QuizAttempt {
            student_id: 1,
            quiz_id: quiz.id,
            status: AttemptStatus::Paused,
            answers: HashMap::new(),
            current_question_index: 3,
            score: None,
            updated_at: None,
        };

        quiz.questions.truncate(2);
        let restored = QuizSession::restore(1, &quiz, &attempt).unwrap();
        assert_eq!(restored.view().current_question_index, 1);
    }
}
