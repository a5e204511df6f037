use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::model::ids::SectionId;
use crate::model::quiz::{Question, QuizScore, QuizScoreError, QuizSection};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("cannot {action} while the quiz is {state}")]
    InvalidState {
        state: &'static str,
        action: &'static str,
    },

    #[error("option {index} is out of range for a question with {options} options")]
    OptionOutOfRange { index: usize, options: usize },

    #[error(transparent)]
    Score(#[from] QuizScoreError),
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where a quiz attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuizState {
    AwaitingAnswer { question_index: usize },
    ShowingFeedback { question_index: usize },
    Completed,
}

impl QuizState {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AwaitingAnswer { .. } => "awaiting an answer",
            Self::ShowingFeedback { .. } => "showing feedback",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub fn question_index(self) -> Option<usize> {
        match self {
            Self::AwaitingAnswer { question_index } | Self::ShowingFeedback { question_index } => {
                Some(question_index)
            }
            Self::Completed => None,
        }
    }
}

impl fmt::Display for QuizState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the learner sees after submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerFeedback {
    pub question_index: usize,
    pub selected: usize,
    pub correct_index: usize,
    pub is_correct: bool,
    pub explanation: String,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a quiz section, driven a question at a time.
///
/// `AwaitingAnswer(i)` → `submit_answer` → `ShowingFeedback(i)` → `advance` →
/// `AwaitingAnswer(i + 1)` or `Completed`. `skip` goes straight from
/// `AwaitingAnswer(i)` to the next question without recording an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    section: QuizSection,
    state: QuizState,
    selected_answers: BTreeMap<usize, usize>,
}

impl QuizSession {
    /// Begin at the first question with no answers recorded.
    #[must_use]
    pub fn start(section: QuizSection) -> Self {
        Self {
            section,
            state: QuizState::AwaitingAnswer { question_index: 0 },
            selected_answers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn section(&self) -> &QuizSection {
        &self.section
    }

    #[must_use]
    pub fn section_id(&self) -> &SectionId {
        self.section.id()
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == QuizState::Completed
    }

    #[must_use]
    pub fn current_question_index(&self) -> Option<usize> {
        self.state.question_index()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_question_index()
            .and_then(|idx| self.section.question(idx))
    }

    #[must_use]
    pub fn selected_answers(&self) -> &BTreeMap<usize, usize> {
        &self.selected_answers
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.section.len()
    }

    /// Record an answer for the current question and show feedback.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless awaiting an answer, and
    /// `QuizSessionError::OptionOutOfRange` if `option_index` is not an option
    /// of the current question. Neither error changes the session.
    pub fn submit_answer(
        &mut self,
        option_index: usize,
    ) -> Result<AnswerFeedback, QuizSessionError> {
        let QuizState::AwaitingAnswer { question_index } = self.state else {
            return Err(self.invalid("submit an answer"));
        };
        let question = self
            .section
            .question(question_index)
            .ok_or_else(|| self.invalid("submit an answer"))?;
        if option_index >= question.option_count() {
            return Err(QuizSessionError::OptionOutOfRange {
                index: option_index,
                options: question.option_count(),
            });
        }

        let feedback = AnswerFeedback {
            question_index,
            selected: option_index,
            correct_index: question.correct_index(),
            is_correct: question.is_correct(option_index),
            explanation: question.explanation().to_string(),
        };
        self.selected_answers.insert(question_index, option_index);
        self.state = QuizState::ShowingFeedback { question_index };
        Ok(feedback)
    }

    /// Move past the current question without answering it.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless awaiting an answer.
    pub fn skip(&mut self) -> Result<QuizState, QuizSessionError> {
        let QuizState::AwaitingAnswer { question_index } = self.state else {
            return Err(self.invalid("skip a question"));
        };
        Ok(self.step_from(question_index))
    }

    /// Acknowledge feedback and move to the next question or finish.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless showing feedback.
    pub fn advance(&mut self) -> Result<QuizState, QuizSessionError> {
        let QuizState::ShowingFeedback { question_index } = self.state else {
            return Err(self.invalid("advance"));
        };
        Ok(self.step_from(question_index))
    }

    fn step_from(&mut self, question_index: usize) -> QuizState {
        let next = question_index + 1;
        self.state = if next >= self.section.len() {
            QuizState::Completed
        } else {
            QuizState::AwaitingAnswer {
                question_index: next,
            }
        };
        self.state
    }

    /// Recorded answers that match their question's correct option.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.selected_answers
            .iter()
            .filter(|&(&idx, &choice)| {
                self.section
                    .question(idx)
                    .is_some_and(|q| q.is_correct(choice))
            })
            .count()
    }

    /// Final score; skipped questions count as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` if the quiz is not completed.
    pub fn score(&self, completed_at: DateTime<Utc>) -> Result<QuizScore, QuizSessionError> {
        if !self.is_completed() {
            return Err(self.invalid("score"));
        }
        let correct = u32::try_from(self.correct_count()).unwrap_or(u32::MAX);
        let total = u32::try_from(self.total_questions()).unwrap_or(u32::MAX);
        Ok(QuizScore::from_counts(
            self.section_id().clone(),
            correct,
            total,
            completed_at,
        )?)
    }

    fn invalid(&self, action: &'static str) -> QuizSessionError {
        QuizSessionError::InvalidState {
            state: self.state.name(),
            action,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuestionId;
    use crate::time::fixed_now;

    fn section(correct: &[usize]) -> QuizSection {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Question::new(
                    QuestionId::new(format!("q{i}")).unwrap(),
                    format!("Question {i}"),
                    vec!["a".into(), "b".into(), "c".into()],
                    c,
                    "because",
                )
                .unwrap()
            })
            .collect();
        QuizSection::new(SectionId::new("command-line").unwrap(), "CLI", "", questions).unwrap()
    }

    fn answer_all(session: &mut QuizSession, answers: &[usize]) {
        for &a in answers {
            session.submit_answer(a).unwrap();
            session.advance().unwrap();
        }
    }

    #[test]
    fn two_of_three_scores_sixty_seven() {
        let mut session = QuizSession::start(section(&[1, 2, 0]));
        answer_all(&mut session, &[1, 2, 1]);

        assert!(session.is_completed());
        let score = session.score(fixed_now()).unwrap();
        assert_eq!(score.correct_count(), 2);
        assert_eq!(score.total_count(), 3);
        assert_eq!(score.percentage(), 67);
    }

    #[test]
    fn skipping_everything_scores_zero() {
        let mut session = QuizSession::start(section(&[1, 2, 0]));
        assert_eq!(
            session.skip().unwrap(),
            QuizState::AwaitingAnswer { question_index: 1 }
        );
        session.skip().unwrap();
        assert_eq!(session.skip().unwrap(), QuizState::Completed);

        assert!(session.selected_answers().is_empty());
        let score = session.score(fixed_now()).unwrap();
        assert_eq!(score.correct_count(), 0);
        assert_eq!(score.percentage(), 0);
    }

    #[test]
    fn feedback_reports_correctness() {
        let mut session = QuizSession::start(section(&[2]));
        let feedback = session.submit_answer(0).unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.correct_index, 2);
        assert_eq!(feedback.explanation, "because");
        assert_eq!(
            session.state(),
            QuizState::ShowingFeedback { question_index: 0 }
        );
    }

    #[test]
    fn out_of_range_option_leaves_state_untouched() {
        let mut session = QuizSession::start(section(&[0, 1]));
        let err = session.submit_answer(3).unwrap_err();
        assert_eq!(err, QuizSessionError::OptionOutOfRange { index: 3, options: 3 });
        assert_eq!(session.state(), QuizState::AwaitingAnswer { question_index: 0 });
        assert!(session.selected_answers().is_empty());
    }

    #[test]
    fn transitions_are_guarded() {
        let mut session = QuizSession::start(section(&[0, 1]));
        assert!(matches!(
            session.advance(),
            Err(QuizSessionError::InvalidState { action: "advance", .. })
        ));

        session.submit_answer(0).unwrap();
        assert!(matches!(
            session.submit_answer(1),
            Err(QuizSessionError::InvalidState { state: "showing feedback", .. })
        ));
        assert!(session.skip().is_err());
        assert!(session.score(fixed_now()).is_err());

        session.advance().unwrap();
        session.submit_answer(1).unwrap();
        assert_eq!(session.advance().unwrap(), QuizState::Completed);
        assert!(matches!(
            session.submit_answer(0),
            Err(QuizSessionError::InvalidState { state: "completed", .. })
        ));
        assert_eq!(session.score(fixed_now()).unwrap().percentage(), 100);
    }

    #[test]
    fn mixed_answers_and_skips() {
        let mut session = QuizSession::start(section(&[0, 1, 2, 0]));
        session.submit_answer(0).unwrap();
        session.advance().unwrap();
        session.skip().unwrap();
        session.submit_answer(2).unwrap();
        session.advance().unwrap();
        session.submit_answer(1).unwrap();
        session.advance().unwrap();

        let score = session.score(fixed_now()).unwrap();
        assert_eq!(score.correct_count(), 2);
        assert_eq!(score.percentage(), 50);
        assert_eq!(session.selected_answers().len(), 3);
    }
}
