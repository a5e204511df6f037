use std::sync::Arc;
use tracing::{debug, info, warn};

use tutor_core::Clock;
use tutor_core::catalog::ContentCatalog;
use tutor_core::model::{AnswerFeedback, QuizScore, QuizSession, QuizState};

use crate::achievement_service::AchievementService;
use crate::error::TutorError;
use crate::events::{CommandOutcome, EventSink, TutorEvent};
use crate::session::LearnerSession;

/// Result of a command that moves the quiz forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizStep {
    pub state: QuizState,
    /// Set once the step finished the quiz.
    pub score: Option<QuizScore>,
    pub outcome: CommandOutcome,
}

/// Drives the learner's active quiz and writes finished scores into progress.
#[derive(Clone)]
pub struct QuizController {
    clock: Clock,
    catalog: Arc<dyn ContentCatalog>,
    achievements: AchievementService,
    sink: Arc<dyn EventSink>,
}

impl QuizController {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn ContentCatalog>,
        achievements: AchievementService,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            clock,
            catalog,
            achievements,
            sink,
        }
    }

    pub(crate) fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    /// Begin a quiz on `section_id`, replacing any quiz already in progress.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::UnknownSection` if the catalog has no such section.
    pub fn start(
        &self,
        session: &mut LearnerSession,
        section_id: &str,
    ) -> Result<QuizState, TutorError> {
        let section = self
            .catalog
            .section(section_id.trim())
            .ok_or_else(|| {
                warn!(section_id, "unknown quiz section");
                TutorError::UnknownSection(section_id.to_string())
            })?
            .clone();

        let quiz = QuizSession::start(section);
        let state = quiz.state();
        if let Some(previous) = session.replace_quiz(Some(quiz)) {
            debug!(
                learner_id = %session.learner_id(),
                section_id = %previous.section_id(),
                "active quiz replaced"
            );
        }
        debug!(learner_id = %session.learner_id(), section_id, "quiz started");
        Ok(state)
    }

    /// Start the section over. Its previous score stays recorded until the
    /// new attempt completes.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::UnknownSection` if the catalog has no such section.
    pub fn retake(
        &self,
        session: &mut LearnerSession,
        section_id: &str,
    ) -> Result<QuizState, TutorError> {
        if let Some(previous) = session.progress().quiz_score(section_id.trim()) {
            debug!(
                learner_id = %session.learner_id(),
                section_id,
                previous_percentage = previous.percentage(),
                "retaking quiz"
            );
        }
        self.start(session, section_id)
    }

    /// Answer the current question.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::NoActiveQuiz` without a quiz, or `TutorError::Quiz`
    /// when the quiz is not awaiting an answer or the option is out of range.
    pub fn submit_answer(
        &self,
        session: &mut LearnerSession,
        option_index: usize,
    ) -> Result<AnswerFeedback, TutorError> {
        let now = self.clock.now();
        let learner_id = session.learner_id();
        let feedback = Self::active(session)?
            .submit_answer(option_index)
            .inspect_err(|err| warn!(%learner_id, %err, "answer rejected"))?;

        session.progress_mut().record_answer(feedback.is_correct, now);
        debug!(
            %learner_id,
            question_index = feedback.question_index,
            correct = feedback.is_correct,
            "answer recorded"
        );
        Ok(feedback)
    }

    /// Skip the current question; it counts as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::NoActiveQuiz` or `TutorError::Quiz` when the quiz
    /// is not awaiting an answer.
    pub fn skip(&self, session: &mut LearnerSession) -> Result<QuizStep, TutorError> {
        let learner_id = session.learner_id();
        let state = Self::active(session)?
            .skip()
            .inspect_err(|err| warn!(%learner_id, %err, "skip rejected"))?;
        debug!(%learner_id, state = state.name(), "question skipped");
        self.step(session, state)
    }

    /// Leave the feedback view for the next question, or finish the quiz.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::NoActiveQuiz` or `TutorError::Quiz` when no
    /// feedback is showing.
    pub fn advance(&self, session: &mut LearnerSession) -> Result<QuizStep, TutorError> {
        let learner_id = session.learner_id();
        let state = Self::active(session)?
            .advance()
            .inspect_err(|err| warn!(%learner_id, %err, "advance rejected"))?;
        self.step(session, state)
    }

    /// Mark a section done. Needs a recorded score for it; repeat calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::UnknownSection` or `TutorError::ScoreNotRecorded`.
    pub fn mark_section_complete(
        &self,
        session: &mut LearnerSession,
        section_id: &str,
    ) -> Result<CommandOutcome, TutorError> {
        let section_id = self
            .catalog
            .section(section_id.trim())
            .map(|section| section.id().clone())
            .ok_or_else(|| TutorError::UnknownSection(section_id.to_string()))?;
        if session.progress().quiz_score(section_id.as_str()).is_none() {
            warn!(learner_id = %session.learner_id(), %section_id, "section has no score yet");
            return Err(TutorError::ScoreNotRecorded(section_id));
        }

        let now = self.clock.now();
        let mut outcome = CommandOutcome::default();
        if session
            .progress_mut()
            .mark_section_completed(section_id.clone(), now)
        {
            info!(learner_id = %session.learner_id(), %section_id, "section completed");
            outcome.push(TutorEvent::SectionCompleted {
                section_id,
                at: now,
            });
        }
        self.achievements.reevaluate(session, now, &mut outcome);
        outcome.publish(self.sink.as_ref());
        Ok(outcome)
    }

    /// Drop the active quiz without recording anything.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::NoActiveQuiz` if nothing is in progress.
    pub fn abandon(&self, session: &mut LearnerSession) -> Result<(), TutorError> {
        let quiz = session.replace_quiz(None).ok_or(TutorError::NoActiveQuiz)?;
        debug!(
            learner_id = %session.learner_id(),
            section_id = %quiz.section_id(),
            state = quiz.state().name(),
            "quiz abandoned"
        );
        Ok(())
    }

    fn active(session: &mut LearnerSession) -> Result<&mut QuizSession, TutorError> {
        let learner_id = session.learner_id();
        session.quiz_mut().ok_or_else(|| {
            warn!(%learner_id, "no quiz in progress");
            TutorError::NoActiveQuiz
        })
    }

    fn step(&self, session: &mut LearnerSession, state: QuizState) -> Result<QuizStep, TutorError> {
        let mut outcome = CommandOutcome::default();
        if state != QuizState::Completed {
            return Ok(QuizStep {
                state,
                score: None,
                outcome,
            });
        }

        let now = self.clock.now();
        let score = Self::active(session)?.score(now)?;
        session.progress_mut().record_quiz_score(score.clone());
        info!(
            learner_id = %session.learner_id(),
            section_id = %score.section_id(),
            percentage = score.percentage(),
            "quiz completed"
        );
        outcome.push(TutorEvent::QuizCompleted {
            score: score.clone(),
        });

        self.achievements.reevaluate(session, now, &mut outcome);
        outcome.publish(self.sink.as_ref());
        Ok(QuizStep {
            state,
            score: Some(score),
            outcome,
        })
    }
}
