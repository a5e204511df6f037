use chrono::{DateTime, Utc};
use std::fmt;

use tutor_core::model::{
    AchievementState, LearnerId, LearnerProgress, ProgressError, QuizSession, TutorSettings,
};
use tutor_storage::SessionSnapshot;

/// All state owned by one learner, passed explicitly into every command.
///
/// Commands take `&mut LearnerSession`, so mutations are serialized by the
/// borrow checker.
#[derive(Clone, PartialEq, Eq)]
pub struct LearnerSession {
    learner_id: LearnerId,
    progress: LearnerProgress,
    achievements: AchievementState,
    quiz: Option<QuizSession>,
}

impl LearnerSession {
    /// Start a fresh session with nothing visited and every badge locked.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidTotalPages` if the settings' page count is zero.
    pub fn new(
        learner_id: LearnerId,
        settings: &TutorSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        Ok(Self {
            learner_id,
            progress: LearnerProgress::new(settings.total_pages(), now)?,
            achievements: AchievementState::new(),
            quiz: None,
        })
    }

    /// Rebuild a session from a saved snapshot. No quiz is in progress afterwards.
    #[must_use]
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            learner_id: snapshot.learner_id,
            progress: snapshot.progress,
            achievements: snapshot.achievements,
            quiz: None,
        }
    }

    #[must_use]
    pub fn to_snapshot(&self, saved_at: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot::new(
            self.learner_id,
            self.progress.clone(),
            self.achievements.clone(),
            saved_at,
        )
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn progress(&self) -> &LearnerProgress {
        &self.progress
    }

    #[must_use]
    pub fn achievements(&self) -> &AchievementState {
        &self.achievements
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizSession> {
        self.quiz.as_ref()
    }

    pub(crate) fn progress_mut(&mut self) -> &mut LearnerProgress {
        &mut self.progress
    }

    pub(crate) fn quiz_mut(&mut self) -> Option<&mut QuizSession> {
        self.quiz.as_mut()
    }

    pub(crate) fn replace_quiz(&mut self, quiz: Option<QuizSession>) -> Option<QuizSession> {
        std::mem::replace(&mut self.quiz, quiz)
    }

    /// Split borrow for the evaluator, which reads progress and writes badges.
    pub(crate) fn evaluation_parts(&mut self) -> (&LearnerProgress, &mut AchievementState) {
        (&self.progress, &mut self.achievements)
    }

    pub(crate) fn achievements_mut(&mut self) -> &mut AchievementState {
        &mut self.achievements
    }
}

impl fmt::Debug for LearnerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearnerSession")
            .field("learner_id", &self.learner_id)
            .field("pages_len", &self.progress.pages().len())
            .field("overall_percent", &self.progress.overall_percent())
            .field("unlocked", &self.achievements.unlocked_count())
            .field("quiz", &self.quiz.as_ref().map(QuizSession::state))
            .finish_non_exhaustive()
    }
}
