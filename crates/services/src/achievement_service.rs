use chrono::{DateTime, Utc};
use tracing::info;

use tutor_core::achievements;
use tutor_core::model::{AchievementId, TutorSettings};

use crate::events::{CommandOutcome, TutorEvent};
use crate::session::LearnerSession;

/// Runs the rule table after every mutation and turns unlocks into events.
#[derive(Debug, Clone, Copy)]
pub struct AchievementService {
    settings: TutorSettings,
}

impl AchievementService {
    #[must_use]
    pub fn new(settings: TutorSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &TutorSettings {
        &self.settings
    }

    /// Full re-evaluation against the session's current state.
    ///
    /// Appends one `AchievementUnlocked` event per newly unlocked badge.
    pub fn reevaluate(
        &self,
        session: &mut LearnerSession,
        now: DateTime<Utc>,
        outcome: &mut CommandOutcome,
    ) -> Vec<AchievementId> {
        let learner_id = session.learner_id();
        let (progress, state) = session.evaluation_parts();
        let unlocked = achievements::evaluate(progress, state, &self.settings, now);

        for id in &unlocked {
            let def = id.definition();
            info!(%learner_id, achievement = %id, title = def.title, "achievement unlocked");
            outcome.push(TutorEvent::AchievementUnlocked {
                achievement: *id,
                at: now,
            });
        }
        unlocked
    }

    /// Lock every badge again without touching progress.
    ///
    /// Badges whose predicate still holds come back on the next mutation.
    pub fn reset(&self, session: &mut LearnerSession) {
        info!(learner_id = %session.learner_id(), "achievements reset");
        session.achievements_mut().reset();
    }
}
