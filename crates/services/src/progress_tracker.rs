use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};

use tutor_core::Clock;
use tutor_core::catalog::ContentCatalog;
use tutor_core::model::{GuideId, PageId};

use crate::achievement_service::AchievementService;
use crate::error::TutorError;
use crate::events::{CommandOutcome, EventSink, TutorEvent};
use crate::session::LearnerSession;

/// Records page visits, page completions and guide walkthroughs.
#[derive(Clone)]
pub struct ProgressTracker {
    clock: Clock,
    catalog: Arc<dyn ContentCatalog>,
    achievements: AchievementService,
    sink: Arc<dyn EventSink>,
}

impl ProgressTracker {
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

    /// Record a visit to `page_id`, creating its progress entry on first sight.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::UnknownPage` if the catalog has no such page.
    pub fn visit_page(
        &self,
        session: &mut LearnerSession,
        page_id: &str,
    ) -> Result<CommandOutcome, TutorError> {
        let page_id = self.known_page(page_id)?;
        let now = self.clock.now();
        let mut outcome = CommandOutcome::default();

        let visit_count = session
            .progress_mut()
            .record_visit(page_id.clone(), now)
            .visit_count();
        debug!(learner_id = %session.learner_id(), %page_id, visit_count, "page visited");
        outcome.push(TutorEvent::PageVisited {
            page_id,
            visit_count,
            at: now,
        });

        self.achievements.reevaluate(session, now, &mut outcome);
        outcome.publish(self.sink.as_ref());
        Ok(outcome)
    }

    /// Mark a visited page complete. Completing it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::UnknownPage` for pages outside the catalog and
    /// `TutorError::PageNotVisited` if the page was never visited.
    pub fn complete_page(
        &self,
        session: &mut LearnerSession,
        page_id: &str,
    ) -> Result<CommandOutcome, TutorError> {
        let page_id = self.known_page(page_id)?;
        let now = self.clock.now();
        let learner_id = session.learner_id();
        let mut outcome = CommandOutcome::default();

        let transitioned = session
            .progress_mut()
            .complete_page(&page_id, now)
            .inspect_err(|err| warn!(%learner_id, %err, "complete_page rejected"))?;

        if transitioned {
            let overall_percent = session.progress().overall_percent();
            info!(%learner_id, %page_id, overall_percent, "page completed");
            outcome.push(TutorEvent::PageCompleted {
                page_id,
                overall_percent,
                at: now,
            });
        }

        self.achievements.reevaluate(session, now, &mut outcome);
        outcome.publish(self.sink.as_ref());
        Ok(outcome)
    }

    /// Add reading time to a visited page.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::UnknownPage`, `TutorError::PageNotVisited`, or
    /// `TutorError::Progress` for a negative duration.
    pub fn record_time_spent(
        &self,
        session: &mut LearnerSession,
        page_id: &str,
        spent: Duration,
    ) -> Result<CommandOutcome, TutorError> {
        let page_id = self.known_page(page_id)?;
        let now = self.clock.now();
        let mut outcome = CommandOutcome::default();

        let total = session.progress_mut().add_time_spent(&page_id, spent, now)?;
        debug!(
            learner_id = %session.learner_id(),
            %page_id,
            page_minutes = total.num_minutes(),
            "time recorded"
        );

        self.achievements.reevaluate(session, now, &mut outcome);
        outcome.publish(self.sink.as_ref());
        Ok(outcome)
    }

    /// Advance to the next step of a guide; stays put on the last step.
    /// Returns the zero-based step now shown.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::UnknownGuide` if the catalog has no such guide.
    pub fn next_step(
        &self,
        session: &mut LearnerSession,
        guide_id: &str,
    ) -> Result<usize, TutorError> {
        let (guide_id, step_count) = self.known_guide(guide_id)?;
        let step = session
            .progress_mut()
            .next_guide_step(guide_id.clone(), step_count, self.clock.now());
        debug!(learner_id = %session.learner_id(), %guide_id, step, "guide step");
        Ok(step)
    }

    /// Go back one step; stays put on the first step.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::UnknownGuide` if the catalog has no such guide.
    pub fn previous_step(
        &self,
        session: &mut LearnerSession,
        guide_id: &str,
    ) -> Result<usize, TutorError> {
        let (guide_id, step_count) = self.known_guide(guide_id)?;
        let step = session
            .progress_mut()
            .previous_guide_step(guide_id.clone(), step_count, self.clock.now());
        debug!(learner_id = %session.learner_id(), %guide_id, step, "guide step");
        Ok(step)
    }

    /// Finish a guide from its last step. Finishing it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::UnknownGuide` for guides outside the catalog and
    /// `TutorError::Progress` (`InvalidState`) before the last step.
    pub fn complete_guide(
        &self,
        session: &mut LearnerSession,
        guide_id: &str,
    ) -> Result<CommandOutcome, TutorError> {
        let (guide_id, step_count) = self.known_guide(guide_id)?;
        let now = self.clock.now();
        let learner_id = session.learner_id();
        let mut outcome = CommandOutcome::default();

        let transitioned = session
            .progress_mut()
            .complete_guide(guide_id.clone(), step_count, now)
            .inspect_err(|err| warn!(%learner_id, %err, "complete_guide rejected"))?;

        if transitioned {
            info!(%learner_id, %guide_id, "guide completed");
            outcome.push(TutorEvent::GuideCompleted { guide_id, at: now });
        }

        self.achievements.reevaluate(session, now, &mut outcome);
        outcome.publish(self.sink.as_ref());
        Ok(outcome)
    }

    /// Overall completion percentage over the fixed page total.
    #[must_use]
    pub fn overall_progress(&self, session: &LearnerSession) -> u8 {
        session.progress().overall_percent()
    }

    fn known_page(&self, page_id: &str) -> Result<PageId, TutorError> {
        self.catalog
            .page(page_id.trim())
            .map(|meta| meta.id().clone())
            .ok_or_else(|| {
                warn!(page_id, "unknown page");
                TutorError::UnknownPage(page_id.to_string())
            })
    }

    fn known_guide(&self, guide_id: &str) -> Result<(GuideId, usize), TutorError> {
        self.catalog
            .guide(guide_id.trim())
            .map(|guide| (guide.id().clone(), guide.step_count()))
            .ok_or_else(|| {
                warn!(guide_id, "unknown guide");
                TutorError::UnknownGuide(guide_id.to_string())
            })
    }
}
