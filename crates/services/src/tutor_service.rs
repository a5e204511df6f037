use std::sync::Arc;
use tracing::{debug, info, warn};

use tutor_core::catalog::ContentCatalog;
use tutor_core::model::{LearnerId, TutorSettings};
use tutor_storage::{SessionSnapshot, SnapshotRepository, Storage, StorageError};

use crate::Clock;
use crate::achievement_service::AchievementService;
use crate::config::TutorConfig;
use crate::error::TutorError;
use crate::events::{EventSink, NoopSink};
use crate::progress_tracker::ProgressTracker;
use crate::quiz_controller::QuizController;
use crate::session::LearnerSession;

/// Assembles the tracker, quiz controller and achievement service over one
/// catalog, clock and snapshot store.
#[derive(Clone)]
pub struct TutorService {
    clock: Clock,
    settings: TutorSettings,
    catalog: Arc<dyn ContentCatalog>,
    progress: ProgressTracker,
    quizzes: QuizController,
    achievements: AchievementService,
    snapshots: Arc<dyn SnapshotRepository>,
}

impl TutorService {
    #[must_use]
    pub fn new(
        config: TutorConfig,
        storage: &Storage,
        sink: Arc<dyn EventSink>,
        clock: Clock,
    ) -> Self {
        let (settings, catalog) = config.into_parts();
        let catalog: Arc<dyn ContentCatalog> = Arc::new(catalog);
        let achievements = AchievementService::new(settings);
        let progress = ProgressTracker::new(
            clock,
            Arc::clone(&catalog),
            achievements,
            Arc::clone(&sink),
        );
        let quizzes = QuizController::new(clock, Arc::clone(&catalog), achievements, sink);

        Self {
            clock,
            settings,
            catalog,
            progress,
            quizzes,
            achievements,
            snapshots: Arc::clone(&storage.snapshots),
        }
    }

    /// In-memory snapshots, no event sink, system clock.
    #[must_use]
    pub fn in_memory(config: TutorConfig) -> Self {
        Self::new(
            config,
            &Storage::in_memory(),
            Arc::new(NoopSink),
            Clock::default(),
        )
    }

    /// Fresh session for a new learner.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Progress` if the configured page total is invalid.
    pub fn start_session(&self) -> Result<LearnerSession, TutorError> {
        self.start_session_for(LearnerId::new_random())
    }

    /// Fresh session under a known learner id.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Progress` if the configured page total is invalid.
    pub fn start_session_for(&self, learner_id: LearnerId) -> Result<LearnerSession, TutorError> {
        let session = LearnerSession::new(learner_id, &self.settings, self.clock.now())?;
        debug!(%learner_id, "session started");
        Ok(session)
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Swap the clock for every component.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
        self.progress.set_clock(clock);
        self.quizzes.set_clock(clock);
    }

    #[must_use]
    pub fn settings(&self) -> &TutorSettings {
        &self.settings
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn ContentCatalog {
        self.catalog.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    #[must_use]
    pub fn quizzes(&self) -> &QuizController {
        &self.quizzes
    }

    #[must_use]
    pub fn achievements(&self) -> &AchievementService {
        &self.achievements
    }

    pub fn reset_achievements(&self, session: &mut LearnerSession) {
        self.achievements.reset(session);
    }

    /// Throw away all progress, badges and any active quiz, keeping the learner id.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Progress` if the configured page total is invalid.
    pub fn clear_session(&self, session: &mut LearnerSession) -> Result<(), TutorError> {
        *session = LearnerSession::new(session.learner_id(), &self.settings, self.clock.now())?;
        info!(learner_id = %session.learner_id(), "session cleared");
        Ok(())
    }

    /// Persist the session's progress and badges. Any active quiz is not saved.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Storage` if the repository rejects the snapshot.
    pub async fn save(&self, session: &LearnerSession) -> Result<SessionSnapshot, TutorError> {
        let snapshot = session.to_snapshot(self.clock.now());
        self.snapshots.save_snapshot(&snapshot).await?;
        debug!(learner_id = %session.learner_id(), "snapshot saved");
        Ok(snapshot)
    }

    /// Load the learner's last snapshot as a live session.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::SnapshotNotFound` if nothing was saved,
    /// `TutorError::IncompatibleSnapshot` if it was saved against a different
    /// page total, or `TutorError::Storage` if it cannot be read.
    pub async fn restore(&self, learner_id: LearnerId) -> Result<LearnerSession, TutorError> {
        let snapshot = self
            .snapshots
            .load_snapshot(learner_id)
            .await?
            .ok_or(TutorError::SnapshotNotFound(learner_id))?;
        let total_pages = snapshot.progress.total_pages();
        let expected = self.settings.total_pages();
        if total_pages != expected {
            warn!(%learner_id, total_pages, expected, "snapshot page total mismatch");
            return Err(TutorError::IncompatibleSnapshot {
                learner_id,
                total_pages,
                expected,
            });
        }
        debug!(%learner_id, saved_at = %snapshot.saved_at, "snapshot restored");
        Ok(LearnerSession::from_snapshot(snapshot))
    }

    /// Delete the learner's saved snapshot.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::SnapshotNotFound` if nothing was saved.
    pub async fn forget(&self, learner_id: LearnerId) -> Result<(), TutorError> {
        match self.snapshots.delete_snapshot(learner_id).await {
            Ok(()) => {
                debug!(%learner_id, "snapshot deleted");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(TutorError::SnapshotNotFound(learner_id)),
            Err(err) => Err(err.into()),
        }
    }
}
