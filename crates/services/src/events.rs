use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

use tutor_core::model::{AchievementId, GuideId, PageId, QuizScore, SectionId};

/// Notable things the engine reports to the presentation layer.
///
/// These are plain values; formatting banners or confetti is up to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TutorEvent {
    PageVisited {
        page_id: PageId,
        visit_count: u32,
        at: DateTime<Utc>,
    },
    PageCompleted {
        page_id: PageId,
        overall_percent: u8,
        at: DateTime<Utc>,
    },
    AchievementUnlocked {
        achievement: AchievementId,
        at: DateTime<Utc>,
    },
    QuizCompleted {
        score: QuizScore,
    },
    SectionCompleted {
        section_id: SectionId,
        at: DateTime<Utc>,
    },
    GuideCompleted {
        guide_id: GuideId,
        at: DateTime<Utc>,
    },
}

/// Write-only destination for events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &TutorEvent);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &TutorEvent) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TutorEvent>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<TutorEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns and clears the recorded events.
    pub fn drain(&self) -> Vec<TutorEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &TutorEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Events produced by a single command, in the order they happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    events: Vec<TutorEvent>,
}

impl CommandOutcome {
    #[must_use]
    pub fn events(&self) -> &[TutorEvent] {
        &self.events
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Achievements unlocked by the command, for celebration banners.
    #[must_use]
    pub fn unlocked(&self) -> Vec<AchievementId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TutorEvent::AchievementUnlocked { achievement, .. } => Some(*achievement),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TutorEvent> {
        self.events
    }

    pub(crate) fn push(&mut self, event: TutorEvent) {
        self.events.push(event);
    }

    pub(crate) fn publish(&self, sink: &dyn EventSink) {
        for event in &self.events {
            sink.emit(event);
        }
    }
}
