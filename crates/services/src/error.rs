//! Shared error types for the services crate.

use thiserror::Error;

use tutor_core::model::{LearnerId, PageId, ProgressError, QuizSessionError, SectionId};
use tutor_storage::StorageError;

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The command is not allowed in the current state (page never visited,
    /// answering while feedback is shown, ...). Nothing was mutated.
    InvalidState,
    /// The command named something out of range or unknown. Nothing was mutated.
    InvalidInput,
    /// The persistence boundary failed.
    Storage,
}

/// Errors emitted by the tutor services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorError {
    #[error("page not visited: {0}")]
    PageNotVisited(PageId),

    #[error("unknown page: {0}")]
    UnknownPage(String),

    #[error("unknown quiz section: {0}")]
    UnknownSection(String),

    #[error("unknown guide: {0}")]
    UnknownGuide(String),

    #[error("no quiz in progress")]
    NoActiveQuiz,

    #[error("no score recorded for section {0}")]
    ScoreNotRecorded(SectionId),

    #[error("no saved session for learner {0}")]
    SnapshotNotFound(LearnerId),

    #[error("snapshot for {learner_id} tracks {total_pages} pages, expected {expected}")]
    IncompatibleSnapshot {
        learner_id: LearnerId,
        total_pages: u32,
        expected: u32,
    },

    #[error(transparent)]
    Quiz(#[from] QuizSessionError),

    #[error(transparent)]
    Progress(ProgressError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TutorError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PageNotVisited(_)
            | Self::NoActiveQuiz
            | Self::ScoreNotRecorded(_)
            | Self::Progress(ProgressError::GuideStepsRemaining { .. })
            | Self::Quiz(QuizSessionError::InvalidState { .. } | QuizSessionError::Score(_)) => {
                ErrorKind::InvalidState
            }
            Self::Storage(_) | Self::SnapshotNotFound(_) | Self::IncompatibleSnapshot { .. } => {
                ErrorKind::Storage
            }
            _ => ErrorKind::InvalidInput,
        }
    }
}

impl From<ProgressError> for TutorError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::PageNotVisited(page_id) => Self::PageNotVisited(page_id),
            other => Self::Progress(other),
        }
    }
}
