use thiserror::Error;

use crate::catalog::CatalogError;
use crate::model::{ProgressError, QuizContentError, QuizSessionError, TutorSettingsError};

/// Umbrella error for callers that do not care which domain rule failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    QuizSession(#[from] QuizSessionError),
    #[error(transparent)]
    QuizContent(#[from] QuizContentError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Settings(#[from] TutorSettingsError),
}
