use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tutor_core::model::{AchievementState, LearnerId, LearnerProgress, ProgressError};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot failed validation: {0}")]
    InvalidSnapshot(#[from] ProgressError),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Persisted shape of a learner session.
///
/// Only durable state is captured. An in-flight quiz attempt is not part of
/// the snapshot and restarts from scratch after a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub learner_id: LearnerId,
    pub progress: LearnerProgress,
    pub achievements: AchievementState,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn new(
        learner_id: LearnerId,
        progress: LearnerProgress,
        achievements: AchievementState,
        saved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            learner_id,
            progress,
            achievements,
            saved_at,
        }
    }

    /// Encode as a single JSON document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed input and
    /// `StorageError::InvalidSnapshot` if the progress record breaks an invariant.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        let snapshot: Self = serde_json::from_str(raw)?;
        snapshot.progress.validate()?;
        Ok(snapshot)
    }
}

/// Repository contract for learner session snapshots.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Persist or replace the snapshot for `snapshot.learner_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError>;

    /// Fetch the latest snapshot for a learner, `None` if none was saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored document cannot be read back.
    async fn load_snapshot(
        &self,
        learner_id: LearnerId,
    ) -> Result<Option<SessionSnapshot>, StorageError>;

    /// Remove a learner's snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no snapshot exists.
    async fn delete_snapshot(&self, learner_id: LearnerId) -> Result<(), StorageError>;
}

/// Process-local repository that stores encoded snapshots in a map.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    snapshots: Arc<Mutex<HashMap<LearnerId, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of stored snapshots.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let encoded = snapshot.to_json()?;
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(snapshot.learner_id, encoded);
        Ok(())
    }

    async fn load_snapshot(
        &self,
        learner_id: LearnerId,
    ) -> Result<Option<SessionSnapshot>, StorageError> {
        let encoded = {
            let guard = self
                .snapshots
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            guard.get(&learner_id).cloned()
        };
        encoded.as_deref().map(SessionSnapshot::from_json).transpose()
    }

    async fn delete_snapshot(&self, learner_id: LearnerId) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .remove(&learner_id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

/// Repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub snapshots: Arc<dyn SnapshotRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let snapshots: Arc<dyn SnapshotRepository> = Arc::new(InMemoryRepository::new());
        Self { snapshots }
    }
}
