use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of tutorial pages counted towards overall progress.
pub const DEFAULT_TOTAL_PAGES: u32 = 11;
/// Average quiz percentage that unlocks `knowledge_seeker`.
pub const DEFAULT_KNOWLEDGE_SEEKER_THRESHOLD: u8 = 80;
/// Minutes of recorded reading time that unlock `dedicated_learner`.
pub const DEFAULT_DEDICATED_LEARNER_MINUTES: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TutorSettings {
    total_pages: u32,
    knowledge_seeker_threshold: u8,
    dedicated_learner_minutes: u32,
}

/// Unvalidated settings, as read from a config document. Missing fields fall
/// back to the defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TutorSettingsDraft {
    pub total_pages: Option<u32>,
    pub knowledge_seeker_threshold: Option<u8>,
    pub dedicated_learner_minutes: Option<u32>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorSettingsError {
    #[error("total pages must be > 0")]
    InvalidTotalPages,
    #[error("knowledge seeker threshold must be between 1 and 100, got {0}")]
    InvalidKnowledgeSeekerThreshold(u8),
    #[error("dedicated learner minutes must be > 0")]
    InvalidDedicatedLearnerMinutes,
    #[error("total pages is {configured} but the catalog lists {catalog} pages")]
    PageCountMismatch { configured: u32, catalog: usize },
    #[error("malformed settings document: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl TutorSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON settings document.
    ///
    /// # Errors
    ///
    /// Returns `TutorSettingsError::Malformed` on bad JSON or unknown keys.
    pub fn from_json(raw: &str) -> Result<Self, TutorSettingsError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Fill defaults and validate.
    ///
    /// # Errors
    ///
    /// Returns `TutorSettingsError` if any value is out of range.
    pub fn validate(self) -> Result<TutorSettings, TutorSettingsError> {
        let total_pages = self.total_pages.unwrap_or(DEFAULT_TOTAL_PAGES);
        let knowledge_seeker_threshold = self
            .knowledge_seeker_threshold
            .unwrap_or(DEFAULT_KNOWLEDGE_SEEKER_THRESHOLD);
        let dedicated_learner_minutes = self
            .dedicated_learner_minutes
            .unwrap_or(DEFAULT_DEDICATED_LEARNER_MINUTES);

        if total_pages == 0 {
            return Err(TutorSettingsError::InvalidTotalPages);
        }
        if !(1..=100).contains(&knowledge_seeker_threshold) {
            return Err(TutorSettingsError::InvalidKnowledgeSeekerThreshold(
                knowledge_seeker_threshold,
            ));
        }
        if dedicated_learner_minutes == 0 {
            return Err(TutorSettingsError::InvalidDedicatedLearnerMinutes);
        }

        Ok(TutorSettings {
            total_pages,
            knowledge_seeker_threshold,
            dedicated_learner_minutes,
        })
    }
}

impl TutorSettings {
    /// Parse and validate a JSON settings document in one step.
    ///
    /// # Errors
    ///
    /// Returns `TutorSettingsError` for malformed JSON or invalid values.
    pub fn from_json(raw: &str) -> Result<Self, TutorSettingsError> {
        TutorSettingsDraft::from_json(raw)?.validate()
    }

    /// `total_pages` must equal the number of pages in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `TutorSettingsError::PageCountMismatch` if the counts differ.
    pub fn check_page_count(&self, catalog_pages: usize) -> Result<(), TutorSettingsError> {
        if usize::try_from(self.total_pages).is_ok_and(|total| total == catalog_pages) {
            return Ok(());
        }
        Err(TutorSettingsError::PageCountMismatch {
            configured: self.total_pages,
            catalog: catalog_pages,
        })
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    #[must_use]
    pub fn knowledge_seeker_threshold(&self) -> u8 {
        self.knowledge_seeker_threshold
    }

    #[must_use]
    pub fn dedicated_learner_minutes(&self) -> u32 {
        self.dedicated_learner_minutes
    }
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            total_pages: DEFAULT_TOTAL_PAGES,
            knowledge_seeker_threshold: DEFAULT_KNOWLEDGE_SEEKER_THRESHOLD,
            dedicated_learner_minutes: DEFAULT_DEDICATED_LEARNER_MINUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_yields_defaults() {
        let settings = TutorSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, TutorSettings::default());
        assert_eq!(settings.total_pages(), 11);
    }

    #[test]
    fn json_overrides_selected_fields() {
        let settings = TutorSettings::from_json(r#"{"knowledge_seeker_threshold": 90}"#).unwrap();
        assert_eq!(settings.knowledge_seeker_threshold(), 90);
        assert_eq!(settings.dedicated_learner_minutes(), 30);
    }

    #[test]
    fn page_count_must_match_catalog() {
        let settings = TutorSettings::default();
        assert!(settings.check_page_count(11).is_ok());
        assert!(matches!(
            settings.check_page_count(12),
            Err(TutorSettingsError::PageCountMismatch {
                configured: 11,
                catalog: 12
            })
        ));
        let small = TutorSettings::from_json(r#"{"total_pages": 1}"#).unwrap();
        assert!(small.check_page_count(1).is_ok());
        assert!(small.check_page_count(11).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            TutorSettings::from_json(r#"{"total_pages": 0}"#),
            Err(TutorSettingsError::InvalidTotalPages)
        ));
        assert!(matches!(
            TutorSettings::from_json(r#"{"knowledge_seeker_threshold": 101}"#),
            Err(TutorSettingsError::InvalidKnowledgeSeekerThreshold(101))
        ));
        assert!(matches!(
            TutorSettings::from_json(r#"{"pages": 3}"#),
            Err(TutorSettingsError::Malformed(_))
        ));
    }
}
