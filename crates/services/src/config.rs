//! Startup configuration: validated settings plus the content catalog.

use tutor_core::catalog::{ContentCatalog, InMemoryCatalog};
use tutor_core::model::{QuizSection, TutorSettings, TutorSettingsDraft};

/// Everything a `TutorService` needs before the first command.
///
/// The configured page total always matches the catalog's page list.
#[derive(Debug, Clone)]
pub struct TutorConfig {
    settings: TutorSettings,
    catalog: InMemoryCatalog,
}

impl TutorConfig {
    /// Pair settings with a catalog.
    ///
    /// # Errors
    ///
    /// Returns `tutor_core::Error::Settings` if `total_pages` differs from the
    /// number of catalog pages.
    pub fn new(
        settings: TutorSettings,
        catalog: InMemoryCatalog,
    ) -> Result<Self, tutor_core::Error> {
        settings.check_page_count(catalog.pages().len())?;
        Ok(Self { settings, catalog })
    }

    /// Default settings over the standard tutorial pages and guides.
    ///
    /// # Errors
    ///
    /// Returns `tutor_core::Error::Catalog` if two sections share an id.
    pub fn standard(sections: Vec<QuizSection>) -> Result<Self, tutor_core::Error> {
        Self::new(TutorSettings::default(), InMemoryCatalog::standard(sections)?)
    }

    /// Build from JSON documents. A missing settings document means defaults.
    ///
    /// # Errors
    ///
    /// Returns `tutor_core::Error::Settings` or `tutor_core::Error::Catalog`
    /// when either document is malformed or fails validation, including a
    /// page total that disagrees with the catalog.
    pub fn from_json(settings: Option<&str>, catalog: &str) -> Result<Self, tutor_core::Error> {
        let draft = match settings {
            Some(raw) => TutorSettingsDraft::from_json(raw)?,
            None => TutorSettingsDraft::new(),
        };
        Self::new(draft.validate()?, InMemoryCatalog::from_json(catalog)?)
    }

    #[must_use]
    pub fn settings(&self) -> &TutorSettings {
        &self.settings
    }

    #[must_use]
    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }

    pub(crate) fn into_parts(self) -> (TutorSettings, InMemoryCatalog) {
        (self.settings, self.catalog)
    }
}
