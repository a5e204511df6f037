//! Read-only content the engine indexes into: tutorial pages, quiz sections
//! and step-by-step guides.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{
    Guide, GuideContentError, GuideId, GuideStep, PageId, ParseIdError, Question, QuestionId,
    QuizContentError, QuizSection, SectionId,
};

/// Page ids of the standard tutorial, in navigation order.
pub mod page_ids {
    pub const HOME: &str = "home";
    pub const GETTING_STARTED: &str = "getting-started";
    pub const CONCEPTS: &str = "concepts";
    pub const FIRST_REPO: &str = "first-repo";
    pub const COMMAND_LINE: &str = "command-line";
    pub const COLLABORATION: &str = "collaboration";
    pub const BEST_PRACTICES: &str = "best-practices";
    pub const REAL_PROJECTS: &str = "real-projects";
    pub const PRACTICE: &str = "practice";
    pub const RESOURCES: &str = "resources";
    pub const QUICK_REFERENCE: &str = "quick-reference";
}

const STANDARD_PAGES: [(&str, &str); 11] = [
    (page_ids::HOME, "Home"),
    (page_ids::GETTING_STARTED, "Getting Started"),
    (page_ids::CONCEPTS, "Core Concepts"),
    (page_ids::FIRST_REPO, "First Repository"),
    (page_ids::COMMAND_LINE, "Command Line"),
    (page_ids::COLLABORATION, "Collaboration"),
    (page_ids::BEST_PRACTICES, "Best Practices"),
    (page_ids::REAL_PROJECTS, "Real Projects"),
    (page_ids::PRACTICE, "Practice Quiz"),
    (page_ids::RESOURCES, "Resources"),
    (page_ids::QUICK_REFERENCE, "Quick Reference"),
];

type StepRow = (&'static str, &'static str, &'static str);

const STANDARD_GUIDES: [(&str, &str, &str, &[StepRow]); 3] = [
    (
        "repository-creation",
        "Creating Your First Repository",
        "Create and set up a new repository",
        &[
            ("Sign in to GitHub", "Open github.com and sign in", "🔐"),
            ("Click New Repository", "Use the green \"New\" button or the \"+\" menu", "➕"),
            ("Name Your Repository", "Pick a descriptive name such as \"my-first-repo\"", "📝"),
            ("Add Description", "Summarize the project in a sentence", "📄"),
            ("Choose Visibility", "Public repositories are visible to everyone", "👁️"),
            ("Initialize Repository", "Tick \"Add a README file\"", "📖"),
            ("Create Repository", "Click \"Create repository\"", "🎉"),
        ],
    ),
    (
        "git-workflow",
        "Basic Git Workflow",
        "The essential commands for version control",
        &[
            ("Open Terminal", "Open a terminal, Command Prompt or Git Bash", "💻"),
            ("Navigate to Project", "Use `cd` to enter the project folder", "📁"),
            ("Initialize Git", "Run `git init` to start tracking the project", "🚀"),
            ("Check Status", "Run `git status` to list changed files", "📊"),
            ("Stage Changes", "Run `git add .` to stage every change", "✅"),
            ("Commit Changes", "Run `git commit -m \"message\"` to record a snapshot", "💾"),
            ("Push to GitHub", "Run `git push` to upload commits", "☁️"),
        ],
    ),
    (
        "branch-workflow",
        "Branch and Pull Request Workflow",
        "Work on branches and open pull requests",
        &[
            ("Create New Branch", "Run `git checkout -b feature/new-feature`", "🌿"),
            ("Make Changes", "Edit files to implement the feature", "✏️"),
            ("Stage and Commit", "Run `git add .` and `git commit`", "💾"),
            ("Push Branch", "Run `git push origin feature/new-feature`", "☁️"),
            (
                "Open Pull Request",
                "On GitHub choose \"Pull requests\" then \"New pull request\"",
                "🔄",
            ),
            ("Review Process", "Wait for reviewers to approve the changes", "👀"),
            ("Merge and Delete", "Merge the pull request and delete the branch", "✅"),
        ],
    ),
];

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate page id: {0}")]
    DuplicatePage(PageId),
    #[error("duplicate section id: {0}")]
    DuplicateSection(SectionId),
    #[error("duplicate guide id: {0}")]
    DuplicateGuide(GuideId),
    #[error("page {0} has no title")]
    EmptyPageTitle(PageId),
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
    #[error(transparent)]
    Content(#[from] QuizContentError),
    #[error(transparent)]
    Guide(#[from] GuideContentError),
    #[error("malformed catalog document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Display metadata for one tutorial page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    id: PageId,
    title: String,
}

impl PageMeta {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyPageTitle` if the title is blank.
    pub fn new(id: PageId, title: impl Into<String>) -> Result<Self, CatalogError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(CatalogError::EmptyPageTitle(id));
        }
        Ok(Self { id, title })
    }

    #[must_use]
    pub fn id(&self) -> &PageId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Lookup contract for tutorial content. The engine never mutates it.
pub trait ContentCatalog: Send + Sync {
    fn page(&self, id: &str) -> Option<&PageMeta>;

    fn section(&self, id: &str) -> Option<&QuizSection>;

    /// Pages in navigation order.
    fn pages(&self) -> &[PageMeta];

    fn sections(&self) -> &[QuizSection];

    fn guide(&self, id: &str) -> Option<&Guide>;

    fn guides(&self) -> &[Guide];
}

/// Vector-backed catalog with id indexes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    pages: Vec<PageMeta>,
    sections: Vec<QuizSection>,
    guides: Vec<Guide>,
    page_index: BTreeMap<PageId, usize>,
    section_index: BTreeMap<SectionId, usize>,
    guide_index: BTreeMap<GuideId, usize>,
}

impl InMemoryCatalog {
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicatePage` / `DuplicateSection` on repeated ids.
    pub fn new(pages: Vec<PageMeta>, sections: Vec<QuizSection>) -> Result<Self, CatalogError> {
        let mut page_index = BTreeMap::new();
        for (idx, page) in pages.iter().enumerate() {
            if page_index.insert(page.id().clone(), idx).is_some() {
                return Err(CatalogError::DuplicatePage(page.id().clone()));
            }
        }
        let mut section_index = BTreeMap::new();
        for (idx, section) in sections.iter().enumerate() {
            if section_index.insert(section.id().clone(), idx).is_some() {
                return Err(CatalogError::DuplicateSection(section.id().clone()));
            }
        }
        Ok(Self {
            pages,
            sections,
            guides: Vec::new(),
            page_index,
            section_index,
            guide_index: BTreeMap::new(),
        })
    }

    /// Replace the catalog's guides.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateGuide` on repeated ids.
    pub fn with_guides(mut self, guides: Vec<Guide>) -> Result<Self, CatalogError> {
        let mut guide_index = BTreeMap::new();
        for (idx, guide) in guides.iter().enumerate() {
            if guide_index.insert(guide.id().clone(), idx).is_some() {
                return Err(CatalogError::DuplicateGuide(guide.id().clone()));
            }
        }
        self.guides = guides;
        self.guide_index = guide_index;
        Ok(self)
    }

    /// The eleven tutorial pages and three standard guides plus the given
    /// quiz sections.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateSection` if two sections share an id.
    pub fn standard(sections: Vec<QuizSection>) -> Result<Self, CatalogError> {
        Self::new(standard_pages()?, sections)?.with_guides(standard_guides()?)
    }

    /// Load a catalog from its JSON document form.
    ///
    /// ```
    /// # use tutor_core::catalog::{ContentCatalog, InMemoryCatalog};
    /// let catalog = InMemoryCatalog::from_json(r#"{
    ///     "pages": [{ "id": "home", "title": "Home" }],
    ///     "sections": [{
    ///         "id": "core-concepts",
    ///         "title": "Core Concepts",
    ///         "questions": [{
    ///             "id": "cc1",
    ///             "question": "What is a repository?",
    ///             "options": ["A program", "A project home with history"],
    ///             "correct": 1
    ///         }]
    ///     }]
    /// }"#)?;
    /// assert_eq!(catalog.section("core-concepts").map(|s| s.len()), Some(1));
    /// # Ok::<(), tutor_core::catalog::CatalogError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for malformed JSON or invalid content.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(raw)?;
        doc.into_catalog()
    }
}

impl ContentCatalog for InMemoryCatalog {
    fn page(&self, id: &str) -> Option<&PageMeta> {
        self.page_index.get(id).and_then(|&idx| self.pages.get(idx))
    }

    fn section(&self, id: &str) -> Option<&QuizSection> {
        self.section_index
            .get(id)
            .and_then(|&idx| self.sections.get(idx))
    }

    fn pages(&self) -> &[PageMeta] {
        &self.pages
    }

    fn sections(&self) -> &[QuizSection] {
        &self.sections
    }

    fn guide(&self, id: &str) -> Option<&Guide> {
        self.guide_index.get(id).and_then(|&idx| self.guides.get(idx))
    }

    fn guides(&self) -> &[Guide] {
        &self.guides
    }
}

/// Metadata for the eleven standard tutorial pages.
///
/// # Errors
///
/// Never fails for the built-in table; the `Result` mirrors `PageMeta::new`.
pub fn standard_pages() -> Result<Vec<PageMeta>, CatalogError> {
    STANDARD_PAGES
        .iter()
        .map(|(id, title)| PageMeta::new(PageId::new(*id)?, *title))
        .collect()
}

/// The repository, git workflow and branch walkthroughs.
///
/// # Errors
///
/// Never fails for the built-in table; the `Result` mirrors `Guide::new`.
pub fn standard_guides() -> Result<Vec<Guide>, CatalogError> {
    STANDARD_GUIDES
        .iter()
        .map(|(id, title, description, steps)| -> Result<Guide, CatalogError> {
            let steps = steps
                .iter()
                .map(|(title, content, icon)| GuideStep::new(*title, *content, *icon))
                .collect();
            Ok(Guide::new(GuideId::new(*id)?, *title, *description, steps)?)
        })
        .collect()
}

//
// ─── DOCUMENT FORM ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    pages: Vec<PageDocument>,
    #[serde(default)]
    sections: Vec<SectionDocument>,
    #[serde(default)]
    guides: Vec<GuideDocument>,
}

#[derive(Debug, Deserialize)]
struct PageDocument {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SectionDocument {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    questions: Vec<QuestionDocument>,
}

#[derive(Debug, Deserialize)]
struct QuestionDocument {
    id: String,
    #[serde(alias = "question")]
    text: String,
    options: Vec<String>,
    #[serde(alias = "correct")]
    correct_index: usize,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct GuideDocument {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    steps: Vec<StepDocument>,
}

#[derive(Debug, Deserialize)]
struct StepDocument {
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    icon: String,
}

impl CatalogDocument {
    fn into_catalog(self) -> Result<InMemoryCatalog, CatalogError> {
        let pages = self
            .pages
            .into_iter()
            .map(|p| PageMeta::new(PageId::new(p.id)?, p.title))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sections = Vec::with_capacity(self.sections.len());
        for section in self.sections {
            let questions = section
                .questions
                .into_iter()
                .map(|q| -> Result<Question, CatalogError> {
                    Ok(Question::new(
                        QuestionId::new(q.id)?,
                        q.text,
                        q.options,
                        q.correct_index,
                        q.explanation,
                    )?)
                })
                .collect::<Result<Vec<_>, _>>()?;
            sections.push(QuizSection::new(
                SectionId::new(section.id)?,
                section.title,
                section.description,
                questions,
            )?);
        }

        let guides = self
            .guides
            .into_iter()
            .map(|g| -> Result<Guide, CatalogError> {
                let steps = g
                    .steps
                    .into_iter()
                    .map(|step| GuideStep::new(step.title, step.content, step.icon))
                    .collect();
                Ok(Guide::new(GuideId::new(g.id)?, g.title, g.description, steps)?)
            })
            .collect::<Result<Vec<_>, _>>()?;

        InMemoryCatalog::new(pages, sections)?.with_guides(guides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "pages": [
            { "id": "home", "title": "Home" },
            { "id": "concepts", "title": "Core Concepts" }
        ],
        "sections": [{
            "id": "command-line",
            "title": "Command Line",
            "description": "Basic git commands",
            "questions": [
                { "id": "cl1", "question": "Which command saves a snapshot?",
                  "options": ["git push", "git commit", "git clone"], "correct": 1,
                  "explanation": "commit records a snapshot" },
                { "id": "cl2", "text": "Which command downloads a repo?",
                  "options": ["git clone", "git add"], "correct_index": 0 }
            ]
        }],
        "guides": [{
            "id": "git-workflow",
            "title": "Basic Git Workflow",
            "steps": [
                { "title": "Initialize Git", "content": "git init" },
                { "title": "Commit Changes", "content": "git commit", "icon": "💾" }
            ]
        }]
    }"#;

    #[test]
    fn standard_catalog_has_eleven_pages() {
        let catalog = InMemoryCatalog::standard(Vec::new()).unwrap();
        assert_eq!(catalog.pages().len(), 11);
        assert_eq!(
            catalog.page(page_ids::BEST_PRACTICES).unwrap().title(),
            "Best Practices"
        );
        assert!(catalog.page("nowhere").is_none());
        assert_eq!(catalog.guides().len(), 3);
        assert_eq!(catalog.guide("git-workflow").unwrap().step_count(), 7);
    }

    #[test]
    fn loads_json_document() {
        let catalog = InMemoryCatalog::from_json(DOC).unwrap();
        assert_eq!(catalog.pages().len(), 2);
        let section = catalog.section("command-line").unwrap();
        assert_eq!(section.len(), 2);
        assert_eq!(section.question(0).unwrap().correct_index(), 1);
        assert_eq!(section.question(1).unwrap().text(), "Which command downloads a repo?");
        let guide = catalog.guide("git-workflow").unwrap();
        assert_eq!(guide.step_count(), 2);
        assert_eq!(guide.step(1).unwrap().icon(), "💾");
    }

    #[test]
    fn rejects_duplicate_guides() {
        let guides = standard_guides().unwrap();
        let doubled = vec![guides[0].clone(), guides[0].clone()];
        assert!(matches!(
            InMemoryCatalog::default().with_guides(doubled),
            Err(CatalogError::DuplicateGuide(_))
        ));
    }

    #[test]
    fn rejects_duplicate_pages() {
        let pages = vec![
            PageMeta::new(PageId::new("home").unwrap(), "Home").unwrap(),
            PageMeta::new(PageId::new("home").unwrap(), "Home again").unwrap(),
        ];
        assert!(matches!(
            InMemoryCatalog::new(pages, Vec::new()),
            Err(CatalogError::DuplicatePage(_))
        ));
    }

    #[test]
    fn rejects_invalid_question_content() {
        let doc = r#"{ "sections": [{ "id": "s", "title": "S", "questions": [
            { "id": "q", "question": "?", "options": ["a", "b"], "correct": 4 }
        ]}]}"#;
        assert!(matches!(
            InMemoryCatalog::from_json(doc),
            Err(CatalogError::Content(QuizContentError::CorrectIndexOutOfRange { .. }))
        ));
    }
}
