use thiserror::Error;

use crate::model::ids::GuideId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GuideContentError {
    #[error("guide {0} has no title")]
    EmptyTitle(GuideId),
    #[error("guide {0} has no steps")]
    NoSteps(GuideId),
    #[error("guide {guide} has an untitled step at position {index}")]
    EmptyStepTitle { guide: GuideId, index: usize },
}

/// One screen of a walkthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideStep {
    title: String,
    content: String,
    icon: String,
}

impl GuideStep {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into().trim().to_string(),
            content: content.into().trim().to_string(),
            icon: icon.into(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn icon(&self) -> &str {
        &self.icon
    }
}

/// An ordered, step-by-step walkthrough of one workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guide {
    id: GuideId,
    title: String,
    description: String,
    steps: Vec<GuideStep>,
}

impl Guide {
    /// # Errors
    ///
    /// Returns `GuideContentError` if the guide or any step is untitled, or
    /// there are no steps.
    pub fn new(
        id: GuideId,
        title: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<GuideStep>,
    ) -> Result<Self, GuideContentError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(GuideContentError::EmptyTitle(id));
        }
        if steps.is_empty() {
            return Err(GuideContentError::NoSteps(id));
        }
        if let Some(index) = steps.iter().position(|s| s.title.is_empty()) {
            return Err(GuideContentError::EmptyStepTitle { guide: id, index });
        }
        Ok(Self {
            id,
            title,
            description: description.into().trim().to_string(),
            steps,
        })
    }

    #[must_use]
    pub fn id(&self) -> &GuideId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn steps(&self) -> &[GuideStep] {
        &self.steps
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<&GuideStep> {
        self.steps.get(index)
    }

    /// Number of steps; always at least one.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> GuideId {
        GuideId::new("git-workflow").unwrap()
    }

    #[test]
    fn rejects_empty_guides() {
        assert_eq!(
            Guide::new(id(), "Workflow", "", Vec::new()).unwrap_err(),
            GuideContentError::NoSteps(id())
        );
        assert_eq!(
            Guide::new(id(), " ", "", vec![GuideStep::new("Init", "", "")]).unwrap_err(),
            GuideContentError::EmptyTitle(id())
        );
        let steps = vec![GuideStep::new("Init", "git init", ""), GuideStep::new("", "", "")];
        assert_eq!(
            Guide::new(id(), "Workflow", "", steps).unwrap_err(),
            GuideContentError::EmptyStepTitle {
                guide: id(),
                index: 1
            }
        );
    }

    #[test]
    fn exposes_steps_in_order() {
        let guide = Guide::new(
            id(),
            "Workflow",
            "Basic commands",
            vec![
                GuideStep::new("Init", "git init", "🚀"),
                GuideStep::new("Commit", "git commit", "💾"),
            ],
        )
        .unwrap();
        assert_eq!(guide.step_count(), 2);
        assert_eq!(guide.step(1).unwrap().content(), "git commit");
        assert!(guide.step(2).is_none());
    }
}
