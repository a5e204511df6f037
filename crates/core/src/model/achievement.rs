use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown achievement: {0}")]
pub struct UnknownAchievement(pub String);

//
// ─── IDS ───────────────────────────────────────────────────────────────────────
//

/// The fixed set of badges a learner can earn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstSteps,
    SetupMaster,
    ConceptExplorer,
    RepositoryCreator,
    CommandLinePro,
    TeamPlayer,
    BestPractice,
    QuizMaster,
    KnowledgeSeeker,
    CompleteJourney,
    DedicatedLearner,
    ProjectBuilder,
    ResourceCollector,
}

impl AchievementId {
    pub const ALL: [AchievementId; 13] = [
        Self::FirstSteps,
        Self::SetupMaster,
        Self::ConceptExplorer,
        Self::RepositoryCreator,
        Self::CommandLinePro,
        Self::TeamPlayer,
        Self::BestPractice,
        Self::QuizMaster,
        Self::KnowledgeSeeker,
        Self::CompleteJourney,
        Self::DedicatedLearner,
        Self::ProjectBuilder,
        Self::ResourceCollector,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstSteps => "first_steps",
            Self::SetupMaster => "setup_master",
            Self::ConceptExplorer => "concept_explorer",
            Self::RepositoryCreator => "repository_creator",
            Self::CommandLinePro => "command_line_pro",
            Self::TeamPlayer => "team_player",
            Self::BestPractice => "best_practice",
            Self::QuizMaster => "quiz_master",
            Self::KnowledgeSeeker => "knowledge_seeker",
            Self::CompleteJourney => "complete_journey",
            Self::DedicatedLearner => "dedicated_learner",
            Self::ProjectBuilder => "project_builder",
            Self::ResourceCollector => "resource_collector",
        }
    }

    /// Display metadata for this badge.
    #[must_use]
    pub fn definition(self) -> AchievementDefinition {
        use AchievementCategory::{Completion, Exploration, Mastery, Speed};

        let (title, description, icon, category) = match self {
            Self::FirstSteps => ("First Steps", "Complete your first lesson", "🐾", Completion),
            Self::SetupMaster => (
                "Setup Master",
                "Complete the Getting Started section",
                "⚙️",
                Completion,
            ),
            Self::ConceptExplorer => (
                "Concept Explorer",
                "Learn all core GitHub concepts",
                "🧠",
                Exploration,
            ),
            Self::RepositoryCreator => (
                "Repository Creator",
                "Create your first repository",
                "📁",
                Completion,
            ),
            Self::CommandLinePro => (
                "Command Line Pro",
                "Master the command line basics",
                "💻",
                Completion,
            ),
            Self::TeamPlayer => ("Team Player", "Learn about collaboration", "🤝", Exploration),
            Self::BestPractice => ("Best Practice", "Learn GitHub best practices", "✨", Completion),
            Self::QuizMaster => ("Quiz Master", "Score 100% on a quiz", "🏆", Mastery),
            Self::KnowledgeSeeker => (
                "Knowledge Seeker",
                "Average 80% or higher across your quizzes",
                "📚",
                Mastery,
            ),
            Self::CompleteJourney => ("Complete Journey", "Finish all lessons", "⭐", Completion),
            Self::DedicatedLearner => (
                "Dedicated Learner",
                "Spend 30 minutes learning",
                "⏰",
                Speed,
            ),
            Self::ProjectBuilder => (
                "Project Builder",
                "Explore real project ideas",
                "🔨",
                Exploration,
            ),
            Self::ResourceCollector => (
                "Resource Collector",
                "Explore all resources",
                "📖",
                Exploration,
            ),
        };

        AchievementDefinition {
            id: self,
            title,
            description,
            icon,
            category,
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementId {
    type Err = UnknownAchievement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| UnknownAchievement(s.to_string()))
    }
}

/// Grouping used when badges are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Completion,
    Exploration,
    Mastery,
    Speed,
}

/// Immutable title/description/icon for one badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDefinition {
    pub id: AchievementId,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: AchievementCategory,
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Unlock status for every badge. Unlocks are one-way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<AchievementId, Option<DateTime<Utc>>>")]
#[serde(into = "BTreeMap<AchievementId, Option<DateTime<Utc>>>")]
pub struct AchievementState {
    unlocked_at: BTreeMap<AchievementId, Option<DateTime<Utc>>>,
}

impl AchievementState {
    /// All badges locked.
    #[must_use]
    pub fn new() -> Self {
        Self {
            unlocked_at: AchievementId::ALL.into_iter().map(|id| (id, None)).collect(),
        }
    }

    /// Unlock `id` at `now`. Returns `false` (and keeps the original timestamp)
    /// if it was already unlocked.
    pub fn unlock(&mut self, id: AchievementId, now: DateTime<Utc>) -> bool {
        let slot = self.unlocked_at.entry(id).or_insert(None);
        if slot.is_some() {
            return false;
        }
        *slot = Some(now);
        true
    }

    #[must_use]
    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        self.unlocked_at(id).is_some()
    }

    #[must_use]
    pub fn unlocked_at(&self, id: AchievementId) -> Option<DateTime<Utc>> {
        self.unlocked_at.get(&id).copied().flatten()
    }

    /// Unlocked badges in declaration order.
    pub fn unlocked(&self) -> impl Iterator<Item = (AchievementId, DateTime<Utc>)> + '_ {
        self.unlocked_at
            .iter()
            .filter_map(|(id, at)| at.map(|at| (*id, at)))
    }

    #[must_use]
    pub fn unlocked_count(&self) -> usize {
        self.unlocked().count()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.unlocked_at.len()
    }

    /// `floor(100 * unlocked / total)`.
    #[must_use]
    pub fn completion_percent(&self) -> u8 {
        let total = self.total().max(1);
        u8::try_from(self.unlocked_count() * 100 / total).unwrap_or(100)
    }

    /// Most recently unlocked badge, if any.
    #[must_use]
    pub fn latest_unlock(&self) -> Option<(AchievementId, DateTime<Utc>)> {
        self.unlocked().max_by_key(|(_, at)| *at)
    }

    /// Lock every badge again.
    pub fn reset(&mut self) {
        for slot in self.unlocked_at.values_mut() {
            *slot = None;
        }
    }
}

impl Default for AchievementState {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<AchievementId, Option<DateTime<Utc>>>> for AchievementState {
    fn from(mut persisted: BTreeMap<AchievementId, Option<DateTime<Utc>>>) -> Self {
        for id in AchievementId::ALL {
            persisted.entry(id).or_insert(None);
        }
        Self {
            unlocked_at: persisted,
        }
    }
}

impl From<AchievementState> for BTreeMap<AchievementId, Option<DateTime<Utc>>> {
    fn from(state: AchievementState) -> Self {
        state.unlocked_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
