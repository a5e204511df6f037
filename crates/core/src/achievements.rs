use chrono::{DateTime, Duration, Utc};

use crate::catalog::page_ids;
use crate::model::{AchievementId, AchievementState, LearnerProgress, TutorSettings};

//
// ─── RULE TABLE ────────────────────────────────────────────────────────────────
//

/// Read-only view handed to every predicate.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub progress: &'a LearnerProgress,
    pub settings: &'a TutorSettings,
}

/// A predicate over learner state.
pub type Rule = fn(&RuleContext<'_>) -> bool;

/// One row per badge. Predicates are independent of each other's unlock status,
/// so the table order only fixes the order unlocks are reported in.
pub const RULES: [(AchievementId, Rule); 13] = [
    (AchievementId::FirstSteps, |ctx| !ctx.progress.pages().is_empty()),
    (AchievementId::SetupMaster, |ctx| {
        ctx.progress.is_page_completed(page_ids::GETTING_STARTED)
    }),
    (AchievementId::ConceptExplorer, |ctx| {
        ctx.progress.is_page_completed(page_ids::CONCEPTS)
    }),
    (AchievementId::RepositoryCreator, |ctx| {
        ctx.progress.is_page_completed(page_ids::FIRST_REPO)
    }),
    (AchievementId::CommandLinePro, |ctx| {
        ctx.progress.is_page_completed(page_ids::COMMAND_LINE)
    }),
    (AchievementId::TeamPlayer, |ctx| {
        ctx.progress.is_page_completed(page_ids::COLLABORATION)
    }),
    (AchievementId::BestPractice, |ctx| {
        ctx.progress.is_page_completed(page_ids::BEST_PRACTICES)
    }),
    (AchievementId::CompleteJourney, |ctx| ctx.progress.overall_percent() == 100),
    (AchievementId::QuizMaster, |ctx| {
        ctx.progress.quiz_scores().values().any(|s| s.is_perfect())
    }),
    (AchievementId::KnowledgeSeeker, |ctx| {
        ctx.progress
            .average_quiz_percent()
            .is_some_and(|avg| avg >= f64::from(ctx.settings.knowledge_seeker_threshold()))
    }),
    (AchievementId::DedicatedLearner, |ctx| {
        let needed = Duration::minutes(i64::from(ctx.settings.dedicated_learner_minutes()));
        ctx.progress.total_time_spent() >= needed
    }),
    (AchievementId::ProjectBuilder, |ctx| {
        ctx.progress.is_page_completed(page_ids::REAL_PROJECTS)
    }),
    (AchievementId::ResourceCollector, |ctx| {
        ctx.progress.is_page_completed(page_ids::RESOURCES)
    }),
];

/// Looks up the predicate for a badge.
#[must_use]
pub fn rule_for(id: AchievementId) -> Option<Rule> {
    RULES
        .iter()
        .find_map(|(rule_id, rule)| (*rule_id == id).then_some(*rule))
}

//
// ─── EVALUATOR ─────────────────────────────────────────────────────────────────
//

/// Re-check every locked badge against the full current state.
///
/// Badges whose predicate holds are unlocked at `now` and returned in table
/// order. Already unlocked badges are skipped, so nothing is ever revoked.
pub fn evaluate(
    progress: &LearnerProgress,
    state: &mut AchievementState,
    settings: &TutorSettings,
    now: DateTime<Utc>,
) -> Vec<AchievementId> {
    let ctx = RuleContext { progress, settings };
    let mut unlocked = Vec::new();
    for (id, rule) in &RULES {
        if state.is_unlocked(*id) || !rule(&ctx) {
            continue;
        }
        if state.unlock(*id, now) {
            unlocked.push(*id);
        }
    }
    unlocked
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
