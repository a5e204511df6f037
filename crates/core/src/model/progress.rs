use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::ids::{GuideId, PageId, SectionId};
use crate::model::quiz::{QuizScore, QuizScoreError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("page not visited: {0}")]
    PageNotVisited(PageId),

    #[error("total pages must be > 0")]
    InvalidTotalPages,

    #[error("time spent cannot be negative")]
    NegativeTimeSpent,

    #[error("page {0} has a zero visit count")]
    ZeroVisitCount(PageId),

    #[error("quiz score stored under {key} belongs to {actual}")]
    ScoreKeyMismatch { key: SectionId, actual: SectionId },

    #[error("correct answers ({correct}) exceed questions answered ({answered})")]
    AnswerCountMismatch { correct: u32, answered: u32 },

    #[error("guide {guide} is on step {step} of {steps}, not the last")]
    GuideStepsRemaining {
        guide: GuideId,
        step: usize,
        steps: usize,
    },

    #[error("guide {guide} is on step {step} but has only {steps} steps")]
    GuideStepOutOfRange {
        guide: GuideId,
        step: usize,
        steps: usize,
    },

    #[error(transparent)]
    Score(#[from] QuizScoreError),
}

//
// ─── PAGE PROGRESS ─────────────────────────────────────────────────────────────
//

/// Per-page record, created on the first visit.
///
/// Completion is one-way: `completed_at` is written on the first transition and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageProgress {
    last_visited_at: DateTime<Utc>,
    visit_count: u32,
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    time_spent_secs: u64,
}

impl PageProgress {
    fn first_visit(now: DateTime<Utc>) -> Self {
        Self {
            last_visited_at: now,
            visit_count: 1,
            completed_at: None,
            time_spent_secs: 0,
        }
    }

    fn revisit(&mut self, now: DateTime<Utc>) {
        self.visit_count = self.visit_count.saturating_add(1);
        self.last_visited_at = now;
    }

    /// Returns `true` only on the false → true transition.
    fn mark_completed(&mut self, now: DateTime<Utc>) -> bool {
        if self.completed_at.is_some() {
            return false;
        }
        self.completed_at = Some(now);
        true
    }

    #[must_use]
    pub fn last_visited_at(&self) -> DateTime<Utc> {
        self.last_visited_at
    }

    #[must_use]
    pub fn visit_count(&self) -> u32 {
        self.visit_count
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn time_spent(&self) -> Duration {
        Duration::seconds(i64::try_from(self.time_spent_secs).unwrap_or(i64::MAX))
    }
}

//
// ─── GUIDE PROGRESS ────────────────────────────────────────────────────────────
//

/// Position within one step-by-step guide. `current_step` stays in
/// `0..step_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideProgress {
    current_step: usize,
    step_count: usize,
    completed_at: Option<DateTime<Utc>>,
}

impl GuideProgress {
    fn new(step_count: usize) -> Self {
        Self {
            current_step: 0,
            step_count: step_count.max(1),
            completed_at: None,
        }
    }

    /// Follow the catalog if the guide's length changed since the last visit.
    fn resize(&mut self, step_count: usize) {
        self.step_count = step_count.max(1);
        self.current_step = self.current_step.min(self.step_count - 1);
    }

    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    #[must_use]
    pub fn is_on_last_step(&self) -> bool {
        self.current_step + 1 == self.step_count
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

//
// ─── LEARNER PROGRESS ──────────────────────────────────────────────────────────
//

/// Everything recorded about one learner's pass through the tutorial.
///
/// `overall_percent` is not stored: it is derived from `pages` and
/// `total_pages` on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerProgress {
    pages: BTreeMap<PageId, PageProgress>,
    total_pages: u32,
    current_page: Option<PageId>,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    quiz_scores: BTreeMap<SectionId, QuizScore>,
    #[serde(default)]
    sections_completed: BTreeSet<SectionId>,
    #[serde(default)]
    questions_answered: u32,
    #[serde(default)]
    correct_answers: u32,
    #[serde(default)]
    guides: BTreeMap<GuideId, GuideProgress>,
}

impl LearnerProgress {
    /// Start an empty progress record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidTotalPages` if `total_pages` is zero.
    pub fn new(total_pages: u32, now: DateTime<Utc>) -> Result<Self, ProgressError> {
        if total_pages == 0 {
            return Err(ProgressError::InvalidTotalPages);
        }
        Ok(Self {
            pages: BTreeMap::new(),
            total_pages,
            current_page: None,
            started_at: now,
            last_activity_at: now,
            quiz_scores: BTreeMap::new(),
            sections_completed: BTreeSet::new(),
            questions_answered: 0,
            correct_answers: 0,
            guides: BTreeMap::new(),
        })
    }

    /// Checks a rehydrated record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if a persisted field violates a domain invariant.
    pub fn validate(&self) -> Result<(), ProgressError> {
        if self.total_pages == 0 {
            return Err(ProgressError::InvalidTotalPages);
        }
        if let Some((id, _)) = self.pages.iter().find(|(_, p)| p.visit_count == 0) {
            return Err(ProgressError::ZeroVisitCount(id.clone()));
        }
        for (key, score) in &self.quiz_scores {
            if key != score.section_id() {
                return Err(ProgressError::ScoreKeyMismatch {
                    key: key.clone(),
                    actual: score.section_id().clone(),
                });
            }
            score.validate()?;
        }
        if self.correct_answers > self.questions_answered {
            return Err(ProgressError::AnswerCountMismatch {
                correct: self.correct_answers,
                answered: self.questions_answered,
            });
        }
        for (id, guide) in &self.guides {
            if guide.step_count == 0 || guide.current_step >= guide.step_count {
                return Err(ProgressError::GuideStepOutOfRange {
                    guide: id.clone(),
                    step: guide.current_step,
                    steps: guide.step_count,
                });
            }
        }
        Ok(())
    }

    /// Record a visit, creating the page entry on first sight.
    pub fn record_visit(&mut self, page_id: PageId, now: DateTime<Utc>) -> &PageProgress {
        self.current_page = Some(page_id.clone());
        self.last_activity_at = now;
        self.pages
            .entry(page_id)
            .and_modify(|page| page.revisit(now))
            .or_insert_with(|| PageProgress::first_visit(now))
    }

    /// Mark a visited page complete.
    ///
    /// Returns `true` if this call performed the transition, `false` if the page
    /// was already complete.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::PageNotVisited` if the page has no entry yet.
    pub fn complete_page(
        &mut self,
        page_id: &PageId,
        now: DateTime<Utc>,
    ) -> Result<bool, ProgressError> {
        let page = self
            .pages
            .get_mut(page_id)
            .ok_or_else(|| ProgressError::PageNotVisited(page_id.clone()))?;
        let transitioned = page.mark_completed(now);
        self.last_activity_at = now;
        Ok(transitioned)
    }

    /// Add reading time to a visited page and return the page's new total.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::PageNotVisited` for unknown pages and
    /// `ProgressError::NegativeTimeSpent` for negative durations.
    pub fn add_time_spent(
        &mut self,
        page_id: &PageId,
        delta: Duration,
        now: DateTime<Utc>,
    ) -> Result<Duration, ProgressError> {
        let secs = u64::try_from(delta.num_seconds())
            .map_err(|_| ProgressError::NegativeTimeSpent)?;
        let page = self
            .pages
            .get_mut(page_id)
            .ok_or_else(|| ProgressError::PageNotVisited(page_id.clone()))?;
        page.time_spent_secs = page.time_spent_secs.saturating_add(secs);
        self.last_activity_at = now;
        Ok(page.time_spent())
    }

    /// Store a section's score, replacing any earlier attempt.
    pub fn record_quiz_score(&mut self, score: QuizScore) {
        self.last_activity_at = score.completed_at();
        self.quiz_scores.insert(score.section_id().clone(), score);
    }

    pub fn record_answer(&mut self, correct: bool, now: DateTime<Utc>) {
        self.questions_answered = self.questions_answered.saturating_add(1);
        if correct {
            self.correct_answers = self.correct_answers.saturating_add(1);
        }
        self.last_activity_at = now;
    }

    /// Returns `true` if the section was not already marked.
    pub fn mark_section_completed(&mut self, section_id: SectionId, now: DateTime<Utc>) -> bool {
        self.last_activity_at = now;
        self.sections_completed.insert(section_id)
    }

    /// Move one step forward in a guide of `step_count` steps, stopping at the
    /// last step. Returns the new step index.
    pub fn next_guide_step(
        &mut self,
        guide_id: GuideId,
        step_count: usize,
        now: DateTime<Utc>,
    ) -> usize {
        let guide = self.guide_entry(guide_id, step_count, now);
        guide.current_step = (guide.current_step + 1).min(guide.step_count - 1);
        guide.current_step
    }

    /// Move one step back, stopping at the first step.
    pub fn previous_guide_step(
        &mut self,
        guide_id: GuideId,
        step_count: usize,
        now: DateTime<Utc>,
    ) -> usize {
        let guide = self.guide_entry(guide_id, step_count, now);
        guide.current_step = guide.current_step.saturating_sub(1);
        guide.current_step
    }

    /// Mark a guide finished. Only allowed from its last step.
    ///
    /// Returns `true` on the first completion, `false` if already complete.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::GuideStepsRemaining` if the learner is not on the
    /// last step; nothing is recorded in that case.
    pub fn complete_guide(
        &mut self,
        guide_id: GuideId,
        step_count: usize,
        now: DateTime<Utc>,
    ) -> Result<bool, ProgressError> {
        let mut position = self
            .guides
            .get(&guide_id)
            .copied()
            .unwrap_or_else(|| GuideProgress::new(step_count));
        position.resize(step_count);
        if !position.is_on_last_step() {
            return Err(ProgressError::GuideStepsRemaining {
                guide: guide_id,
                step: position.current_step,
                steps: position.step_count,
            });
        }

        let guide = self.guide_entry(guide_id, step_count, now);
        if guide.completed_at.is_some() {
            return Ok(false);
        }
        guide.completed_at = Some(now);
        Ok(true)
    }

    fn guide_entry(
        &mut self,
        guide_id: GuideId,
        step_count: usize,
        now: DateTime<Utc>,
    ) -> &mut GuideProgress {
        self.last_activity_at = now;
        let guide = self
            .guides
            .entry(guide_id)
            .or_insert_with(|| GuideProgress::new(step_count));
        guide.resize(step_count);
        guide
    }

    #[must_use]
    pub fn guides(&self) -> &BTreeMap<GuideId, GuideProgress> {
        &self.guides
    }

    #[must_use]
    pub fn guide(&self, guide_id: &str) -> Option<&GuideProgress> {
        self.guides.get(guide_id)
    }

    #[must_use]
    pub fn completed_guide_count(&self) -> usize {
        self.guides.values().filter(|g| g.completed()).count()
    }

    #[must_use]
    pub fn pages(&self) -> &BTreeMap<PageId, PageProgress> {
        &self.pages
    }

    #[must_use]
    pub fn page(&self, page_id: &str) -> Option<&PageProgress> {
        self.pages.get(page_id)
    }

    #[must_use]
    pub fn is_page_completed(&self, page_id: &str) -> bool {
        self.page(page_id).is_some_and(PageProgress::completed)
    }

    #[must_use]
    pub fn completed_count(&self) -> u32 {
        let count = self.pages.values().filter(|p| p.completed()).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// `floor(100 * completed / total_pages)`, capped at 100.
    #[must_use]
    pub fn overall_percent(&self) -> u8 {
        let pct = u64::from(self.completed_count()) * 100 / u64::from(self.total_pages.max(1));
        u8::try_from(pct.min(100)).unwrap_or(100)
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    #[must_use]
    pub fn current_page(&self) -> Option<&PageId> {
        self.current_page.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    #[must_use]
    pub fn quiz_scores(&self) -> &BTreeMap<SectionId, QuizScore> {
        &self.quiz_scores
    }

    #[must_use]
    pub fn quiz_score(&self, section_id: &str) -> Option<&QuizScore> {
        self.quiz_scores.get(section_id)
    }

    /// Mean of all recorded quiz percentages, `None` before the first quiz.
    #[must_use]
    pub fn average_quiz_percent(&self) -> Option<f64> {
        if self.quiz_scores.is_empty() {
            return None;
        }
        let sum: u32 = self
            .quiz_scores
            .values()
            .map(|s| u32::from(s.percentage()))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let count = self.quiz_scores.len() as f64;
        Some(f64::from(sum) / count)
    }

    #[must_use]
    pub fn sections_completed(&self) -> &BTreeSet<SectionId> {
        &self.sections_completed
    }

    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    /// `floor(100 * correct / answered)`, `None` before any answer.
    #[must_use]
    pub fn accuracy_percent(&self) -> Option<u8> {
        if self.questions_answered == 0 {
            return None;
        }
        let pct = u64::from(self.correct_answers) * 100 / u64::from(self.questions_answered);
        Some(u8::try_from(pct.min(100)).unwrap_or(100))
    }

    #[must_use]
    pub fn total_time_spent(&self) -> Duration {
        let secs = self
            .pages
            .values()
            .fold(0_u64, |acc, p| acc.saturating_add(p.time_spent_secs));
        Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn page(id: &str) -> PageId {
        PageId::new(id).unwrap()
    }

    fn progress() -> LearnerProgress {
        LearnerProgress::new(11, fixed_now()).unwrap()
    }

    #[test]
    fn zero_total_pages_is_rejected() {
        assert_eq!(
            LearnerProgress::new(0, fixed_now()).unwrap_err(),
            ProgressError::InvalidTotalPages
        );
    }

    #[test]
    fn visits_count_and_track_latest_timestamp() {
        let mut progress = progress();
        let t0 = fixed_now();
        let t1 = t0 + Duration::minutes(3);
        let t2 = t1 + Duration::minutes(7);

        progress.record_visit(page("concepts"), t0);
        progress.record_visit(page("home"), t1);
        let concepts = progress.record_visit(page("concepts"), t2).clone();

        assert_eq!(concepts.visit_count(), 2);
        assert_eq!(concepts.last_visited_at(), t2);
        assert!(!concepts.completed());
        assert_eq!(progress.page("home").unwrap().visit_count(), 1);
        assert_eq!(progress.current_page(), Some(&page("concepts")));
        assert_eq!(progress.last_activity_at(), t2);
    }

    #[test]
    fn completing_unvisited_page_fails() {
        let mut progress = progress();
        let err = progress.complete_page(&page("concepts"), fixed_now()).unwrap_err();
        assert_eq!(err, ProgressError::PageNotVisited(page("concepts")));
        assert!(progress.pages().is_empty());
    }

    #[test]
    fn completion_is_one_way_and_keeps_first_timestamp() {
        let mut progress = progress();
        let t0 = fixed_now();
        progress.record_visit(page("concepts"), t0);

        assert!(progress.complete_page(&page("concepts"), t0).unwrap());
        let later = t0 + Duration::hours(1);
        assert!(!progress.complete_page(&page("concepts"), later).unwrap());

        let entry = progress.page("concepts").unwrap();
        assert!(entry.completed());
        assert_eq!(entry.completed_at(), Some(t0));

        progress.record_visit(page("concepts"), later);
        assert!(progress.is_page_completed("concepts"));
    }

    #[test]
    fn overall_percent_uses_fixed_denominator() {
        let mut progress = progress();
        assert_eq!(progress.overall_percent(), 0);

        let ids = [
            "home",
            "getting-started",
            "concepts",
            "first-repo",
            "command-line",
            "collaboration",
            "best-practices",
            "real-projects",
            "practice",
            "resources",
            "quick-reference",
        ];
        for (n, id) in ids.iter().enumerate() {
            progress.record_visit(page(id), fixed_now());
            progress.complete_page(&page(id), fixed_now()).unwrap();
            let expected = ((n as u64 + 1) * 100 / 11) as u8;
            assert_eq!(progress.overall_percent(), expected);
        }
        assert_eq!(progress.overall_percent(), 100);
    }

    #[test]
    fn all_visited_pages_complete_is_not_full_progress() {
        let mut progress = progress();
        progress.record_visit(page("home"), fixed_now());
        progress.complete_page(&page("home"), fixed_now()).unwrap();
        assert_eq!(progress.overall_percent(), 9);
    }

    #[test]
    fn time_spent_accumulates_per_page() {
        let mut progress = progress();
        progress.record_visit(page("concepts"), fixed_now());
        progress.record_visit(page("home"), fixed_now());
        progress
            .add_time_spent(&page("concepts"), Duration::minutes(10), fixed_now())
            .unwrap();
        let total = progress
            .add_time_spent(&page("concepts"), Duration::minutes(5), fixed_now())
            .unwrap();
        progress
            .add_time_spent(&page("home"), Duration::minutes(2), fixed_now())
            .unwrap();

        assert_eq!(total, Duration::minutes(15));
        assert_eq!(progress.total_time_spent(), Duration::minutes(17));
        assert_eq!(
            progress
                .add_time_spent(&page("home"), Duration::seconds(-1), fixed_now())
                .unwrap_err(),
            ProgressError::NegativeTimeSpent
        );
    }

    #[test]
    fn quiz_scores_overwrite_and_average() {
        let mut progress = progress();
        let a = SectionId::new("a").unwrap();
        let b = SectionId::new("b").unwrap();
        assert_eq!(progress.average_quiz_percent(), None);

        progress.record_quiz_score(QuizScore::from_counts(a.clone(), 3, 3, fixed_now()).unwrap());
        progress.record_quiz_score(QuizScore::from_counts(b, 1, 2, fixed_now()).unwrap());
        assert_eq!(progress.average_quiz_percent(), Some(75.0));

        progress.record_quiz_score(QuizScore::from_counts(a, 0, 3, fixed_now()).unwrap());
        assert_eq!(progress.quiz_scores().len(), 2);
        assert_eq!(progress.quiz_score("a").unwrap().percentage(), 0);
        assert_eq!(progress.average_quiz_percent(), Some(25.0));
    }

    #[test]
    fn accuracy_tracks_answers() {
        let mut progress = progress();
        assert_eq!(progress.accuracy_percent(), None);
        progress.record_answer(true, fixed_now());
        progress.record_answer(false, fixed_now());
        progress.record_answer(true, fixed_now());
        assert_eq!(progress.questions_answered(), 3);
        assert_eq!(progress.correct_answers(), 2);
        assert_eq!(progress.accuracy_percent(), Some(66));
    }

    fn guide(id: &str) -> GuideId {
        GuideId::new(id).unwrap()
    }

    #[test]
    fn guide_steps_stay_within_bounds() {
        let mut progress = progress();
        let g = guide("git-workflow");

        assert_eq!(progress.previous_guide_step(g.clone(), 3, fixed_now()), 0);
        assert_eq!(progress.next_guide_step(g.clone(), 3, fixed_now()), 1);
        assert_eq!(progress.next_guide_step(g.clone(), 3, fixed_now()), 2);
        assert_eq!(progress.next_guide_step(g.clone(), 3, fixed_now()), 2);
        assert!(progress.guide("git-workflow").unwrap().is_on_last_step());

        assert_eq!(progress.previous_guide_step(g.clone(), 3, fixed_now()), 1);
        assert_eq!(progress.previous_guide_step(g.clone(), 3, fixed_now()), 0);
        assert_eq!(progress.previous_guide_step(g, 3, fixed_now()), 0);
    }

    #[test]
    fn guide_completion_requires_last_step_and_happens_once() {
        let mut progress = progress();
        let g = guide("branch-workflow");

        let err = progress.complete_guide(g.clone(), 2, fixed_now()).unwrap_err();
        assert_eq!(
            err,
            ProgressError::GuideStepsRemaining {
                guide: g.clone(),
                step: 0,
                steps: 2
            }
        );
        assert!(progress.guides().is_empty());

        progress.next_guide_step(g.clone(), 2, fixed_now());
        assert!(progress.complete_guide(g.clone(), 2, fixed_now()).unwrap());
        let later = fixed_now() + Duration::minutes(5);
        assert!(!progress.complete_guide(g.clone(), 2, later).unwrap());
        assert_eq!(
            progress.guide("branch-workflow").unwrap().completed_at(),
            Some(fixed_now())
        );
        assert_eq!(progress.completed_guide_count(), 1);

        assert!(progress.complete_guide(guide("one-step"), 1, fixed_now()).unwrap());
    }

    #[test]
    fn shrunken_guide_clamps_current_step() {
        let mut progress = progress();
        let g = guide("repository-creation");
        for _ in 0..6 {
            progress.next_guide_step(g.clone(), 7, fixed_now());
        }
        assert_eq!(progress.guide("repository-creation").unwrap().current_step(), 6);

        assert_eq!(progress.previous_guide_step(g, 3, fixed_now()), 1);
    }

    #[test]
    fn validate_catches_guide_step_out_of_range() {
        let mut progress = progress();
        progress.next_guide_step(guide("g"), 2, fixed_now());
        assert!(progress.validate().is_ok());

        let mut value = serde_json::to_value(&progress).unwrap();
        value["guides"]["g"]["current_step"] = serde_json::json!(5);
        let tampered: LearnerProgress = serde_json::from_value(value).unwrap();
        assert!(matches!(
            tampered.validate(),
            Err(ProgressError::GuideStepOutOfRange { step: 5, steps: 2, .. })
        ));
    }

    #[test]
    fn validate_catches_mismatched_score_key() {
        let mut progress = progress();
        progress.record_quiz_score(
            QuizScore::from_counts(SectionId::new("a").unwrap(), 1, 1, fixed_now()).unwrap(),
        );
        let mut value = serde_json::to_value(&progress).unwrap();
        let scores = value["quiz_scores"].as_object_mut().unwrap();
        let entry = scores.remove("a").unwrap();
        scores.insert("b".to_string(), entry);

        let tampered: LearnerProgress = serde_json::from_value(value).unwrap();
        assert!(matches!(
            tampered.validate(),
            Err(ProgressError::ScoreKeyMismatch { .. })
        ));
        assert!(progress.validate().is_ok());
    }
}
