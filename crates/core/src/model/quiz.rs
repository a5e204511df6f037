use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::ids::{QuestionId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizContentError {
    #[error("question {0} has no text")]
    EmptyQuestionText(QuestionId),

    #[error("question {question} needs at least 2 options, got {count}")]
    TooFewOptions { question: QuestionId, count: usize },

    #[error("question {question} has an empty option at position {index}")]
    EmptyOption { question: QuestionId, index: usize },

    #[error("question {question} marks option {index} correct but only has {options} options")]
    CorrectIndexOutOfRange {
        question: QuestionId,
        index: usize,
        options: usize,
    },

    #[error("section {0} has no title")]
    EmptySectionTitle(SectionId),

    #[error("section {0} has no questions")]
    EmptySection(SectionId),

    #[error("section {section} repeats question {question}")]
    DuplicateQuestion {
        section: SectionId,
        question: QuestionId,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizScoreError {
    #[error("a quiz score needs at least one question")]
    NoQuestions,

    #[error("correct count ({correct}) exceeds total ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("stored percentage {stored} does not match {expected}")]
    PercentageMismatch { stored: u8, expected: u8 },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuizContentError` if the text is blank, fewer than two options are
    /// given, any option is blank, or `correct_index` does not point at an option.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuizContentError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(QuizContentError::EmptyQuestionText(id));
        }
        if options.len() < 2 {
            return Err(QuizContentError::TooFewOptions {
                question: id,
                count: options.len(),
            });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuizContentError::EmptyOption { question: id, index });
        }
        if correct_index >= options.len() {
            return Err(QuizContentError::CorrectIndexOutOfRange {
                question: id,
                index: correct_index,
                options: options.len(),
            });
        }

        Ok(Self {
            id,
            text,
            options,
            correct_index,
            explanation: explanation.into().trim().to_string(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_index
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// An ordered, independently scored group of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSection {
    id: SectionId,
    title: String,
    description: String,
    questions: Vec<Question>,
}

impl QuizSection {
    /// Build a validated section.
    ///
    /// # Errors
    ///
    /// Returns `QuizContentError` if the title is blank, there are no questions,
    /// or two questions share an id.
    pub fn new(
        id: SectionId,
        title: impl Into<String>,
        description: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizContentError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(QuizContentError::EmptySectionTitle(id));
        }
        if questions.is_empty() {
            return Err(QuizContentError::EmptySection(id));
        }

        let mut seen = BTreeSet::new();
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuizContentError::DuplicateQuestion {
                    section: id.clone(),
                    question: question.id().clone(),
                });
            }
        }

        Ok(Self {
            id,
            title,
            description: description.into().trim().to_string(),
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> &SectionId {
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
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Number of questions; always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// Qualitative band for a quiz result, shown next to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Performance {
    /// 90% and above.
    Excellent,
    /// 80–89%.
    Great,
    /// 70–79%.
    Good,
    KeepLearning,
}

impl Performance {
    #[must_use]
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            90.. => Self::Excellent,
            80..=89 => Self::Great,
            70..=79 => Self::Good,
            _ => Self::KeepLearning,
        }
    }
}

/// Final result of one quiz section attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    section_id: SectionId,
    correct_count: u32,
    total_count: u32,
    percentage: u8,
    completed_at: DateTime<Utc>,
}

impl QuizScore {
    /// Build a score from raw counts; `percentage` is derived.
    ///
    /// # Errors
    ///
    /// Returns `QuizScoreError` if `total` is zero or `correct > total`.
    pub fn from_counts(
        section_id: SectionId,
        correct: u32,
        total: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizScoreError> {
        let percentage = rounded_percentage(correct, total)?;
        Ok(Self {
            section_id,
            correct_count: correct,
            total_count: total,
            percentage,
            completed_at,
        })
    }

    /// Checks that a rehydrated score is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns `QuizScoreError` if counts are invalid or the stored percentage drifted.
    pub fn validate(&self) -> Result<(), QuizScoreError> {
        let expected = rounded_percentage(self.correct_count, self.total_count)?;
        if expected != self.percentage {
            return Err(QuizScoreError::PercentageMismatch {
                stored: self.percentage,
                expected,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn section_id(&self) -> &SectionId {
        &self.section_id
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn performance(&self) -> Performance {
        Performance::from_percentage(self.percentage)
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.percentage == 100
    }
}

/// `round(100 * correct / total)` with halves rounded up, in integer math.
fn rounded_percentage(correct: u32, total: u32) -> Result<u8, QuizScoreError> {
    if total == 0 {
        return Err(QuizScoreError::NoQuestions);
    }
    if correct > total {
        return Err(QuizScoreError::CorrectExceedsTotal { correct, total });
    }
    let correct = u64::from(correct);
    let total = u64::from(total);
    let pct = (200 * correct + total) / (2 * total);
    // correct <= total keeps this in 0..=100
    Ok(u8::try_from(pct).unwrap_or(100))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    fn question(id: &str, correct: usize) -> Question {
        Question::new(QuestionId::new(id).unwrap(), "Q?", options(3), correct, "").unwrap()
    }

    #[test]
    fn question_rejects_out_of_range_correct_index() {
        let err = Question::new(QuestionId::new("q1").unwrap(), "Q?", options(2), 2, "")
            .unwrap_err();
        assert!(matches!(
            err,
            QuizContentError::CorrectIndexOutOfRange { index: 2, options: 2, .. }
        ));
    }

    #[test]
    fn question_needs_two_options() {
        let err = Question::new(QuestionId::new("q1").unwrap(), "Q?", options(1), 0, "")
            .unwrap_err();
        assert!(matches!(err, QuizContentError::TooFewOptions { count: 1, .. }));
    }

    #[test]
    fn section_rejects_duplicates_and_empty() {
        let id = SectionId::new("core-concepts").unwrap();
        let err = QuizSection::new(id.clone(), "Core", "", Vec::new()).unwrap_err();
        assert!(matches!(err, QuizContentError::EmptySection(_)));

        let err = QuizSection::new(id, "Core", "", vec![question("q1", 0), question("q1", 1)])
            .unwrap_err();
        assert!(matches!(err, QuizContentError::DuplicateQuestion { .. }));
    }

    #[test]
    fn percentage_rounds_half_up() {
        let section = SectionId::new("s").unwrap();
        let score = QuizScore::from_counts(section.clone(), 2, 3, fixed_now()).unwrap();
        assert_eq!(score.percentage(), 67);

        let score = QuizScore::from_counts(section.clone(), 1, 3, fixed_now()).unwrap();
        assert_eq!(score.percentage(), 33);

        let score = QuizScore::from_counts(section.clone(), 1, 8, fixed_now()).unwrap();
        assert_eq!(score.percentage(), 13);

        let score = QuizScore::from_counts(section, 4, 4, fixed_now()).unwrap();
        assert!(score.is_perfect());
    }

    #[test]
    fn score_rejects_invalid_counts() {
        let section = SectionId::new("s").unwrap();
        assert_eq!(
            QuizScore::from_counts(section.clone(), 0, 0, fixed_now()).unwrap_err(),
            QuizScoreError::NoQuestions
        );
        assert!(matches!(
            QuizScore::from_counts(section, 4, 3, fixed_now()).unwrap_err(),
            QuizScoreError::CorrectExceedsTotal { .. }
        ));
    }

    #[test]
    fn performance_bands() {
        assert_eq!(Performance::from_percentage(100), Performance::Excellent);
        assert_eq!(Performance::from_percentage(90), Performance::Excellent);
        assert_eq!(Performance::from_percentage(85), Performance::Great);
        assert_eq!(Performance::from_percentage(70), Performance::Good);
        assert_eq!(Performance::from_percentage(69), Performance::KeepLearning);
    }

    #[test]
    fn tampered_percentage_fails_validation() {
        let json = format!(
            r#"{{"section_id":"s","correct_count":1,"total_count":2,"percentage":90,"completed_at":"{}"}}"#,
            fixed_now().to_rfc3339()
        );
        let score: QuizScore = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            score.validate(),
            Err(QuizScoreError::PercentageMismatch { stored: 90, expected: 50 })
        ));
    }
}
