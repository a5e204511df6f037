mod achievement;
mod guide;
mod ids;
mod progress;
mod quiz;
mod quiz_session;
mod settings;

pub use ids::{GuideId, LearnerId, PageId, ParseIdError, QuestionId, SectionId};

pub use achievement::{
    AchievementCategory, AchievementDefinition, AchievementId, AchievementState,
    UnknownAchievement,
};
pub use guide::{Guide, GuideContentError, GuideStep};
pub use progress::{GuideProgress, LearnerProgress, PageProgress, ProgressError};
pub use quiz::{Performance, Question, QuizContentError, QuizScore, QuizScoreError, QuizSection};
pub use quiz_session::{AnswerFeedback, QuizSession, QuizSessionError, QuizState};
pub use settings::{
    DEFAULT_DEDICATED_LEARNER_MINUTES, DEFAULT_KNOWLEDGE_SEEKER_THRESHOLD, DEFAULT_TOTAL_PAGES,
    TutorSettings, TutorSettingsDraft, TutorSettingsError,
};
