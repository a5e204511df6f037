#![forbid(unsafe_code)]

pub mod achievement_service;
pub mod config;
pub mod error;
pub mod events;
pub mod progress_tracker;
pub mod quiz_controller;
pub mod session;
pub mod tutor_service;

pub use tutor_core::Clock;

pub use achievement_service::AchievementService;
pub use config::TutorConfig;
pub use error::{ErrorKind, TutorError};
pub use events::{CommandOutcome, EventSink, NoopSink, RecordingSink, TutorEvent};
pub use progress_tracker::ProgressTracker;
pub use quiz_controller::{QuizController, QuizStep};
pub use session::LearnerSession;
pub use tutor_service::TutorService;
