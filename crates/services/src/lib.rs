#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress;
pub mod sessions;

pub use lesson_core::Clock;

pub use app_services::{AppServices, ServiceSettings};
pub use error::{AppServicesError, ProgressError, SessionError};
pub use progress::{
    MergeReport, ProgressAggregator, ProgressSummary, SubmitProgressRequest,
    SubmitProgressResponse, SubmittedStats,
};
pub use sessions::{AttemptSession, LessonAttemptService, SessionProgress, SessionState};
