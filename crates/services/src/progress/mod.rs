mod aggregator;
mod request;
mod summary;

pub use aggregator::{DEFAULT_MAX_RETRIES, MergeReport, ProgressAggregator};
pub use request::{SubmitProgressRequest, SubmitProgressResponse, SubmittedStats};
pub use summary::{LessonSummary, ProgressSummary};
