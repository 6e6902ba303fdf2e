mod progress;
mod service;
mod state;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::AttemptSession;
pub use state::{SessionEvent, SessionState};
pub use workflow::LessonAttemptService;
