mod achievement;
mod answer;
mod attempt;
mod exercise;
mod ids;
mod lesson;
mod progress;
mod skill;

pub use achievement::Achievement;
pub use answer::{AnswerValue, Submission};
pub use attempt::{
    AttemptError, AttemptResult, AttemptTotals, OutcomeStatus, QuestionOutcome, score_percent,
};
pub use exercise::{Blank, Difficulty, Exercise, ExerciseError, ExerciseKind};
pub use ids::{AttemptId, ExerciseId, LessonId, ParseIdError, UserId};
pub use lesson::{Lesson, LessonError};
pub use progress::{
    COMPLETION_THRESHOLD, DEFAULT_WEEKLY_GOAL, LessonProgressEntry, LessonStats,
    ProgressDocument, SkillScore,
};
pub use skill::{Skill, UnknownSkill};
