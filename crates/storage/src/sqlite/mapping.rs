use lesson_core::model::{Exercise, Lesson, LessonId, ProgressDocument, Skill};
use sqlx::Row;

use crate::repository::{StorageError, VersionedProgress};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn revision_to_i64(revision: u64) -> Result<i64, StorageError> {
    i64::try_from(revision).map_err(|_| StorageError::Serialization("revision overflow".into()))
}

fn revision_from_i64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid revision: {v}")))
}

pub(crate) fn skill_to_str(skill: Option<Skill>) -> Option<&'static str> {
    skill.map(Skill::as_str)
}

fn skill_from_str(raw: Option<String>) -> Result<Option<Skill>, StorageError> {
    raw.map(|s| s.parse::<Skill>().map_err(ser)).transpose()
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<VersionedProgress, StorageError> {
    let revision = revision_from_i64(row.try_get::<i64, _>("revision").map_err(ser)?)?;
    let raw: String = row.try_get("document").map_err(ser)?;
    let document: ProgressDocument = serde_json::from_str(&raw).map_err(ser)?;
    Ok(VersionedProgress { document, revision })
}

pub(crate) fn map_lesson_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lesson, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let skill = skill_from_str(row.try_get::<Option<String>, _>("skill").map_err(ser)?)?;
    let raw: String = row.try_get("exercises").map_err(ser)?;
    let exercises: Vec<Exercise> = serde_json::from_str(&raw).map_err(ser)?;

    Lesson::new(LessonId::new(id), title, skill, exercises).map_err(ser)
}
