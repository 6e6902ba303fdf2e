use chrono::Utc;
use lesson_core::model::{Lesson, LessonId};

use super::SqliteRepository;
use super::mapping::{conn, map_lesson_row, ser, skill_to_str};
use crate::repository::{LessonRepository, StorageError};

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let exercises = serde_json::to_string(&lesson.exercises).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO lessons (id, title, skill, exercises, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    skill = excluded.skill,
                    exercises = excluded.exercises,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(lesson.id.as_str())
        .bind(&lesson.title)
        .bind(skill_to_str(lesson.skill))
        .bind(exercises)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, title, skill, exercises
                FROM lessons
                WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_lesson_row(&row)
    }

    async fn list_lessons(&self, limit: u32) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, title, skill, exercises
                FROM lessons
                ORDER BY id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_lesson_row).collect()
    }
}
