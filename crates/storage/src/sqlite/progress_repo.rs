use lesson_core::model::{ProgressDocument, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_progress_row, revision_to_i64, ser};
use crate::repository::{ProgressRepository, StorageError, VersionedProgress};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(
        &self,
        user_id: &UserId,
    ) -> Result<Option<VersionedProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT revision, document
                FROM progress_documents
                WHERE user_id = ?1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn save_progress(
        &self,
        document: &ProgressDocument,
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError> {
        let body = serde_json::to_string(document).map_err(ser)?;
        let completed = i64::try_from(document.completed_lessons.len()).map_err(ser)?;
        let streak = i64::from(document.streak);
        let updated_at = document.updated_at;

        let Some(expected) = expected_revision else {
            let res = sqlx::query(
                r"
                    INSERT INTO progress_documents (
                        user_id, revision, document, streak, completed_lessons, updated_at
                    )
                    VALUES (?1, 1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(user_id) DO NOTHING
                ",
            )
            .bind(document.user_id.as_str())
            .bind(&body)
            .bind(streak)
            .bind(completed)
            .bind(updated_at)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

            if res.rows_affected() == 0 {
                return Err(StorageError::Conflict);
            }
            return Ok(1);
        };

        let res = sqlx::query(
            r"
                UPDATE progress_documents
                SET revision = revision + 1,
                    document = ?1,
                    streak = ?2,
                    completed_lessons = ?3,
                    updated_at = ?4
                WHERE user_id = ?5 AND revision = ?6
            ",
        )
        .bind(&body)
        .bind(streak)
        .bind(completed)
        .bind(updated_at)
        .bind(document.user_id.as_str())
        .bind(revision_to_i64(expected)?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(expected + 1)
    }
}
