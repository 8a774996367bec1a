use chrono::{DateTime, Utc};
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{DocumentRecord, DocumentRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait::async_trait]
impl DocumentRepository for SqliteRepository {
    async fn get_document(&self, key: &str) -> Result<Option<DocumentRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT key, body, updated_at
            FROM documents
            WHERE key = ?1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(DocumentRecord {
            key: row.try_get("key").map_err(ser)?,
            body: row.try_get("body").map_err(ser)?,
            updated_at: row.try_get("updated_at").map_err(ser)?,
        }))
    }

    async fn put_document(
        &self,
        key: &str,
        body: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO documents (key, body, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(body)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn delete_document(&self, key: &str) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM documents WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
