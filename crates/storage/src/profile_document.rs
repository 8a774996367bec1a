//! JSON encoding of the profile book under a single storage key.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use drill_core::model::ProfileBook;

use crate::repository::{DocumentRepository, StorageError};

/// Storage key used when none is configured.
pub const DEFAULT_PROFILES_KEY: &str = "svt_profiles_v1";

/// Reads and writes the whole [`ProfileBook`] as one JSON document.
#[derive(Clone)]
pub struct ProfileDocuments {
    repo: Arc<dyn DocumentRepository>,
    key: String,
}

impl ProfileDocuments {
    #[must_use]
    pub fn new(repo: Arc<dyn DocumentRepository>, key: impl Into<String>) -> Self {
        Self {
            repo,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored book, or an empty one when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored document is not a
    /// valid profile book, or any error from the underlying repository.
    pub async fn load(&self) -> Result<ProfileBook, StorageError> {
        let Some(record) = self.repo.get_document(&self.key).await? else {
            debug!(key = %self.key, "no stored profiles");
            return Ok(ProfileBook::new());
        };
        let book: ProfileBook = serde_json::from_str(&record.body)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        debug!(key = %self.key, profiles = book.len(), "loaded profiles");
        Ok(book)
    }

    /// Replace the stored book.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save(&self, book: &ProfileBook, at: DateTime<Utc>) -> Result<(), StorageError> {
        let body = serde_json::to_string(book)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.repo.put_document(&self.key, &body, at).await?;
        debug!(key = %self.key, profiles = book.len(), bytes = body.len(), "saved profiles");
        Ok(())
    }
}
