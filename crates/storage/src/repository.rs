use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A stored document body together with its last write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub key: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

/// Key/value contract for whole serialized documents.
///
/// The drill core stores its entire profile book as one document under a
/// learner-scoped key, so this is the only persistence primitive it needs.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Fetch the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read. A missing key is
    /// `Ok(None)`, not an error.
    async fn get_document(&self, key: &str) -> Result<Option<DocumentRecord>, StorageError>;

    /// Store `body` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be written.
    async fn put_document(
        &self,
        key: &str,
        body: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Remove the document under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if nothing is stored under `key`.
    async fn delete_document(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    documents: Arc<Mutex<HashMap<String, DocumentRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn get_document(&self, key: &str) -> Result<Option<DocumentRecord>, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put_document(
        &self,
        key: &str,
        body: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            key.to_owned(),
            DocumentRecord {
                key: key.to_owned(),
                body: body.to_owned(),
                updated_at,
            },
        );
        Ok(())
    }

    async fn delete_document(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub documents: Arc<dyn DocumentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let documents: Arc<dyn DocumentRepository> = Arc::new(InMemoryRepository::new());
        Self { documents }
    }
}
