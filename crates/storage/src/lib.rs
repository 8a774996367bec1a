#![forbid(unsafe_code)]

pub mod profile_document;
pub mod repository;
pub mod sqlite;

pub use profile_document::{DEFAULT_PROFILES_KEY, ProfileDocuments};
pub use repository::{DocumentRecord, DocumentRepository, InMemoryRepository, Storage, StorageError};
