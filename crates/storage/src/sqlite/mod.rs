//! `SQLite` backend: one `documents` table keyed by storage key.

use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;
use tracing::debug;

use crate::repository::{DocumentRepository, Storage};

mod document_repo;
mod migrate;

pub use migrate::LATEST_VERSION;

/// Applied to every pooled connection.
const CONNECTION_PRAGMAS: [&str; 2] = ["PRAGMA journal_mode = WAL;", "PRAGMA busy_timeout = 5000;"];

/// A single learner device rarely needs more than a couple of connections.
const MAX_CONNECTIONS: u32 = 4;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Opens a pool on `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if no connection can be made or a pragma fails.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for pragma in CONNECTION_PRAGMAS {
                        sqlx::query(pragma).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        debug!(url = database_url, "opened document store");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to [`LATEST_VERSION`]. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration step fails; that step is rolled back.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }

    /// The highest applied schema version, 0 before the first migration.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the version table cannot be read.
    pub async fn schema_version(&self) -> Result<i64, SqliteInitError> {
        Ok(migrate::current_version(&self.pool).await?)
    }
}

impl Storage {
    /// A migrated `SQLite` document store behind the repository trait.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let documents: Arc<dyn DocumentRepository> = Arc::new(repo);
        Ok(Self { documents })
    }
}
