use std::sync::Arc;

use drill_core::model::ContentCatalog;
use drill_core::UnlockEngine;
use storage::{ProfileDocuments, Storage};

use crate::error::BootstrapError;
use crate::profiles::ProfileManager;
use crate::settings::DrillSettings;
use crate::sync::{NoopSync, SyncHook};
use crate::Clock;

/// Inputs shared by every storage backend.
#[derive(Clone)]
pub struct AppConfig {
    pub clock: Clock,
    pub catalog: Arc<ContentCatalog>,
    pub engine: UnlockEngine,
    pub settings: DrillSettings,
    pub storage_key: String,
    pub sync: Arc<dyn SyncHook>,
}

impl AppConfig {
    #[must_use]
    pub fn new(catalog: Arc<ContentCatalog>, engine: UnlockEngine, storage_key: impl Into<String>) -> Self {
        Self {
            clock: Clock::default(),
            catalog,
            engine,
            settings: DrillSettings::default(),
            storage_key: storage_key.into(),
            sync: Arc::new(NoopSync),
        }
    }
}

/// Assembles the profile manager over a concrete storage backend.
pub struct AppServices;

impl AppServices {
    /// Build a profile manager backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError` if storage initialization fails or the stored
    /// profiles cannot be loaded.
    pub async fn new_sqlite(db_url: &str, config: AppConfig) -> Result<ProfileManager, BootstrapError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::with_storage(&storage, config).await
    }

    /// Build a profile manager that keeps everything in memory.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError` if loading the (empty) book fails.
    pub async fn in_memory(config: AppConfig) -> Result<ProfileManager, BootstrapError> {
        Self::with_storage(&Storage::in_memory(), config).await
    }

    async fn with_storage(storage: &Storage, config: AppConfig) -> Result<ProfileManager, BootstrapError> {
        let documents = ProfileDocuments::new(Arc::clone(&storage.documents), config.storage_key);
        let manager = ProfileManager::load(config.clock, config.catalog, config.engine, documents)
            .await?
            .with_settings(config.settings)
            .with_sync(config.sync);
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::{Unit, UnitId};
    use drill_core::time::fixed_clock;
    use drill_core::PrerequisiteGraph;

    fn config() -> AppConfig {
        let catalog = ContentCatalog::new(vec![Unit::new(UnitId::new("unidad_1"))]).unwrap();
        let engine = UnlockEngine::new(PrerequisiteGraph::linear(["unidad_1"]));
        let mut config = AppConfig::new(Arc::new(catalog), engine, "test_profiles");
        config.clock = fixed_clock();
        config
    }

    #[tokio::test]
    async fn in_memory_starts_without_profiles() {
        let manager = AppServices::in_memory(config()).await.unwrap();
        assert!(manager.profiles().is_empty());
        assert!(manager.active().is_none());
        assert!(!manager.is_dirty());
    }

    #[tokio::test]
    async fn sqlite_bootstrap_persists_profiles() {
        let url = "sqlite:file:memdb_bootstrap?mode=memory&cache=shared";
        let mut manager = AppServices::new_sqlite(url, config()).await.unwrap();
        let id = manager.create_profile("Lucía").await.unwrap();

        let reopened = AppServices::new_sqlite(url, config()).await.unwrap();
        assert_eq!(reopened.active().map(|p| p.id()), Some(id));
        drop(manager);
    }
}
