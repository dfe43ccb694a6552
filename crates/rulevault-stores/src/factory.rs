//! Factory for creating node store providers.

use std::sync::Arc;

use rulevault_core::config::RepositoryConfig;
use rulevault_core::error::{RepositoryError, RepositoryResult};
use rulevault_core::store::InMemoryNodeStore;
use rulevault_core::traits::{NodeStore, NodeStoreConfig, NodeStoreProvider};
use rulevault_core::RulesRepository;
use tracing::info;

/// Factory for creating node store providers.
pub struct NodeStoreFactory;

impl NodeStoreFactory {
    /// Create a node store from the given configuration.
    pub fn create(config: &NodeStoreConfig) -> RepositoryResult<Arc<dyn NodeStore>> {
        match config.provider {
            NodeStoreProvider::Memory => Ok(Arc::new(InMemoryNodeStore::new())),

            #[cfg(feature = "sqlite")]
            NodeStoreProvider::Sqlite => {
                let store = crate::sqlite::SqliteNodeStore::from_config(config)
                    .map_err(|e| RepositoryError::store("opening sqlite node store", e))?;
                Ok(Arc::new(store))
            }

            #[allow(unreachable_patterns)]
            _ => Err(RepositoryError::Configuration(format!(
                "Unsupported node store provider: {:?}",
                config.provider
            ))),
        }
    }

    /// Open a repository session over the configured store.
    pub fn open_repository(config: &RepositoryConfig) -> RepositoryResult<RulesRepository> {
        let store = Self::create(&config.node_store)?;
        info!(
            provider = ?config.node_store.provider,
            scheme = %config.version_scheme,
            "opened repository"
        );
        Ok(RulesRepository::with_config(store, config))
    }
}
