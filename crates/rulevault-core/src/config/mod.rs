//! Configuration system for rulevault.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RepositoryError, RepositoryResult};
use crate::traits::{NodeStoreConfig, NodeStoreProvider};
use crate::versioning::VersionScheme;

/// Main repository configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Node store configuration.
    pub node_store: NodeStoreConfig,
    /// Version markers assigned at check-in.
    pub version_scheme: VersionScheme,
}

impl RepositoryConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> RepositoryResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RepositoryError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RepositoryError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RepositoryError::Configuration(e.to_string())),
            _ => Err(RepositoryError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> RepositoryResult<Self> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Override fields from `lookup`, which maps variable names to values.
    pub fn apply_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> RepositoryResult<Self> {
        if let Some(provider) = lookup("RULEVAULT_STORE") {
            self.node_store.provider = match provider.to_lowercase().as_str() {
                "memory" => NodeStoreProvider::Memory,
                "sqlite" => NodeStoreProvider::Sqlite,
                other => {
                    return Err(RepositoryError::Configuration(format!(
                        "Unknown node store provider '{other}'"
                    )))
                }
            };
        }

        if let Some(path) = lookup("RULEVAULT_DB_PATH") {
            self.node_store.path = Some(PathBuf::from(path));
        }

        if let Some(scheme) = lookup("RULEVAULT_VERSION_SCHEME") {
            self.version_scheme = scheme.to_lowercase().parse().map_err(|_| {
                RepositoryError::Configuration(format!("Unknown version scheme '{scheme}'"))
            })?;
        }

        if let Some(workspace) = lookup("RULEVAULT_WORKSPACE") {
            self.node_store.workspace = workspace;
        }

        Ok(self)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> RepositoryConfigBuilder {
        RepositoryConfigBuilder::default()
    }
}

/// Builder for RepositoryConfig.
#[derive(Debug, Default)]
pub struct RepositoryConfigBuilder {
    config: RepositoryConfig,
}

impl RepositoryConfigBuilder {
    pub fn node_store(mut self, config: NodeStoreConfig) -> Self {
        self.config.node_store = config;
        self
    }

    pub fn provider(mut self, provider: NodeStoreProvider) -> Self {
        self.config.node_store.provider = provider;
        self
    }

    /// Set the SQLite database path.
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.node_store.path = Some(path.into());
        self
    }

    pub fn workspace(mut self, workspace: impl Into<String>) -> Self {
        self.config.node_store.workspace = workspace.into();
        self
    }

    pub fn version_scheme(mut self, scheme: VersionScheme) -> Self {
        self.config.version_scheme = scheme;
        self
    }

    pub fn build(self) -> RepositoryConfig {
        self.config
    }
}
