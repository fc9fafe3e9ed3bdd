use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use datamask_core::{DataSourceConfig, Error, LookupSource, Result, redact_connection_string};

use crate::adapter::{DataSource, StatementExecutor};
use crate::postgres::PostgresFactory;

/// Everything the pipeline needs from one opened store.
#[derive(Clone)]
pub struct StoreHandle {
    pub data_source: Arc<dyn DataSource>,
    pub statements: Arc<dyn StatementExecutor>,
    pub lookup: Arc<dyn LookupSource>,
}

impl StoreHandle {
    /// Share one store value for all three roles.
    pub fn from_store<T>(store: T) -> Self
    where
        T: DataSource + StatementExecutor + LookupSource + 'static,
    {
        let store = Arc::new(store);
        Self {
            data_source: store.clone(),
            statements: store.clone(),
            lookup: store,
        }
    }
}

/// Opens a store for a data source configuration.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    async fn connect(&self, config: &DataSourceConfig) -> Result<StoreHandle>;
}

/// Maps data source type tags to store factories.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    factories: BTreeMap<String, Arc<dyn StoreFactory>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in stores (`postgres`, alias `postgresql`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let postgres: Arc<dyn StoreFactory> = Arc::new(PostgresFactory);
        registry.register_shared("postgres", postgres.clone());
        registry.register_shared("postgresql", postgres);
        registry
    }

    /// Register (or replace) the factory for a type tag. Tags are matched
    /// case-insensitively.
    pub fn register(&mut self, kind: &str, factory: impl StoreFactory + 'static) {
        self.register_shared(kind, Arc::new(factory));
    }

    pub fn register_shared(&mut self, kind: &str, factory: Arc<dyn StoreFactory>) {
        self.factories.insert(kind.to_ascii_lowercase(), factory);
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(&kind.to_ascii_lowercase())
    }

    /// Open the store named by `config.kind`.
    pub async fn connect(&self, config: &DataSourceConfig) -> Result<StoreHandle> {
        let factory = self
            .factories
            .get(&config.kind.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "unknown data source type '{}' (registered: {})",
                    config.kind,
                    self.kinds().join(", ")
                ))
            })?;

        let target = config
            .connection_string
            .as_deref()
            .map(|conn| redact_connection_string(conn).redacted)
            .unwrap_or_default();
        info!(
            event = "store_connect",
            kind = %config.kind,
            target = %target,
            dry_run = config.dry_run,
            "opening data source"
        );

        factory.connect(config).await
    }
}
