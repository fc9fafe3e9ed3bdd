//! Pluggable value providers.
//!
//! The masking engine asks each provider, in priority order, whether it
//! supports a column's type hint and delegates value production to the first
//! one that does.

mod lookup;
mod synthetic;

use std::sync::Arc;

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use datamask_core::{ColumnConfig, LookupSource, Result, Value};

pub use lookup::LookupProvider;
pub use synthetic::SyntheticProvider;

/// Failure reported by a provider for one value. The engine attaches the
/// table, row and column before surfacing it.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProviderFailure(pub String);

impl From<datamask_core::Error> for ProviderFailure {
    fn from(err: datamask_core::Error) -> Self {
        Self(err.to_string())
    }
}

/// Everything a provider may need to produce one replacement value.
#[derive(Debug, Clone, Copy)]
pub struct ValueRequest<'a> {
    pub table: &'a str,
    pub column: &'a ColumnConfig,
    pub type_hint: &'a str,
    pub locale: &'a str,
    pub original: &'a Value,
    pub row_index: u64,
}

/// Generator of replacement values for a family of type hints.
#[async_trait]
pub trait ValueProvider: Send + Sync {
    fn id(&self) -> &'static str;

    fn supports(&self, type_hint: &str) -> bool;

    /// Reject rule details the provider cannot serve, before any row is read.
    fn validate(&self, _column: &ColumnConfig, _locale: &str) -> Result<()> {
        Ok(())
    }

    /// Drop state scoped to the previous table pass.
    fn begin_table(&self, _table: &str) {}

    async fn generate(
        &self,
        request: &ValueRequest<'_>,
        rng: &mut ChaCha8Rng,
    ) -> std::result::Result<Value, ProviderFailure>;
}

/// Providers in their default priority order: synthetic first, then lookup.
pub fn default_providers(lookup: Arc<dyn LookupSource>) -> Vec<Arc<dyn ValueProvider>> {
    vec![
        Arc::new(SyntheticProvider::new()),
        Arc::new(LookupProvider::new(lookup)),
    ]
}
