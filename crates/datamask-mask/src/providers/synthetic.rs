use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;

use datamask_core::{ColumnConfig, MaskStrategy, Result, Value};

use crate::faker_rs::FakeRsAdapter;
use crate::providers::{ProviderFailure, ValueProvider, ValueRequest};

/// Locale-aware fake values for `generate` rules.
#[derive(Debug, Default, Clone)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ValueProvider for SyntheticProvider {
    fn id(&self) -> &'static str {
        "synthetic"
    }

    fn supports(&self, type_hint: &str) -> bool {
        FakeRsAdapter::supports(type_hint)
    }

    fn validate(&self, column: &ColumnConfig, locale: &str) -> Result<()> {
        if let MaskStrategy::Generate { type_hint, .. } = &column.strategy {
            FakeRsAdapter::resolve(type_hint, Some(locale))?;
        }
        Ok(())
    }

    async fn generate(
        &self,
        request: &ValueRequest<'_>,
        rng: &mut ChaCha8Rng,
    ) -> std::result::Result<Value, ProviderFailure> {
        let resolved = FakeRsAdapter::resolve(request.type_hint, Some(request.locale))?;
        Ok(FakeRsAdapter::generate_value(resolved, rng))
    }
}
