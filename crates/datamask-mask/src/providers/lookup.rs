use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use datamask_core::{ColumnConfig, Error, LOOKUP_HINT, LookupSource, MaskStrategy, Result, Value};

use crate::providers::{ProviderFailure, ValueProvider, ValueRequest};

/// Substitute values pulled from the store itself.
///
/// Candidate values for a source expression are fetched once per table pass
/// and one is picked per row.
pub struct LookupProvider {
    source: Arc<dyn LookupSource>,
    candidates: Mutex<HashMap<String, Arc<Vec<Value>>>>,
}

impl LookupProvider {
    pub fn new(source: Arc<dyn LookupSource>) -> Self {
        Self {
            source,
            candidates: Mutex::new(HashMap::new()),
        }
    }

    async fn candidates(&self, expression: &str) -> Result<Arc<Vec<Value>>> {
        if let Some(values) = self.cached(expression) {
            return Ok(values);
        }

        let values: Vec<Value> = self
            .source
            .lookup_values(expression)
            .await?
            .into_iter()
            .filter(|value| !value.is_null())
            .collect();
        debug!(source = %expression, values = values.len(), "lookup candidates loaded");

        let values = Arc::new(values);
        self.candidates
            .lock()
            .map_err(|_| Error::Store("lookup cache poisoned".to_string()))?
            .insert(expression.to_string(), Arc::clone(&values));
        Ok(values)
    }

    fn cached(&self, expression: &str) -> Option<Arc<Vec<Value>>> {
        self.candidates
            .lock()
            .ok()
            .and_then(|cache| cache.get(expression).cloned())
    }
}

#[async_trait]
impl ValueProvider for LookupProvider {
    fn id(&self) -> &'static str {
        "lookup"
    }

    fn supports(&self, type_hint: &str) -> bool {
        type_hint == LOOKUP_HINT
    }

    fn validate(&self, column: &ColumnConfig, _locale: &str) -> Result<()> {
        match &column.strategy {
            MaskStrategy::Lookup { .. } => Ok(()),
            other => Err(Error::Configuration(format!(
                "column '{}' uses strategy '{}' but resolved to the lookup provider",
                column.name,
                other.kind()
            ))),
        }
    }

    fn begin_table(&self, _table: &str) {
        if let Ok(mut cache) = self.candidates.lock() {
            cache.clear();
        }
    }

    async fn generate(
        &self,
        request: &ValueRequest<'_>,
        rng: &mut ChaCha8Rng,
    ) -> std::result::Result<Value, ProviderFailure> {
        let MaskStrategy::Lookup { source, default } = &request.column.strategy else {
            return Err(ProviderFailure(
                "lookup provider called without a lookup rule".to_string(),
            ));
        };

        let values = self.candidates(source).await?;
        if values.is_empty() {
            return match default {
                Some(default) => Ok(Value::from_json(default)),
                None => Err(ProviderFailure(format!(
                    "lookup source '{source}' returned no values and no default is configured"
                ))),
            };
        }

        let pick = rng.random_range(0..values.len());
        Ok(values[pick].clone())
    }
}
