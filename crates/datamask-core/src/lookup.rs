use async_trait::async_trait;

use crate::error::Result;
use crate::value::Value;

/// Store handle used by lookup providers to fetch substitute values.
#[async_trait]
pub trait LookupSource: Send + Sync {
    /// Run a source expression and return the first column of every row.
    async fn lookup_values(&self, source: &str) -> Result<Vec<Value>>;
}
