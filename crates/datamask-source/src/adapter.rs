use async_trait::async_trait;
use futures::stream::BoxStream;

use datamask_core::{DataSourceConfig, Result, Row, SqlStatementConfig, TableConfig};

/// Lazy, finite, non-restartable sequence of rows.
pub type RowStream = BoxStream<'static, Result<Row>>;

/// Backing store that rows are read from and masked rows written back to.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Settings the store was opened with (dry-run flag, default batch size).
    fn config(&self) -> &DataSourceConfig;

    /// Number of rows matching the table's filter.
    async fn count(&self, table: &TableConfig) -> Result<u64>;

    /// Stream the rows matching the table's filter in primary key order.
    /// Each call issues a new read.
    async fn rows(&self, table: &TableConfig) -> Result<RowStream>;

    /// Write the masked columns of one batch as a single unit of work.
    /// Returns the number of rows the store reports as updated.
    async fn write_batch(&self, table: &TableConfig, rows: &[Row]) -> Result<u64>;
}

/// Runs raw statements verbatim against the store.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Returns the number of rows affected as reported by the store.
    async fn execute(&self, statement: &SqlStatementConfig) -> Result<u64>;
}
