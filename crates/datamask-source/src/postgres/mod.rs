use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use sqlx::PgPool;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use datamask_core::{
    DataSourceConfig, Error, LookupSource, Result, Row, SqlStatementConfig, TableConfig, Value,
};

use crate::adapter::{DataSource, RowStream, StatementExecutor};
use crate::registry::{StoreFactory, StoreHandle};

mod decode;
mod queries;

pub use queries::quote_ident;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
/// Rows fetched ahead of the masking stage.
const READ_BUFFER: usize = 256;

/// Store backed by a PostgreSQL pool.
#[derive(Debug)]
pub struct PostgresStore {
    pool: PgPool,
    config: DataSourceConfig,
    columns: Mutex<HashMap<String, Arc<Vec<queries::ColumnMeta>>>>,
}

impl PostgresStore {
    /// Create a new store using a pre-configured pool.
    pub fn new(pool: PgPool, config: DataSourceConfig) -> Self {
        Self {
            pool,
            config,
            columns: Mutex::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn columns(&self, table: &TableConfig) -> Result<Arc<Vec<queries::ColumnMeta>>> {
        let key = table.qualified_name();
        if let Some(columns) = self
            .columns
            .lock()
            .ok()
            .and_then(|cache| cache.get(&key).cloned())
        {
            return Ok(columns);
        }

        let columns = Arc::new(queries::list_columns(&self.pool, table).await?);
        if let Ok(mut cache) = self.columns.lock() {
            cache.insert(key, Arc::clone(&columns));
        }
        Ok(columns)
    }
}

#[async_trait]
impl DataSource for PostgresStore {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    async fn count(&self, table: &TableConfig) -> Result<u64> {
        queries::count_rows(&self.pool, table).await
    }

    async fn rows(&self, table: &TableConfig) -> Result<RowStream> {
        let columns = self.columns(table).await?;
        let sql = queries::select_sql(table, &columns)?;
        debug!(table = %table.qualified_name(), sql = %sql, "streaming rows");

        let pool = self.pool.clone();
        let (tx, rx) = mpsc::channel(READ_BUFFER);
        tokio::spawn(async move {
            let mut rows = sqlx::query(&sql).fetch(&pool);
            while let Some(next) = rows.next().await {
                let item = next
                    .map_err(queries::store_error)
                    .and_then(|row| decode::decode_row(&row));
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn write_batch(&self, table: &TableConfig, rows: &[Row]) -> Result<u64> {
        let columns = self.columns(table).await?;
        let plan = queries::UpdatePlan::new(table, &columns)?;
        let pk = table.primary_key_column.as_str();

        let mut tx = self.pool.begin().await.map_err(queries::store_error)?;
        let mut affected = 0;
        for row in rows {
            let mut query = sqlx::query(&plan.sql);
            for column in &plan.columns {
                let value = row
                    .get(column)
                    .ok_or_else(|| Error::Store(format!("row without column '{column}'")))?;
                query = query.bind(value.to_sql_text());
            }
            let key = row
                .get(pk)
                .ok_or_else(|| Error::Store(format!("row without primary key '{pk}'")))?;
            query = query.bind(key.to_sql_text());

            affected += query
                .execute(&mut *tx)
                .await
                .map_err(queries::store_error)?
                .rows_affected();
        }
        tx.commit().await.map_err(queries::store_error)?;

        Ok(affected)
    }
}

#[async_trait]
impl StatementExecutor for PostgresStore {
    async fn execute(&self, statement: &SqlStatementConfig) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(queries::store_error)?;

        let result = if statement.params.is_empty() {
            sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&statement.body)).await
        } else {
            statement
                .params
                .iter()
                .fold(sqlx::query(&statement.body), bind_json)
                .execute(&mut *tx)
                .await
        };
        let affected = result.map_err(queries::store_error)?.rows_affected();

        tx.commit().await.map_err(queries::store_error)?;
        Ok(affected)
    }
}

#[async_trait]
impl LookupSource for PostgresStore {
    async fn lookup_values(&self, source: &str) -> Result<Vec<Value>> {
        let rows = sqlx::query(source)
            .fetch_all(&self.pool)
            .await
            .map_err(queries::store_error)?;

        rows.iter()
            .map(|row| {
                if sqlx::Row::is_empty(row) {
                    return Err(Error::Store(format!(
                        "lookup source returned no columns: {source}"
                    )));
                }
                decode::decode_value(row, 0)
            })
            .collect()
    }
}

fn bind_json<'q>(
    query: Query<'q, sqlx::Postgres, PgArguments>,
    param: &serde_json::Value,
) -> Query<'q, sqlx::Postgres, PgArguments> {
    match param {
        serde_json::Value::Null => query.bind(None::<String>),
        serde_json::Value::Bool(flag) => query.bind(*flag),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(int) => query.bind(int),
            None => query.bind(number.as_f64()),
        },
        serde_json::Value::String(text) => query.bind(text.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Opens `PostgresStore`s from a data source configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresFactory;

#[async_trait]
impl StoreFactory for PostgresFactory {
    async fn connect(&self, config: &DataSourceConfig) -> Result<StoreHandle> {
        let conn = config.connection_string.as_deref().ok_or_else(|| {
            Error::Configuration("data_source.connection_string is required for postgres".into())
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .acquire_timeout(Duration::from_secs(
                config
                    .acquire_timeout_secs
                    .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            ))
            .connect(conn)
            .await
            .map_err(queries::store_error)?;
        info!(event = "store_connected", engine = "postgres", "connected");

        Ok(StoreHandle::from_store(PostgresStore::new(
            pool,
            config.clone(),
        )))
    }
}
