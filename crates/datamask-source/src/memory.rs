use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;

use datamask_core::{
    DataSourceConfig, Error, LookupSource, Result, Row, SqlStatementConfig, TableConfig, Value,
};

use crate::adapter::{DataSource, RowStream, StatementExecutor};
use crate::registry::{StoreFactory, StoreHandle};

/// In-process store used by tests and dry runs over fixtures.
///
/// Clones share the same tables and journal, so a test can keep one handle
/// for assertions while the pipeline works through another.
#[derive(Clone)]
pub struct MemoryStore {
    config: DataSourceConfig,
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    reference: HashMap<String, Vec<Value>>,
    batches: Vec<(String, usize)>,
    statements: Vec<String>,
    reads: usize,
    fail_batch: Option<usize>,
    fail_statement: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(DataSourceConfig::new("memory"))
    }

    pub fn with_config(config: DataSourceConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Same storage, different settings.
    pub fn reconfigured(&self, config: DataSourceConfig) -> Self {
        Self {
            config,
            state: Arc::clone(&self.state),
        }
    }

    pub fn insert_table(&self, table: &str, rows: Vec<Row>) {
        if let Ok(mut state) = self.lock() {
            state.tables.insert(table.to_string(), rows);
        }
    }

    /// Values returned for a lookup source expression.
    pub fn insert_reference(&self, source: &str, values: Vec<Value>) {
        if let Ok(mut state) = self.lock() {
            state.reference.insert(source.to_string(), values);
        }
    }

    /// Make the n-th write batch (1-based, counted across tables) fail.
    pub fn fail_batch(&self, batch: usize) {
        if let Ok(mut state) = self.lock() {
            state.fail_batch = Some(batch);
        }
    }

    pub fn fail_statement(&self, name: &str) {
        if let Ok(mut state) = self.lock() {
            state.fail_statement = Some(name.to_string());
        }
    }

    pub fn table(&self, table: &str) -> Vec<Row> {
        self.lock()
            .ok()
            .and_then(|state| state.tables.get(table).cloned())
            .unwrap_or_default()
    }

    /// Sizes of the batches written so far, per table, in write order.
    pub fn batch_sizes(&self, table: &str) -> Vec<usize> {
        self.lock()
            .map(|state| {
                state
                    .batches
                    .iter()
                    .filter(|(name, _)| name == table)
                    .map(|(_, size)| *size)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn executed_statements(&self) -> Vec<String> {
        self.lock()
            .map(|state| state.statements.clone())
            .unwrap_or_default()
    }

    /// Number of `rows` calls served.
    pub fn reads(&self) -> usize {
        self.lock().map(|state| state.reads).unwrap_or_default()
    }

    pub fn handle(&self) -> StoreHandle {
        StoreHandle::from_store(self.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))
    }

    fn matching_rows(&self, table: &TableConfig) -> Result<Vec<Row>> {
        let filter = table.filter.as_deref().map(EqualityFilter::parse).transpose()?;
        let state = self.lock()?;
        let rows = state.tables.get(&table.qualified_name()).ok_or_else(|| {
            Error::Store(format!("relation '{}' does not exist", table.qualified_name()))
        })?;

        Ok(rows
            .iter()
            .filter(|row| filter.as_ref().is_none_or(|filter| filter.matches(row)))
            .cloned()
            .collect())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for MemoryStore {
    fn engine(&self) -> &'static str {
        "memory"
    }

    fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    async fn count(&self, table: &TableConfig) -> Result<u64> {
        Ok(self.matching_rows(table)?.len() as u64)
    }

    async fn rows(&self, table: &TableConfig) -> Result<RowStream> {
        let rows = self.matching_rows(table)?;
        self.lock()?.reads += 1;
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn write_batch(&self, table: &TableConfig, rows: &[Row]) -> Result<u64> {
        let name = table.qualified_name();
        let mut state = self.lock()?;

        let attempt = state.batches.len() + 1;
        if state.fail_batch == Some(attempt) {
            return Err(Error::Store(format!("injected failure on batch {attempt}")));
        }

        let pk = table.primary_key_column.as_str();
        let columns = table.masked_column_names();
        let stored = state
            .tables
            .get_mut(&name)
            .ok_or_else(|| Error::Store(format!("relation '{name}' does not exist")))?;

        let mut written = 0;
        for row in rows {
            let key = row
                .get(pk)
                .ok_or_else(|| Error::Store(format!("row without primary key '{pk}'")))?;
            let Some(target) = stored.iter_mut().find(|candidate| candidate.get(pk) == Some(key))
            else {
                continue;
            };
            for column in &columns {
                let value = row
                    .get(column)
                    .cloned()
                    .ok_or_else(|| Error::Store(format!("row without column '{column}'")))?;
                target.replace(column, value);
            }
            written += 1;
        }

        state.batches.push((name, rows.len()));
        Ok(written)
    }
}

#[async_trait]
impl StatementExecutor for MemoryStore {
    async fn execute(&self, statement: &SqlStatementConfig) -> Result<u64> {
        let mut state = self.lock()?;
        if state.fail_statement.as_deref() == Some(statement.name.as_str()) {
            return Err(Error::Store(format!(
                "statement '{}' rejected by store",
                statement.name
            )));
        }
        state.statements.push(statement.name.clone());
        Ok(0)
    }
}

#[async_trait]
impl LookupSource for MemoryStore {
    async fn lookup_values(&self, source: &str) -> Result<Vec<Value>> {
        Ok(self
            .lock()?
            .reference
            .get(source)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl StoreFactory for MemoryStore {
    async fn connect(&self, config: &DataSourceConfig) -> Result<StoreHandle> {
        Ok(self.reconfigured(config.clone()).handle())
    }
}

/// `column = literal` predicates joined by `AND`.
struct EqualityFilter {
    terms: Vec<(String, Value)>,
}

impl EqualityFilter {
    fn parse(filter: &str) -> Result<Self> {
        let mut terms = Vec::new();
        for term in split_and(filter) {
            let (column, literal) = term.split_once('=').ok_or_else(|| {
                Error::Store(format!("memory store only supports equality filters: '{term}'"))
            })?;
            let column = column.trim().trim_matches('"').to_string();
            let literal = literal.trim();
            let value = match literal.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
                Some(text) => Value::Text(text.replace("''", "'")),
                None if literal.eq_ignore_ascii_case("true") => Value::Bool(true),
                None if literal.eq_ignore_ascii_case("false") => Value::Bool(false),
                None => literal.parse::<i64>().map(Value::Int).map_err(|_| {
                    Error::Store(format!("unsupported literal in memory filter: '{literal}'"))
                })?,
            };
            terms.push((column, value));
        }
        Ok(Self { terms })
    }

    fn matches(&self, row: &Row) -> bool {
        self.terms
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }
}

fn split_and(filter: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut rest = filter;
    while let Some(idx) = rest.to_ascii_lowercase().find(" and ") {
        terms.push(rest[..idx].trim());
        rest = &rest[idx + 5..];
    }
    terms.push(rest.trim());
    terms
}
