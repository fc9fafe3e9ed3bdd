use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Batch size used when neither the table nor the data source sets one.
pub const DEFAULT_UPDATE_BATCH_SIZE: usize = 500;
/// Locale used by synthetic providers when none is configured.
pub const DEFAULT_LOCALE: &str = "en_US";
/// Primary key column assumed when a table does not name one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";
/// Type hint routed to store-backed lookup providers.
pub const LOOKUP_HINT: &str = "lookup";

/// Top-level masking configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Backing store and write behaviour.
    pub data_source: DataSourceConfig,
    /// Settings shared by synthetic value providers.
    #[serde(default)]
    pub data_generation: DataGenerationConfig,
    /// Tables masked row by row, in order.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    /// Raw statements executed after every table has been masked.
    #[serde(default)]
    pub sql_statements: Vec<SqlStatementConfig>,
}

impl Config {
    pub fn new(data_source: DataSourceConfig) -> Self {
        Self {
            data_source,
            data_generation: DataGenerationConfig::default(),
            tables: Vec::new(),
            sql_statements: Vec::new(),
        }
    }
}

/// Store selection and connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataSourceConfig {
    /// Store type tag resolved through the store registry (ex.: postgres).
    #[serde(rename = "type")]
    pub kind: String,
    /// Driver connection string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    /// Compute masked values and report progress without writing.
    #[serde(default)]
    pub dry_run: bool,
    /// Rows per write batch unless a table overrides it.
    #[serde(default = "default_update_batch_size")]
    pub update_batch_size: usize,
    /// Upper bound for pooled connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    /// Seconds to wait for a pooled connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquire_timeout_secs: Option<u64>,
}

impl DataSourceConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            connection_string: None,
            dry_run: false,
            update_batch_size: DEFAULT_UPDATE_BATCH_SIZE,
            max_connections: None,
            acquire_timeout_secs: None,
        }
    }
}

/// Synthetic data settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataGenerationConfig {
    /// Locale for synthetic values (ex.: en_US, pt_BR).
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Seed for reproducible runs. A random seed is drawn when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for DataGenerationConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            seed: None,
        }
    }
}

/// A table masked row by row.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableConfig {
    /// Table name.
    pub name: String,
    /// Schema (namespace) of the table; the store default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Column identifying each row when masked values are written back.
    #[serde(default = "default_primary_key")]
    pub primary_key_column: String,
    /// Store-specific selection predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Rows per write batch for this table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    /// Masking rules, one per column.
    pub columns: Vec<ColumnConfig>,
}

impl TableConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            primary_key_column: default_primary_key(),
            filter: None,
            batch_size: None,
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnConfig) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// `schema.name` when a schema is set, otherwise the bare name.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Rules that are not marked `ignore`.
    pub fn active_columns(&self) -> impl Iterator<Item = &ColumnConfig> {
        self.columns.iter().filter(|column| !column.ignore)
    }

    /// Names of the columns written back after masking.
    pub fn masked_column_names(&self) -> Vec<&str> {
        self.active_columns()
            .map(|column| column.name.as_str())
            .collect()
    }

    /// Batch size for this table, falling back to the data source default.
    pub fn effective_batch_size(&self, default: usize) -> usize {
        self.batch_size.unwrap_or(default).max(1)
    }
}

/// Masking rule for one column.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnConfig {
    /// Column name.
    pub name: String,
    /// How the replacement value is produced.
    #[serde(flatten)]
    pub strategy: MaskStrategy,
    /// Keep NULL values as NULL instead of masking them.
    #[serde(default = "default_true")]
    pub retain_null: bool,
    /// Keep empty strings as empty strings.
    #[serde(default)]
    pub retain_empty_string: bool,
    /// Replace identical original values with identical masked values
    /// within one table pass.
    #[serde(default)]
    pub consistent: bool,
    /// Keep the rule in the file but skip it.
    #[serde(default)]
    pub ignore: bool,
}

impl ColumnConfig {
    pub fn new(name: impl Into<String>, strategy: MaskStrategy) -> Self {
        Self {
            name: name.into(),
            strategy,
            retain_null: true,
            retain_empty_string: false,
            consistent: false,
            ignore: false,
        }
    }

    pub fn generate(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self::new(
            name,
            MaskStrategy::Generate {
                type_hint: type_hint.into(),
                locale: None,
            },
        )
    }

    pub fn lookup(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(
            name,
            MaskStrategy::Lookup {
                source: source.into(),
                default: None,
            },
        )
    }

    pub fn literal(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(name, MaskStrategy::Literal { value })
    }

    pub fn consistent(mut self) -> Self {
        self.consistent = true;
        self
    }
}

/// Replacement strategy for a column.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MaskStrategy {
    /// Synthetic value for a type/format hint (ex.: `email`, `full_name`).
    Generate {
        type_hint: String,
        /// Overrides the global locale for this column.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        locale: Option<String>,
    },
    /// Substitute value pulled from the store by a source expression.
    Lookup {
        source: String,
        /// Used when the source yields no values.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    /// Constant replacement.
    Literal { value: serde_json::Value },
}

impl MaskStrategy {
    /// Hint used to resolve a provider; literals need none.
    pub fn type_hint(&self) -> Option<&str> {
        match self {
            MaskStrategy::Generate { type_hint, .. } => Some(type_hint.as_str()),
            MaskStrategy::Lookup { .. } => Some(LOOKUP_HINT),
            MaskStrategy::Literal { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MaskStrategy::Generate { .. } => "generate",
            MaskStrategy::Lookup { .. } => "lookup",
            MaskStrategy::Literal { .. } => "literal",
        }
    }
}

/// Raw statement executed verbatim against the store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SqlStatementConfig {
    /// Name used in logs and errors.
    pub name: String,
    /// Store-specific statement body.
    pub body: String,
    /// Positional parameters bound to the body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<serde_json::Value>,
}

fn default_update_batch_size() -> usize {
    DEFAULT_UPDATE_BATCH_SIZE
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

fn default_true() -> bool {
    true
}
