use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use datamask_core::{
    ColumnConfig, DataGenerationConfig, Error, MaskStrategy, Result, Row, TableConfig, Value,
};

use crate::providers::{ValueProvider, ValueRequest};

/// Applies column rules to rows through an ordered list of providers.
pub struct MaskingEngine {
    providers: Vec<Arc<dyn ValueProvider>>,
    locale: String,
    seed: u64,
}

impl MaskingEngine {
    /// Providers are consulted in the given order; the first one that
    /// supports a type hint wins.
    pub fn new(providers: Vec<Arc<dyn ValueProvider>>, generation: &DataGenerationConfig) -> Self {
        let seed = match generation.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random();
                info!(seed, "no masking seed configured, drew a random one");
                seed
            }
        };
        Self {
            providers,
            locale: generation.locale.clone(),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.id()).collect()
    }

    /// First provider supporting `type_hint`, in priority order.
    pub fn resolve_provider(&self, type_hint: &str) -> Option<&Arc<dyn ValueProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.supports(type_hint))
    }

    /// Check that every active rule of `table` resolves, without touching
    /// provider state.
    pub fn validate_table(&self, table: &TableConfig) -> Result<()> {
        self.resolve_rules(table).map(|_| ())
    }

    /// Resolve the rules of `table` and start a fresh table pass.
    pub fn prepare<'a>(&'a self, table: &'a TableConfig) -> Result<TableMasker<'a>> {
        let rules = self.resolve_rules(table)?;
        let qualified = table.qualified_name();
        for rule in &rules {
            if let RuleSource::Provider(provider) = &rule.source {
                provider.begin_table(&qualified);
            }
        }
        debug!(table = %qualified, rules = rules.len(), "masking rules resolved");

        Ok(TableMasker {
            table,
            qualified,
            rules,
            cache: HashMap::new(),
            rows_masked: 0,
        })
    }

    /// Mask a single row outside of a table pass.
    pub async fn mask_row(&self, row: Row, table: &TableConfig) -> Result<Row> {
        self.prepare(table)?.mask(row).await
    }

    fn resolve_rules<'a>(&'a self, table: &'a TableConfig) -> Result<Vec<ResolvedRule<'a>>> {
        let table_seed = hash_seed(self.seed, &table.qualified_name());
        let mut rules = Vec::new();

        for column in table.active_columns() {
            let locale = match &column.strategy {
                MaskStrategy::Generate {
                    locale: Some(locale),
                    ..
                } => locale.as_str(),
                _ => self.locale.as_str(),
            };

            let source = match (&column.strategy, column.strategy.type_hint()) {
                (MaskStrategy::Literal { value }, _) => RuleSource::Literal(Value::from_json(value)),
                (_, Some(hint)) => {
                    let provider = self.resolve_provider(hint).ok_or_else(|| {
                        Error::Configuration(format!(
                            "no provider supports type hint '{hint}' (table '{}', column '{}')",
                            table.qualified_name(),
                            column.name
                        ))
                    })?;
                    provider.validate(column, locale).map_err(|err| {
                        Error::Configuration(format!(
                            "table '{}', column '{}': {}",
                            table.qualified_name(),
                            column.name,
                            describe(&err)
                        ))
                    })?;
                    RuleSource::Provider(Arc::clone(provider))
                }
                (_, None) => {
                    return Err(Error::Configuration(format!(
                        "column '{}' has no type hint",
                        column.name
                    )));
                }
            };

            rules.push(ResolvedRule {
                column,
                type_hint: column.strategy.type_hint().unwrap_or_default(),
                locale,
                seed: hash_seed(table_seed, &column.name),
                source,
            });
        }

        Ok(rules)
    }
}

enum RuleSource {
    Provider(Arc<dyn ValueProvider>),
    Literal(Value),
}

struct ResolvedRule<'a> {
    column: &'a ColumnConfig,
    type_hint: &'a str,
    locale: &'a str,
    seed: u64,
    source: RuleSource,
}

/// Masks the rows of one table pass.
///
/// Row indexes and the consistency cache are scoped to the pass.
pub struct TableMasker<'a> {
    table: &'a TableConfig,
    qualified: String,
    rules: Vec<ResolvedRule<'a>>,
    cache: HashMap<(usize, String), Value>,
    rows_masked: u64,
}

impl TableMasker<'_> {
    pub fn rows_masked(&self) -> u64 {
        self.rows_masked
    }

    /// Replace every ruled column of `row`; other columns pass through.
    pub async fn mask(&mut self, mut row: Row) -> Result<Row> {
        let row_index = self.rows_masked;

        for (idx, rule) in self.rules.iter().enumerate() {
            let column = rule.column;
            let Some(original) = row.get(&column.name).cloned() else {
                return Err(self.provider_error(
                    &row,
                    row_index,
                    column,
                    "column is missing from the row".to_string(),
                ));
            };
            if column.retain_null && original.is_null() {
                continue;
            }
            if column.retain_empty_string && original.is_empty_text() {
                continue;
            }

            let masked = if column.consistent {
                let key = (idx, original.fingerprint());
                match self.cache.get(&key) {
                    Some(value) => value.clone(),
                    None => {
                        let seed = hash_seed(rule.seed, &key.1);
                        let value = self
                            .produce(rule, &original, row_index, seed)
                            .await
                            .map_err(|message| {
                                self.provider_error(&row, row_index, column, message)
                            })?;
                        self.cache.insert(key, value.clone());
                        value
                    }
                }
            } else {
                let seed = hash_row_seed(rule.seed, row_index);
                self.produce(rule, &original, row_index, seed)
                    .await
                    .map_err(|message| self.provider_error(&row, row_index, column, message))?
            };

            row.replace(&column.name, masked);
        }

        self.rows_masked += 1;
        Ok(row)
    }

    async fn produce(
        &self,
        rule: &ResolvedRule<'_>,
        original: &Value,
        row_index: u64,
        seed: u64,
    ) -> std::result::Result<Value, String> {
        let provider = match &rule.source {
            RuleSource::Literal(value) => return Ok(value.clone()),
            RuleSource::Provider(provider) => provider,
        };

        let request = ValueRequest {
            table: &self.qualified,
            column: rule.column,
            type_hint: rule.type_hint,
            locale: rule.locale,
            original,
            row_index,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        provider
            .generate(&request, &mut rng)
            .await
            .map_err(|failure| failure.0)
    }

    fn provider_error(
        &self,
        row: &Row,
        row_index: u64,
        column: &ColumnConfig,
        message: String,
    ) -> Error {
        let pk = &self.table.primary_key_column;
        let row_label = match row.get(pk) {
            Some(value) => format!("row {row_index} ({pk}={value})"),
            None => format!("row {row_index}"),
        };
        Error::Provider {
            table: self.qualified.clone(),
            row: row_label,
            column: column.name.clone(),
            message,
        }
    }
}

fn describe(err: &Error) -> String {
    match err {
        Error::Configuration(message) => message.clone(),
        other => other.to_string(),
    }
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn hash_row_seed(column_seed: u64, row_index: u64) -> u64 {
    let hash = column_seed ^ row_index.wrapping_mul(0x9e3779b97f4a7c15);
    hash.wrapping_mul(0x100000001b3)
}
