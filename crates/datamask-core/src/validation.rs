use std::collections::{BTreeSet, HashSet};

use crate::config::{Config, MaskStrategy, TableConfig};
use crate::error::{Error, Result};

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Structured validation issue with location and hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    pub path: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            hint,
        }
    }
}

/// Aggregated validation report with errors and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, code: &str, path: String, message: String, hint: Option<&str>) {
        self.errors.push(ValidationIssue::new(
            IssueSeverity::Error,
            code,
            path,
            message,
            hint.map(str::to_string),
        ));
    }

    fn warning(&mut self, code: &str, path: String, message: String) {
        self.warnings.push(ValidationIssue::new(
            IssueSeverity::Warning,
            code,
            path,
            message,
            None,
        ));
    }

    /// Collapse the report into a configuration error when it has errors;
    /// otherwise hand back the warnings.
    pub fn into_result(self) -> Result<Vec<ValidationIssue>> {
        if self.is_ok() {
            return Ok(self.warnings);
        }
        let details = self
            .errors
            .iter()
            .map(|issue| format!("{}: {}", issue.path, issue.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Configuration(details))
    }
}

/// Validate the structural rules of a configuration.
///
/// Provider support for type hints is checked separately by the masking
/// engine, which knows the registered providers.
pub fn validate_config(config: &Config) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.data_source.kind.trim().is_empty() {
        report.error(
            "data_source_type_missing",
            "/data_source/type".to_string(),
            "data source type must not be empty".to_string(),
            Some("set data_source.type (ex.: postgres)"),
        );
    }
    if config.data_source.update_batch_size == 0 {
        report.error(
            "batch_size_zero",
            "/data_source/update_batch_size".to_string(),
            "update_batch_size must be greater than zero".to_string(),
            None,
        );
    }
    if let Some(max) = config.data_source.max_connections.filter(|max| *max < 2) {
        report.error(
            "max_connections_too_low",
            "/data_source/max_connections".to_string(),
            format!(
                "max_connections is {max}, but reading a table and writing its batches \
                 need two connections at once"
            ),
            Some("set data_source.max_connections to 2 or more, or remove it"),
        );
    }

    let mut seen_tables = HashSet::new();
    for (idx, table) in config.tables.iter().enumerate() {
        if !seen_tables.insert(table.qualified_name()) {
            report.warning(
                "table_duplicate",
                format!("/tables/{idx}"),
                format!("table '{}' is configured more than once", table.qualified_name()),
            );
        }
        validate_table(idx, table, &mut report);
    }

    let mut seen_statements = HashSet::new();
    for (idx, statement) in config.sql_statements.iter().enumerate() {
        let path = format!("/sql_statements/{idx}");
        if statement.name.trim().is_empty() {
            report.error(
                "statement_name_missing",
                format!("{path}/name"),
                "statement name must not be empty".to_string(),
                None,
            );
        } else if !seen_statements.insert(statement.name.as_str()) {
            report.warning(
                "statement_duplicate",
                path.clone(),
                format!("statement '{}' is configured more than once", statement.name),
            );
        }
        if statement.body.trim().is_empty() {
            report.error(
                "statement_body_empty",
                format!("{path}/body"),
                format!("statement '{}' has an empty body", statement.name),
                None,
            );
        }
    }

    report
}

fn validate_table(idx: usize, table: &TableConfig, report: &mut ValidationReport) {
    let path = format!("/tables/{idx}");

    if table.name.trim().is_empty() {
        report.error(
            "table_name_missing",
            format!("{path}/name"),
            "table name must not be empty".to_string(),
            None,
        );
    }
    if table.primary_key_column.trim().is_empty() {
        report.error(
            "primary_key_missing",
            format!("{path}/primary_key_column"),
            format!("table '{}' needs a primary key column", table.name),
            None,
        );
    }
    if table.batch_size == Some(0) {
        report.error(
            "batch_size_zero",
            format!("{path}/batch_size"),
            format!("table '{}' batch_size must be greater than zero", table.name),
            None,
        );
    }
    if table.active_columns().next().is_none() {
        report.warning(
            "table_without_rules",
            format!("{path}/columns"),
            format!("table '{}' has no active column rules", table.name),
        );
    }

    let filter_columns = table
        .filter
        .as_deref()
        .map(filter_identifiers)
        .unwrap_or_default();

    let mut seen = HashSet::new();
    for (col_idx, column) in table.columns.iter().enumerate() {
        let col_path = format!("{path}/columns/{col_idx}");
        if column.name.trim().is_empty() {
            report.error(
                "column_name_missing",
                format!("{col_path}/name"),
                "column name must not be empty".to_string(),
                None,
            );
            continue;
        }
        if !seen.insert(column.name.as_str()) {
            report.error(
                "column_duplicate",
                col_path.clone(),
                format!(
                    "column '{}' has more than one rule in table '{}'",
                    column.name, table.name
                ),
                Some("keep a single rule per column"),
            );
        }
        if column.ignore {
            continue;
        }
        if column.name.eq_ignore_ascii_case(&table.primary_key_column) {
            report.error(
                "primary_key_masked",
                col_path.clone(),
                format!(
                    "column '{}' is the primary key of table '{}' and cannot be masked",
                    column.name, table.name
                ),
                Some("remove the rule or mark it ignore"),
            );
        }
        if filter_columns.contains(&column.name.to_lowercase()) {
            report.error(
                "filter_column_masked",
                col_path.clone(),
                format!(
                    "column '{}' is referenced by the filter of table '{}' and cannot be masked",
                    column.name, table.name
                ),
                Some("remove the rule or change the filter"),
            );
        }
        match &column.strategy {
            MaskStrategy::Generate { type_hint, .. } if type_hint.trim().is_empty() => {
                report.error(
                    "type_hint_missing",
                    format!("{col_path}/type_hint"),
                    format!("column '{}' has an empty type_hint", column.name),
                    None,
                );
            }
            MaskStrategy::Lookup { source, .. } if source.trim().is_empty() => {
                report.error(
                    "lookup_source_missing",
                    format!("{col_path}/source"),
                    format!("column '{}' has an empty lookup source", column.name),
                    None,
                );
            }
            _ => {}
        }
    }
}

/// Identifiers referenced by a filter predicate, lowercased.
///
/// String literals are skipped and double-quoted identifiers are unquoted.
pub fn filter_identifiers(filter: &str) -> BTreeSet<String> {
    let mut identifiers = BTreeSet::new();
    let mut chars = filter.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                while let Some(inner) = chars.next() {
                    if inner == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '"' => {
                let mut ident = String::new();
                for inner in chars.by_ref() {
                    if inner == '"' {
                        break;
                    }
                    ident.push(inner);
                }
                if !ident.is_empty() {
                    identifiers.insert(ident.to_lowercase());
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                identifiers.insert(ident.to_lowercase());
            }
            c if c.is_ascii_digit() => {
                while chars
                    .peek()
                    .is_some_and(|next| next.is_alphanumeric() || *next == '.')
                {
                    chars.next();
                }
            }
            _ => {}
        }
    }

    identifiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnConfig, DataSourceConfig, SqlStatementConfig};

    fn config_with(table: TableConfig) -> Config {
        let mut config = Config::new(DataSourceConfig::new("postgres"));
        config.tables.push(table);
        config
    }

    #[test]
    fn accepts_a_plain_table() {
        let config = config_with(
            TableConfig::new("customers").with_column(ColumnConfig::generate("email", "email")),
        );
        let report = validate_config(&config);
        assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn rejects_masking_the_primary_key() {
        let config = config_with(
            TableConfig::new("customers").with_column(ColumnConfig::generate("id", "uuid")),
        );
        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, "primary_key_masked");
    }

    #[test]
    fn rejects_a_single_connection_pool() {
        let mut config = config_with(
            TableConfig::new("customers").with_column(ColumnConfig::generate("email", "email")),
        );
        config.data_source.max_connections = Some(1);
        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, "max_connections_too_low");
        assert!(report.errors[0].hint.is_some());

        config.data_source.max_connections = Some(2);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_masking_filter_columns() {
        let config = config_with(
            TableConfig::new("customers")
                .with_filter("\"Region\" = 'email' AND active")
                .with_column(ColumnConfig::generate("email", "email"))
                .with_column(ColumnConfig::generate("region", "state")),
        );
        let report = validate_config(&config);
        let codes: Vec<_> = report.errors.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["filter_column_masked"]);
        assert_eq!(report.errors[0].path, "/tables/0/columns/1");
    }

    #[test]
    fn rejects_duplicate_column_rules() {
        let config = config_with(
            TableConfig::new("customers")
                .with_column(ColumnConfig::generate("email", "email"))
                .with_column(ColumnConfig::generate("email", "safe_email")),
        );
        let err = validate_config(&config)
            .into_result()
            .expect_err("duplicate rule must fail");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("/tables/0/columns/1"));
    }

    #[test]
    fn rejects_empty_statement_bodies() {
        let mut config = Config::new(DataSourceConfig::new("postgres"));
        config.sql_statements.push(SqlStatementConfig {
            name: "hash_ssn".to_string(),
            body: "  ".to_string(),
            params: Vec::new(),
        });
        let report = validate_config(&config);
        assert_eq!(report.errors[0].code, "statement_body_empty");
    }

    #[test]
    fn filter_identifiers_skip_literals() {
        let found = filter_identifiers("status = 'it''s active' and created_at > 2020");
        let expected: BTreeSet<String> = ["status", "and", "created_at"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(found, expected);
    }
}
