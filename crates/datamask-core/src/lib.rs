//! Core contracts and helpers for datamask.
//!
//! This crate defines the configuration model, the dynamic row/value types,
//! the error taxonomy, and the validation helpers shared by the masking
//! engine, the store adapters and the CLI.

pub mod config;
pub mod error;
pub mod lookup;
pub mod redaction;
pub mod schema;
pub mod validation;
pub mod value;

pub use config::{
    ColumnConfig, Config, DEFAULT_LOCALE, DEFAULT_PRIMARY_KEY, DEFAULT_UPDATE_BATCH_SIZE,
    DataGenerationConfig, DataSourceConfig, LOOKUP_HINT, MaskStrategy, SqlStatementConfig,
    TableConfig,
};
pub use error::{Error, Result};
pub use lookup::LookupSource;
pub use redaction::{RedactedConnection, redact_connection_string, redact_data_source};
pub use schema::config_json_schema;
pub use validation::{
    IssueSeverity, ValidationIssue, ValidationReport, filter_identifiers, validate_config,
};
pub use value::{Row, Value};
