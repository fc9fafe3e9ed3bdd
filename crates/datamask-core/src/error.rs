use thiserror::Error;

/// Core error type shared across datamask crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Unsupported type hint, missing provider or malformed rule. Raised
    /// before a table is streamed.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Value generation or lookup failed for a specific row and column.
    #[error("provider error in table '{table}' at {row}, column '{column}': {message}")]
    Provider {
        table: String,
        row: String,
        column: String,
        message: String,
    },
    /// Connectivity, query or batch-write failure reported by the store.
    #[error("store error: {0}")]
    Store(String),
    /// The host cancelled the run between two batches.
    #[error("run cancelled")]
    Cancelled,
    /// Failure while processing a configured table.
    #[error("table '{table}': {source}")]
    Table {
        table: String,
        #[source]
        source: Box<Error>,
    },
    /// Failure while executing a configured statement.
    #[error("statement '{name}': {source}")]
    Statement {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the table being processed, unless the error already names one.
    pub fn in_table(self, table: &str) -> Self {
        match self {
            Error::Table { .. } | Error::Provider { .. } | Error::Cancelled => self,
            other => Error::Table {
                table: table.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Attach the statement being executed.
    pub fn in_statement(self, name: &str) -> Self {
        match self {
            Error::Statement { .. } | Error::Cancelled => self,
            other => Error::Statement {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Innermost error, skipping table/statement context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Table { source, .. } | Error::Statement { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.root(), Error::Configuration(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self.root(), Error::Provider { .. })
    }

    pub fn is_store(&self) -> bool {
        matches!(self.root(), Error::Store(_))
    }
}

/// Convenience alias for results returned by datamask crates.
pub type Result<T> = std::result::Result<T, Error>;
