//! Data sources for datamask.
//!
//! A data source counts and streams the rows of a configured table and writes
//! masked rows back in batches. Stores are opened through a registry keyed by
//! the configured data source type.

pub mod adapter;
pub mod batch;
pub mod memory;
pub mod postgres;
pub mod registry;

pub use adapter::{DataSource, RowStream, StatementExecutor};
pub use batch::{UpdateSummary, update_rows};
pub use memory::MemoryStore;
pub use postgres::{PostgresFactory, PostgresStore};
pub use registry::{StoreFactory, StoreHandle, StoreRegistry};
