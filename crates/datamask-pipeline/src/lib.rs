//! Pipeline driver for datamask.
//!
//! Per table: count, stream, mask, batch-write. Then every configured raw
//! statement is executed. Progress is reported on three channels.

pub mod driver;
pub mod progress;
pub mod report;

pub use driver::Pipeline;
pub use progress::{NoopProgress, ProgressChannel, ProgressSink, ProgressState, ProgressTracker};
pub use report::{RunReport, StatementReport, TableReport};
