use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use datamask_core::{DataSourceConfig, Error, Result, Row, TableConfig};

use crate::adapter::DataSource;

/// Outcome of one `update_rows` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Rows consumed from the masked stream and grouped into batches.
    pub rows: u64,
    pub batches: u64,
    /// Rows the store reported as updated; always zero in dry-run mode.
    pub written: u64,
}

/// Consume `rows` in order, grouping them into batches and writing each batch
/// through `source`.
///
/// Batch size and dry-run come from `settings`, not from the settings the
/// store was opened with.
///
/// `on_progress` receives the cumulative number of rows handled after every
/// batch. In dry-run mode batches are formed and progress is reported but
/// nothing is written. Cancellation is honoured between batches; a failing
/// batch aborts the remaining ones while earlier batches stay committed.
pub async fn update_rows<S, F>(
    source: &dyn DataSource,
    settings: &DataSourceConfig,
    table: &TableConfig,
    rows: S,
    expected: u64,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<UpdateSummary>
where
    S: Stream<Item = Result<Row>> + Send,
    F: FnMut(u64) + Send,
{
    let batch_size = table.effective_batch_size(settings.update_batch_size);
    let dry_run = settings.dry_run;
    let table_name = table.qualified_name();

    let mut summary = UpdateSummary::default();
    let mut batch = Vec::with_capacity(batch_size);
    let mut rows = std::pin::pin!(rows);

    while let Some(row) = rows.next().await {
        batch.push(row?);
        if batch.len() >= batch_size {
            flush(source, table, &mut batch, dry_run, cancel, &mut summary).await?;
            on_progress(summary.rows);
        }
    }
    if !batch.is_empty() {
        flush(source, table, &mut batch, dry_run, cancel, &mut summary).await?;
        on_progress(summary.rows);
    }

    if summary.rows != expected {
        warn!(
            event = "row_count_mismatch",
            table = %table_name,
            expected,
            actual = summary.rows,
            "streamed row count differs from the initial count"
        );
    }
    info!(
        event = "table_written",
        table = %table_name,
        rows = summary.rows,
        batches = summary.batches,
        written = summary.written,
        dry_run,
        "table update finished"
    );

    Ok(summary)
}

async fn flush(
    source: &dyn DataSource,
    table: &TableConfig,
    batch: &mut Vec<Row>,
    dry_run: bool,
    cancel: &CancellationToken,
    summary: &mut UpdateSummary,
) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let size = batch.len() as u64;
    if dry_run {
        debug!(
            table = %table.qualified_name(),
            rows = size,
            "dry run: batch not written"
        );
    } else {
        summary.written += source.write_batch(table, batch).await?;
        debug!(table = %table.qualified_name(), rows = size, "batch written");
    }

    summary.rows += size;
    summary.batches += 1;
    batch.clear();
    Ok(())
}
