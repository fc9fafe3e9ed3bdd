use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use datamask_core::{Config, Error, Result, SqlStatementConfig, TableConfig, validate_config};
use datamask_mask::{MaskingEngine, default_providers};
use datamask_source::{StoreHandle, update_rows};

use crate::progress::{ProgressChannel, ProgressSink, ProgressTracker};
use crate::report::{RunReport, StatementReport, TableReport};

/// Runs the row-level phase over every configured table, then the statement
/// phase, one unit of work at a time.
pub struct Pipeline {
    config: Config,
    store: StoreHandle,
    engine: MaskingEngine,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        config: Config,
        store: StoreHandle,
        engine: MaskingEngine,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            progress,
            cancel: CancellationToken::new(),
        }
    }

    /// Pipeline with the synthetic and lookup providers, the lookup provider
    /// reading from `store`.
    pub fn with_default_providers(
        config: Config,
        store: StoreHandle,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        let engine = MaskingEngine::new(
            default_providers(Arc::clone(&store.lookup)),
            &config.data_generation,
        );
        Self::new(config, store, engine, progress)
    }

    /// Token checked between batches and between units of work.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn engine(&self) -> &MaskingEngine {
        &self.engine
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let dry_run = self.config.data_source.dry_run;
        let mut report = RunReport::new(dry_run, self.engine.seed());

        self.preflight()?;

        let tracker = ProgressTracker::new(self.progress.as_ref());
        let units = (self.config.tables.len() + self.config.sql_statements.len()) as u64;
        tracker.reset(ProgressChannel::Overall, Some(units), "Overall Progress");
        info!(
            event = "run_start",
            store = self.store.data_source.engine(),
            tables = self.config.tables.len(),
            statements = self.config.sql_statements.len(),
            dry_run,
            seed = self.engine.seed(),
            "masking run started"
        );

        let mut done = 0;
        for table in &self.config.tables {
            let name = table.qualified_name();
            self.ensure_not_cancelled()?;
            tracker.relabel(ProgressChannel::Overall, &name);

            let table_report = self.mask_table(table, &tracker).await.map_err(|err| {
                let err = err.in_table(&name);
                error!(event = "table_failed", table = %name, error = %err, "table failed");
                err
            })?;
            report.tables.push(table_report);

            done += 1;
            tracker.advance_to(ProgressChannel::Overall, done);
        }

        for statement in &self.config.sql_statements {
            self.ensure_not_cancelled()?;
            tracker.relabel(ProgressChannel::Overall, &statement.name);

            let statement_report = self
                .execute_statement(statement, dry_run)
                .await
                .map_err(|err| {
                    let err = err.in_statement(&statement.name);
                    error!(
                        event = "statement_failed",
                        statement = %statement.name,
                        error = %err,
                        "statement failed"
                    );
                    err
                })?;
            report.statements.push(statement_report);

            done += 1;
            tracker.advance_to(ProgressChannel::Overall, done);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            event = "run_complete",
            rows = report.rows_masked(),
            duration_ms = report.duration_ms,
            "masking run finished"
        );
        Ok(report)
    }

    /// Reject configuration problems before any row is read.
    fn preflight(&self) -> Result<()> {
        let warnings = validate_config(&self.config).into_result()?;
        for issue in warnings {
            warn!(
                event = "config_warning",
                code = %issue.code,
                path = %issue.path,
                "{}",
                issue.message
            );
        }

        for table in &self.config.tables {
            self.engine
                .validate_table(table)
                .map_err(|err| err.in_table(&table.qualified_name()))?;
        }
        Ok(())
    }

    async fn mask_table(
        &self,
        table: &TableConfig,
        tracker: &ProgressTracker<'_>,
    ) -> Result<TableReport> {
        let started = Instant::now();
        let name = table.qualified_name();
        let source = self.store.data_source.as_ref();
        let mut masker = self.engine.prepare(table)?;

        let expected = source.count(table).await?;
        tracker.reset(ProgressChannel::Masking, Some(expected), "Masking Progress");
        tracker.reset(ProgressChannel::Updating, Some(expected), "Update Progress");
        info!(event = "table_start", table = %name, expected, "masking table");

        let rows = source.rows(table).await?;
        let masked = stream::try_unfold((rows, &mut masker), move |(mut rows, masker)| async move {
            match rows.next().await {
                Some(row) => {
                    let row = masker.mask(row?).await?;
                    tracker.advance_to(ProgressChannel::Masking, masker.rows_masked());
                    Ok::<_, Error>(Some((row, (rows, masker))))
                }
                None => Ok(None),
            }
        });

        let summary = update_rows(
            source,
            &self.config.data_source,
            table,
            masked,
            expected,
            &self.cancel,
            |handled| tracker.advance_to(ProgressChannel::Updating, handled),
        )
        .await?;

        Ok(TableReport {
            table: name,
            expected_rows: expected,
            masked_rows: masker.rows_masked(),
            written_rows: summary.written,
            batches: summary.batches,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn execute_statement(
        &self,
        statement: &SqlStatementConfig,
        dry_run: bool,
    ) -> Result<StatementReport> {
        let started = Instant::now();
        if dry_run {
            info!(
                event = "statement_skipped",
                statement = %statement.name,
                "dry run: statement not executed"
            );
            return Ok(StatementReport {
                name: statement.name.clone(),
                rows_affected: None,
                duration_ms: 0,
            });
        }

        info!(event = "statement_start", statement = %statement.name, "executing statement");
        let affected = self.store.statements.execute(statement).await?;
        info!(
            event = "statement_complete",
            statement = %statement.name,
            rows_affected = affected,
            "statement executed"
        );

        Ok(StatementReport {
            name: statement.name.clone(),
            rows_affected: Some(affected),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
