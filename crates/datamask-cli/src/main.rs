mod config;
mod progress;
mod registry;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use datamask_core::{Error as CoreError, config_json_schema, validate_config};
use datamask_mask::faker_rs::{FakeRsAdapter, LocaleKey};
use datamask_mask::{MaskingEngine, default_providers};
use datamask_pipeline::{NoopProgress, Pipeline, ProgressSink};
use datamask_source::{MemoryStore, StoreRegistry};

use config::{ConfigError, Overrides, apply_overrides, load_config};
use progress::ConsoleProgress;
use registry::{RunContext, init_run_logging, start_run, write_report};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "datamask", version, about = "Mask sensitive columns in place")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mask every configured table, then run the configured statements.
    Run(RunArgs),
    /// Check a configuration file without connecting to the store.
    Validate(ValidateArgs),
    /// Print the JSON Schema for configuration files.
    Schema,
    /// List synthetic type hints and locales.
    Providers,
}

#[derive(Args, Debug, Serialize)]
struct RunArgs {
    /// Configuration file (.json or .toml).
    #[arg(short, long, value_name = "PATH")]
    config: PathBuf,
    /// Override data_source.dry_run.
    #[arg(long, value_name = "BOOL")]
    dry_run: Option<bool>,
    /// Override data_generation.locale.
    #[arg(long)]
    locale: Option<String>,
    /// Override data_source.update_batch_size.
    #[arg(long, value_name = "ROWS")]
    update_batch_size: Option<usize>,
    /// Override data_generation.seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Disable console progress and stderr logging.
    #[arg(long, default_value_t = false)]
    no_output: bool,
    /// Print the parsed options as JSON and exit.
    #[arg(long, default_value_t = false)]
    print_options: bool,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            dry_run: self.dry_run,
            locale: self.locale.clone(),
            update_batch_size: self.update_batch_size,
            seed: self.seed,
        }
    }
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Configuration file (.json or .toml).
    #[arg(short, long, value_name = "PATH")]
    config: PathBuf,
    /// Override data_generation.locale.
    #[arg(long)]
    locale: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_masking(args).await,
        Command::Validate(args) => run_validate(args),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&config_json_schema())?);
            Ok(())
        }
        Command::Providers => {
            for id in FakeRsAdapter::list_ids() {
                println!("{id}");
            }
            let locales: Vec<_> = LocaleKey::ALL.iter().map(|key| key.as_str()).collect();
            println!("locales: {}", locales.join(", "));
            Ok(())
        }
    }
}

async fn run_masking(args: RunArgs) -> Result<(), CliError> {
    if args.print_options {
        println!("{}", serde_json::to_string_pretty(&args)?);
        return Ok(());
    }

    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides());

    let run_ctx = RunContext {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        run_dir: args.run_dir.clone(),
        config_path: args.config.clone(),
        config: config.clone(),
    };
    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path, !args.no_output)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_ctx.run_id,
        config = %args.config.display(),
        dry_run = config.data_source.dry_run
    );

    let store = StoreRegistry::with_defaults()
        .connect(&config.data_source)
        .await?;

    let console = (!args.no_output).then(|| Arc::new(ConsoleProgress::new()));
    let sink: Arc<dyn ProgressSink> = match &console {
        Some(console) => console.clone(),
        None => Arc::new(NoopProgress),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(
                event = "interrupt",
                "interrupt received, stopping after the current batch"
            );
            on_interrupt.cancel();
        }
    });

    let pipeline = Pipeline::with_default_providers(config, store, sink).with_cancellation(cancel);
    let result = pipeline.run().await;
    if let Some(console) = &console {
        console.finish();
    }

    match result {
        Ok(report) => {
            write_report(&run_paths, &report)?;
            tracing::info!(
                event = "run_finished",
                status = "success",
                rows = report.rows_masked(),
                duration_ms = report.duration_ms,
                report = %run_paths.report_path.display()
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(event = "run_finished", status = "failed", error = %err);
            Err(err.into())
        }
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;
    apply_overrides(
        &mut config,
        &Overrides {
            locale: args.locale,
            ..Overrides::default()
        },
    );

    let warnings = validate_config(&config).into_result()?;
    for warning in &warnings {
        println!("warning {}: {} ({})", warning.path, warning.message, warning.code);
    }

    let engine = MaskingEngine::new(
        default_providers(Arc::new(MemoryStore::new())),
        &config.data_generation,
    );
    for table in &config.tables {
        engine
            .validate_table(table)
            .map_err(|err| err.in_table(&table.qualified_name()))?;
    }

    println!(
        "configuration ok: {} tables, {} statements",
        config.tables.len(),
        config.sql_statements.len()
    );
    Ok(())
}
