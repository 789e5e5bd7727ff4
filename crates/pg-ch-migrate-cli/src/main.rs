//! pg-ch-migrate CLI - batch PostgreSQL to ClickHouse transfer.

mod logging;

use clap::{Parser, Subcommand};
use logging::{setup_logging, LogFormat};
use pg_ch_migrate::orchestrator::StoreHealth;
use pg_ch_migrate::{Config, MigrateError, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "pg-ch-migrate")]
#[command(about = "Batch PostgreSQL to ClickHouse transfer through CSV files")]
#[command(version)]
struct Cli {
    /// Path to JSON or YAML job file
    #[arg(short, long, default_value = "/config/config.json")]
    config: PathBuf,

    /// Directory for the per-run log file
    #[arg(long, default_value = "/tmp/logs")]
    log_dir: PathBuf,

    /// Log format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every job in the job file (default)
    Run,

    /// Test connections to the stores the configured mode uses
    HealthCheck,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = match setup_logging(&cli.verbosity, cli.log_format, &cli.log_dir) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            return ExitCode::from(1);
        }
    };
    info!("Logging to {}", log_file.display());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Stage failures are already reported by the pipeline.
            if e.is_config() {
                error!("{}", e.format_detailed());
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), MigrateError> {
    let config = Config::load(&cli.config)?;
    info!(
        "Loaded configuration from {} (mode: {})",
        cli.config.display(),
        config.migration_schema
    );

    // Process environment wins over .env entries.
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }
    let orchestrator = Orchestrator::from_env(config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let result = orchestrator.run().await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nMigration completed!");
                println!("  Run ID: {}", result.run_id);
                println!("  Mode: {}", result.mode);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Jobs: {}/{}", result.jobs_completed, result.jobs_total);
                println!("  Rows extracted: {}", result.rows_extracted);
                println!("  Rows loaded: {}", result.rows_loaded);
                for artifact in &result.artifacts {
                    println!("  File: {}", artifact.display());
                }
            }
        }

        Commands::HealthCheck => {
            let result = orchestrator.health_check().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results ({} mode):", result.mode);
                for health in [&result.source, &result.target].into_iter().flatten() {
                    print_store_health(health);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                let failed: Vec<&StoreHealth> = [&result.source, &result.target]
                    .into_iter()
                    .flatten()
                    .filter(|h| !h.connected)
                    .collect();
                let store = failed
                    .iter()
                    .map(|h| h.store.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let message = failed
                    .iter()
                    .filter_map(|h| h.error.as_deref())
                    .collect::<Vec<_>>()
                    .join("; ");
                error!("Health check failed for {}: {}", store, message);
                return Err(MigrateError::Connectivity {
                    store,
                    attempts: 1,
                    message,
                });
            }
        }
    }

    Ok(())
}

fn print_store_health(health: &StoreHealth) {
    println!(
        "  {}: {} ({}ms)",
        health.store,
        if health.connected { "OK" } else { "FAILED" },
        health.latency_ms
    );
    if let Some(ref err) = health.error {
        println!("    Error: {}", err);
    }
}
