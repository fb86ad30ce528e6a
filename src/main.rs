//! txn-runner - Main entry point.
//!
//! Runs the given SQL statements against a database inside a single
//! transaction and prints what was committed.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use txn_runner::config::Config;
use txn_runner::{DbError, DbPool, DbResult, Script, ScriptReport, execute_script};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so the report on stdout stays machine-readable
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    info!("Starting txn-runner v{}", env!("CARGO_PKG_VERSION"));

    match run(&config).await {
        Ok(report) => match print_report(&report, config.json) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: failed to render report: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(error = %e, "Transaction failed");
            eprintln!("Error: {e}");
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {suggestion}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> DbResult<ScriptReport> {
    let conn_config = config.connection_config()?;

    let mut script = Script::from_statements(config.statements.iter().cloned());
    if let Some(path) = &config.file {
        script.append_file(path).await?;
    }
    if script.is_empty() {
        return Err(DbError::invalid_input(
            "Nothing to run: pass --execute <SQL> or --file <PATH>",
        ));
    }

    let pool = DbPool::connect(&conn_config).await?;
    info!(
        db_type = %pool.db_type(),
        statements = script.len(),
        "Running script in a transaction"
    );

    let result = execute_script(&pool, &script).await;
    pool.close().await;
    result
}

fn print_report(report: &ScriptReport, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for (i, statement) in report.statements.iter().enumerate() {
        println!(
            "statement {}: {} row(s) affected",
            i + 1,
            statement.rows_affected
        );
    }
    println!(
        "committed {} statement(s), {} row(s) affected",
        report.statements.len(),
        report.total_rows_affected
    );
    Ok(())
}
