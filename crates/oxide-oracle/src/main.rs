//! oxide-oracle CLI
//!
//! Plans and checks Oracle schema auto-updates against a captured catalog.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use oxide_oracle::prelude::*;

/// Oracle schema auto-update for oxide models.
#[derive(Parser)]
#[command(name = "oxide-oracle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model definitions (JSON array).
    #[arg(short, long, env = "ORACLE_MODELS")]
    models: PathBuf,

    /// Data source settings (JSON).
    #[arg(short, long, env = "ORACLE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Captured catalog snapshot (JSON). Without one, no table exists.
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the statements that would reconcile each model.
    Plan {
        /// Models to plan (all if not specified).
        models: Vec<String>,
    },

    /// Exit with status 1 if any model has pending changes.
    Check {
        /// Models to check (all if not specified).
        models: Vec<String>,
    },

    /// Print the statements creating a model's table.
    CreateSql {
        /// Model name.
        model: String,
    },

    /// Print the statements dropping a model's table.
    DropSql {
        /// Model name.
        model: String,
    },

    /// Print the statements adding missing foreign keys.
    FkSql {
        /// Models to inspect (all if not specified).
        models: Vec<String>,
    },
}

fn selection(models: &[String]) -> Option<&[String]> {
    if models.is_empty() {
        None
    } else {
        Some(models)
    }
}

fn print_statements(statements: &[String]) {
    for sql in statements {
        println!("{sql};");
        println!();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => OracleSettings::from_path(path)?,
        None => OracleSettings::default(),
    };

    // Setup logging
    let log_level = if cli.verbose || settings.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = ModelRegistry::from_path(&cli.models)?;
    let snapshot = match &cli.catalog {
        Some(path) => CatalogSnapshot::from_path(path)?,
        None => CatalogSnapshot::new(),
    };
    info!(
        models = registry.len(),
        tables = snapshot.tables.len(),
        connect_string = %settings.connect_string(),
        pool_max = settings.pool_max(),
        parallel_limit = settings.parallel_limit(),
        "Loaded definitions"
    );

    let connection = Arc::new(SnapshotConnection::new(snapshot));
    let migrator = Migrator::from_settings(connection, Arc::new(registry), &settings);

    match cli.command {
        Commands::Plan { models } => {
            let outcomes = migrator.reconcile(selection(&models), true).await;
            for result in into_results(outcomes)? {
                println!("-- {} ({})", result.model, result.action);
                print_statements(&result.statements);
            }
        }

        Commands::Check { models } => {
            if migrator.is_actual(selection(&models)).await? {
                info!("Schema is up to date.");
            } else {
                info!("Schema has pending changes.");
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::CreateSql { model } => {
            print_statements(&migrator.create_table_sql(&model)?);
        }

        Commands::DropSql { model } => {
            print_statements(&migrator.drop_table_sql(&model)?);
        }

        Commands::FkSql { models } => {
            let statements = migrator.foreign_key_sql(selection(&models)).await?;
            if statements.is_empty() {
                info!("No foreign keys to add.");
            }
            print_statements(&statements);
        }
    }

    Ok(ExitCode::SUCCESS)
}
