use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use aws_config::BehaviorVersion;
use bookshelf_core::catalog::Catalog;
use bookshelf_core::config::{CatalogConfig, ConfigError};
use bookshelf_core::store::dynamodb::{DynamoConfig, DynamoStore, MAX_TRANSACTION_ITEMS};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod executor;

use commands::Command;
use display::OutputMode;

/// Bookshelf: manage a book catalog stored in DynamoDB.
#[derive(Parser, Debug)]
#[command(name = "bookshelf", version)]
struct Cli {
    /// DynamoDB table holding the catalog.
    #[arg(long, env = "BOOKSHELF_TABLE", default_value = "Book", global = true)]
    table: String,

    /// AWS region (defaults to the SDK's region chain).
    #[arg(long, env = "BOOKSHELF_REGION", global = true)]
    region: Option<String>,

    /// Endpoint override, e.g. a local DynamoDB.
    #[arg(long, env = "BOOKSHELF_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// JSON catalog configuration file.
    #[arg(long, env = "BOOKSHELF_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output results as machine-parseable JSON.
    #[arg(short, long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Pretty
    };

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e);
            process::exit(1);
        }
    };

    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let store = DynamoStore::new(
        &sdk_config,
        DynamoConfig {
            table_name: cli.table,
            region: cli.region,
            endpoint: cli.endpoint,
        },
    );
    info!(table = store.table_name(), "using DynamoDB table");
    let catalog = Catalog::new(Arc::new(store), config);

    match executor::execute(&catalog, cli.command).await {
        Ok(result) => display::render(&result, &mode),
        Err(e) => {
            display::render_error(&e, &mode);
            process::exit(1);
        }
    }
}

/// Read the catalog configuration, clamping the transaction size to what
/// DynamoDB accepts.
fn load_config(path: Option<&PathBuf>) -> Result<CatalogConfig, ConfigError> {
    let mut config = match path {
        Some(path) => CatalogConfig::from_json_file(path)?,
        None => CatalogConfig::default(),
    };
    if config.max_transaction_items > MAX_TRANSACTION_ITEMS {
        warn!(
            configured = config.max_transaction_items,
            max = MAX_TRANSACTION_ITEMS,
            "maxTransactionItems exceeds the DynamoDB limit"
        );
        config.max_transaction_items = MAX_TRANSACTION_ITEMS;
    }
    Ok(config)
}
