//! Storefront Sync - seed, upsert and export storefront tables
//!
//! Every command opens its own connection to the SQLite store and closes it
//! before exiting.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storefront_sync::{
    export_table, load_rows, prepare_store, read_table, upsert, ConnectionProvider, ProductCatalog,
    StoreConfig, SyncError,
};

/// Storefront catalog sync - seeds, upserts and exports storefront tables
#[derive(Parser, Debug)]
#[command(name = "storefront_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, global = true, default_value_t = default_db_path())]
    database: String,

    /// Fail if the database file does not exist instead of creating it
    #[arg(long, global = true, default_value_t = false)]
    no_create: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the storefront tables
    Init {
        /// Drop and recreate all tables (deletes every row)
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
    /// Write the generated product catalog to a JSON file
    Generate {
        #[arg(short, long, default_value = "products.json")]
        output: PathBuf,
    },
    /// Generate the product catalog and upsert it into `products`
    Seed,
    /// Upsert rows from a JSON file (array of objects) into a table
    Upsert { table: String, file: PathBuf },
    /// Export a table to <table>.json
    Export {
        table: String,
        /// Directory to write the export into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the rows of a table as JSON
    Show { table: String },
}

/// Returns the default database path: ~/.local/share/storefront_sync/storefront.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storefront_sync")
        .join("storefront.db")
        .to_string_lossy()
        .to_string()
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::debug!("Database path: {}", db_path.display());

    // Ensure parent directory exists
    if !args.no_create {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    log::error!("Failed to create database directory: {}", e);
                    std::process::exit(1);
                }
                log::info!("Created directory: {}", parent.display());
            }
        }
    }

    let mut config = StoreConfig::new(&db_path);
    if args.no_create {
        config = config.existing_only();
    }
    let provider = ConnectionProvider::new(config);

    if let Err(e) = run(&provider, args.command) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(provider: &ConnectionProvider, command: Command) -> Result<(), SyncError> {
    match command {
        Command::Init { reset } => prepare_store(provider, reset)?,
        Command::Generate { output } => {
            let catalog = ProductCatalog::generate();
            catalog.write_json(&output)?;
        }
        Command::Seed => {
            let catalog = ProductCatalog::generate();
            let rows = catalog.to_rows()?;
            let count = upsert(provider, "products", &rows)?;
            log::info!("Seeded {} products", count);
        }
        Command::Upsert { table, file } => {
            let rows = load_rows(&file)?;
            let count = upsert(provider, &table, &rows)?;
            log::info!("Upserted {} rows into {} from {}", count, table, file.display());
        }
        Command::Export { table, out_dir } => {
            let report = export_table(provider, &table, &out_dir)?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Show { table } => {
            let rows = read_table(provider, &table)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
