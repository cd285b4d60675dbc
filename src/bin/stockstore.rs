//! Stockstore CLI, a thin shell for local bootstrap and inspection.
//!
//! Usage:
//!   stockstore init [--db path]
//!   stockstore get <id> [--db path]
//!   stockstore list-strains [--limit N] [--cursor MS] [--db path]
//!   stockstore list-plasmids [--limit N] [--cursor MS] [--db path]
//!   stockstore remove <id> [--db path]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockstore::{ListParams, StockId, StockRepository};

#[derive(Parser)]
#[command(
    name = "stockstore",
    version,
    about = "Graph-backed repository for biological stock records"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to the database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the schema (idempotent; safe to re-run)
    Init,
    /// Fetch one stock by id, trying both kinds
    Get {
        /// Stock identifier (DBS0… or DBP0…)
        id: String,
    },
    /// List strains, newest first
    ListStrains {
        /// Page size
        #[arg(long, default_value_t = stockstore::DEFAULT_PAGE_SIZE)]
        limit: i64,
        /// Millisecond cursor from a previous page
        #[arg(long)]
        cursor: Option<i64>,
    },
    /// List plasmids, newest first
    ListPlasmids {
        #[arg(long, default_value_t = stockstore::DEFAULT_PAGE_SIZE)]
        limit: i64,
        #[arg(long)]
        cursor: Option<i64>,
    },
    /// Delete a stock record and its edges
    Remove {
        id: String,
    },
}

/// Get the default database path (~/.local/share/stockstore/stockstore.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let dir = data_dir.join("stockstore");
    std::fs::create_dir_all(&dir).ok();
    dir.join("stockstore.db")
}

fn open_repository(db: Option<PathBuf>) -> Result<StockRepository, String> {
    let path = db.unwrap_or_else(default_db_path);
    StockRepository::open(&path).map_err(|e| format!("failed to open database: {e}"))
}

fn cmd_get(repo: &StockRepository, id: &str) -> i32 {
    let stock_id = StockId::new(id);
    let record = match repo.get_strain(&stock_id) {
        Ok(Some(record)) => Some(record),
        Ok(None) => match repo.get_plasmid(&stock_id) {
            Ok(record) => record,
            Err(e) => {
                eprintln!("Error: {e}");
                return 1;
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    match record {
        Some(record) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&record).unwrap_or_default()
            );
            0
        }
        None => {
            eprintln!("Error: stock '{id}' not found");
            1
        }
    }
}

fn print_page(page: stockstore::ListPage) -> i32 {
    for record in &page.records {
        println!(
            "{}",
            serde_json::to_string(record).unwrap_or_default()
        );
    }
    if let Some(cursor) = page.next_cursor {
        eprintln!("next cursor: {cursor}");
    }
    0
}

fn cmd_list_strains(repo: &StockRepository, limit: i64, cursor: Option<i64>) -> i32 {
    let mut params = ListParams::new(limit);
    if let Some(cursor) = cursor {
        params = params.with_cursor(cursor);
    }
    match repo.list_strains(&params) {
        Ok(page) => print_page(page),
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn cmd_list_plasmids(repo: &StockRepository, limit: i64, cursor: Option<i64>) -> i32 {
    let mut params = ListParams::new(limit);
    if let Some(cursor) = cursor {
        params = params.with_cursor(cursor);
    }
    match repo.list_plasmids(&params) {
        Ok(page) => print_page(page),
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn cmd_remove(repo: &StockRepository, id: &str) -> i32 {
    match repo.remove_stock(&StockId::new(id)) {
        Ok(()) => {
            println!("Removed {id}");
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let repo = match open_repository(cli.db) {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Init => {
            // Opening already ran the idempotent bootstrap
            println!("schema ready");
            0
        }
        Commands::Get { id } => cmd_get(&repo, &id),
        Commands::ListStrains { limit, cursor } => cmd_list_strains(&repo, limit, cursor),
        Commands::ListPlasmids { limit, cursor } => cmd_list_plasmids(&repo, limit, cursor),
        Commands::Remove { id } => cmd_remove(&repo, &id),
    };
    std::process::exit(code);
}
