use clap::Parser;
use mysqlite::storage::Table;
use mysqlite::Error;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "mysqlite", version = VERSION, about = "Tiny B+tree-backed SQL database.")]
struct Cli {
    /// Path to the database file. Created if it doesn't exist.
    db_path: PathBuf,

    /// Override the tracing filter (defaults to RUST_LOG, then "info").
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("mysqlite.log")
        .expect("failed to open log file");

    let filter = cli
        .log_level
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    let mut table = match Table::open(&cli.db_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error opening {}: {}", cli.db_path.display(), e);
            std::process::exit(1);
        }
    };

    let result = mysqlite::repl::main(&mut table);
    if let Err(e) = table.close() {
        eprintln!("Error closing database: {}", e);
    }

    match result {
        Ok(()) => (),
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::Interrupted => (),
        Err(e) => eprintln!("\nError: {}", e),
    }
}
