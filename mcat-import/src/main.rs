//! mcat-import - Import books into the media catalog from a CSV file
//!
//! Reads ISBN values from a CSV, fetches book data from OpenLibrary
//! (cached on disk between runs), and stages everything into the
//! catalog database inside one transaction. Without `--commit` the run
//! is a dry run and rolls back at the end.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use mcat_import::csv_source::CsvSource;
use mcat_import::services::{
    DisabledLookupCache, FsLookupCache, ImportDriver, LookupCache, OpenLibraryClient,
};

/// Import books into the media catalog from a CSV file
#[derive(Parser, Debug)]
#[clap(name = "mcat-import")]
#[clap(about = "Import books into the media catalog from a CSV file")]
struct Args {
    /// CSV filename to use as input (must contain an ISBN column)
    fname: PathBuf,

    /// Cache directory for OpenLibrary responses
    #[clap(short = 'c', long, default_value = "./cache")]
    cache_dir: PathBuf,

    /// Do not read or write lookup cache files
    #[clap(short = 'd', long)]
    disable_cache: bool,

    /// Catalog database path
    #[clap(long, env = "MCAT_DATABASE", default_value = "./mcat.db")]
    database: PathBuf,

    /// Commit database work (default: dry run, everything rolls back)
    #[clap(short = 'C', long)]
    commit: bool,

    /// Increase verbosity (-v: debug, -vv: trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!(
        "mcat-import v{} starting at {}",
        env!("CARGO_PKG_VERSION"),
        chrono::Local::now().format("%b-%d-%Y %H:%M:%S")
    );

    // Validates the header before anything touches the network or the
    // database; a missing ISBN column exits non-zero here
    let source = CsvSource::open(&args.fname)?;

    let pool = mcat_common::db::init_database(&args.database).await?;

    let cache: Box<dyn LookupCache> = if args.disable_cache {
        info!("Lookup cache disabled for this run");
        Box::new(DisabledLookupCache)
    } else {
        Box::new(FsLookupCache::new(&args.cache_dir)?)
    };

    let client = OpenLibraryClient::new()?;

    let driver = ImportDriver::new(&pool, &client, cache.as_ref(), args.commit);
    let outcome = driver.run(source.rows()).await?;

    info!(
        "Successfully processed {} / {} rows ({})",
        outcome.imported,
        outcome.total_rows,
        if outcome.committed { "committed" } else { "dry run, rolled back" }
    );

    Ok(())
}
