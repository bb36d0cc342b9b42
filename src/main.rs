use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use blockfi_import::abi::odos::{CPT_ODOS_V1, SWAPPED_EVENT_ABI};
use blockfi_import::{
    import_csv, setup_database, verify_counts, BlockFiTradesImporter, BlockFiTransactionsImporter,
    CsvImporter, EventAbi, EventSink, ImportConfig, ImportSummary, MemorySink, MessageAggregator,
    SqliteSink,
};

const USAGE: &str = "\
Usage:
  blockfi-import transactions <csv> [--db <path>] [--format <fmt>] [--config <json>]
  blockfi-import trades <csv> [--db <path>] [--format <fmt>] [--config <json>]
  blockfi-import abi";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("transactions") => {
            let (csv_path, config) = parse_import_args(&args[1..])?;
            let importer = BlockFiTransactionsImporter::from_config(&config);
            run_import(&importer, &csv_path, &config)
        }
        Some("trades") => {
            let (csv_path, config) = parse_import_args(&args[1..])?;
            let importer = BlockFiTradesImporter::from_config(&config);
            run_import(&importer, &csv_path, &config)
        }
        Some("abi") => {
            let abi = EventAbi::parse(SWAPPED_EVENT_ABI).context("Bundled Odos ABI is invalid")?;
            println!("{} {}", CPT_ODOS_V1, abi.signature());
            Ok(())
        }
        _ => bail!("{}", USAGE),
    }
}

/// `<csv> [--db <path>] [--format <fmt>] [--config <json>]`
///
/// Flags override values from the config file.
fn parse_import_args(args: &[String]) -> Result<(PathBuf, ImportConfig)> {
    let mut csv_path = None;
    let mut config_path = None;
    let mut db = None;
    let mut format = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--db" => db = Some(PathBuf::from(flag_value(&mut iter, "--db")?)),
            "--format" => format = Some(flag_value(&mut iter, "--format")?.to_string()),
            "--config" => config_path = Some(PathBuf::from(flag_value(&mut iter, "--config")?)),
            other if other.starts_with("--") => bail!("Unknown flag {}\n{}", other, USAGE),
            other if csv_path.is_none() => csv_path = Some(PathBuf::from(other)),
            other => bail!("Unexpected argument {}\n{}", other, USAGE),
        }
    }

    let csv_path = csv_path.with_context(|| format!("Missing CSV path\n{}", USAGE))?;

    let mut config = match config_path {
        Some(path) => ImportConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ImportConfig::default(),
    };
    if let Some(db) = db {
        config.database = Some(db);
    }
    if let Some(format) = format {
        config.timestamp_format = format;
    }
    config.validate()?;

    Ok((csv_path, config))
}

fn flag_value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .with_context(|| format!("{} needs a value", flag))
}

fn run_import(importer: &dyn CsvImporter, csv_path: &Path, config: &ImportConfig) -> Result<()> {
    let mut msgs = MessageAggregator::new();

    let summary = match &config.database {
        Some(db_path) => {
            let mut conn = Connection::open(db_path)
                .with_context(|| format!("Failed to open database {}", db_path.display()))?;
            setup_database(&conn)?;

            // One write transaction per file; dropped (rolled back) on a fatal error
            let tx = conn.transaction()?;
            let summary = {
                let mut sink = SqliteSink::new(&tx);
                import_file(importer, &mut sink, csv_path, &mut msgs)?
            };
            tx.commit()?;

            let (movements, events, trades) = verify_counts(&conn)?;
            info!(movements, events, trades, "database totals");
            summary
        }
        None => {
            let mut sink = MemorySink::new();
            let summary = import_file(importer, &mut sink, csv_path, &mut msgs)?;
            info!(records = sink.total(), "dry run, nothing written");
            summary
        }
    };

    print_summary(&summary);
    for warning in msgs.consume_warnings() {
        println!("  ! {}", warning);
    }

    Ok(())
}

fn import_file(
    importer: &dyn CsvImporter,
    sink: &mut dyn EventSink,
    csv_path: &Path,
    msgs: &mut MessageAggregator,
) -> Result<ImportSummary> {
    import_csv(importer, sink, csv_path, msgs)
        .with_context(|| format!("Failed to import {}", csv_path.display()))
}

fn print_summary(summary: &ImportSummary) {
    println!("Rows read:         {}", summary.rows);
    println!("Asset movements:   {}", summary.movements);
    println!("History events:    {}", summary.events);
    println!("Trades:            {}", summary.trades);
    println!("Already imported:  {}", summary.duplicates);
    println!("Unconfirmed:       {}", summary.unconfirmed);
    println!("Ignored:           {}", summary.ignored);
    println!("Warnings:          {}", summary.warnings);
}
