//! Exchange import CLI
//!
//! Reads one exchange export, detects its format and writes the normalized
//! transactions as CSV to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- ledgers.csv > transactions.csv
//! cargo run -- export.csv --errors rejected.csv
//! cargo run -- --list-formats
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug`, `info` or `warn` to control logging verbosity

use clap::Parser;
use exchange_import::{
    write_errors, write_transactions, ImportConfig, ImportError, Importer, Result,
};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process;

/// Normalize a cryptocurrency exchange export into canonical transactions.
#[derive(Debug, Parser)]
#[command(name = "exchange-import", version, about)]
struct Cli {
    /// Exchange export to import.
    #[arg(required_unless_present = "list_formats")]
    file: Option<PathBuf>,

    /// Force the column delimiter instead of detecting it.
    #[arg(long)]
    delimiter: Option<char>,

    /// Reject quantities or volumes above this magnitude.
    #[arg(long)]
    max_volume: Option<Decimal>,

    /// Fractional digits of computed unit prices.
    #[arg(long)]
    price_scale: Option<u32>,

    /// Write rejected rows to this CSV file.
    #[arg(long)]
    errors: Option<PathBuf>,

    /// Print the registered formats and exit.
    #[arg(long)]
    list_formats: bool,
}

impl Cli {
    fn config(&self) -> Result<ImportConfig> {
        let mut config = ImportConfig::default();
        if let Some(c) = self.delimiter {
            if !c.is_ascii() {
                return Err(ImportError::InvalidArgument(format!(
                    "delimiter '{}' is not a single-byte character",
                    c
                )));
            }
            config.delimiter = Some(c as u8);
        }
        if let Some(max) = self.max_volume {
            if max <= Decimal::ZERO {
                return Err(ImportError::InvalidArgument(format!(
                    "max volume must be positive, got {}",
                    max
                )));
            }
            config.max_volume = max;
        }
        if let Some(scale) = self.price_scale {
            if scale > 28 {
                return Err(ImportError::InvalidArgument(format!(
                    "price scale must be at most 28, got {}",
                    scale
                )));
            }
            config.price_scale = scale;
        }
        Ok(config)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let importer = Importer::new(cli.config()?)?;

    if cli.list_formats {
        for format in importer.registry().formats() {
            println!("{}\t{}", format.id, format.name);
        }
        return Ok(());
    }

    let path = cli
        .file
        .as_ref()
        .ok_or_else(|| ImportError::InvalidArgument("no input file given".to_string()))?;
    let result = importer.parse_file(path)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    write_transactions(&result.clusters, handle)?;

    if let Some(errors_path) = &cli.errors {
        let file = File::create(errors_path)?;
        write_errors(&result.errors, BufWriter::new(file))?;
    }

    let stats = result.statistic();
    eprintln!(
        "{}: {} clusters, {} failed rows, {} ignored rows, {} failed fees, {} ignored fees",
        result.format,
        stats.cluster_count,
        stats.failed_row_count,
        stats.ignored_row_count,
        stats.failed_fee_transaction_count,
        stats.ignored_fee_transaction_count
    );
    Ok(())
}
