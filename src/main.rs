// USAGE  rosetta convert --template buoy.template.json --data buoy.csv
//        rosetta batch   --template buoy.template.json --pattern 'uploads/*.csv'
//        rosetta inspect --data buoy.csv --delimiter Comma --header 0

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use rayon::prelude::*;
use rosetta_convert::{
    parser::{parse_file, ParseOptions},
    pipeline::new_transaction_id,
    ConversionRequest, Converter, Delimiter, PreparedConversion, RosettaConfig,
};
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "rosetta")]
#[command(about = "Convert delimited ASCII data into CF-1.6 netCDF")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the download directory
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// More log output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Compact, warnings-only logging
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one data file
    Convert {
        /// Template describing the file
        #[arg(short, long)]
        template: PathBuf,

        /// Delimited data file
        #[arg(short, long)]
        data: PathBuf,

        /// Transaction id (generated when omitted)
        #[arg(long)]
        transaction_id: Option<String>,

        /// Skip the NcML output
        #[arg(long)]
        no_ncml: bool,
    },

    /// Convert every file matching a glob with the same template
    Batch {
        #[arg(short, long)]
        template: PathBuf,

        /// e.g. 'uploads/*.csv'
        #[arg(short, long)]
        pattern: String,
    },

    /// Parse a file and report its shape without converting
    Inspect {
        #[arg(short, long)]
        data: PathBuf,

        /// Delimiter name (Comma, Tab, Whitespace, ...) or symbol
        #[arg(long, default_value = "Comma")]
        delimiter: String,

        /// Header line numbers, 0-based
        #[arg(long = "header")]
        headers: Vec<usize>,
    },
}

// Files parsed concurrently per batch before writing them out.
const BATCH: usize = 16;

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rosetta_convert={level},rosetta={level}")));

    if quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn timeit<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let t0 = Instant::now();
    let out = f();
    info!(elapsed = ?t0.elapsed(), "{label}");
    out
}

fn load_config(cli: &Cli) -> Result<RosettaConfig> {
    let mut config = match &cli.config {
        Some(path) => RosettaConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => RosettaConfig::default(),
    };
    if let Some(dir) = &cli.output_dir {
        config.download_dir = dir.clone();
    }
    Ok(config)
}

fn list_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut v: Vec<_> = glob(pattern)?.filter_map(Result::ok).collect();
    v.sort();
    Ok(v)
}

fn run_batch(converter: &Converter, template: &Path, pattern: &str) -> Result<()> {
    let inputs = list_inputs(pattern)?;
    if inputs.is_empty() {
        bail!("no files match {pattern}");
    }
    let base_id = new_transaction_id();
    let total_batches = inputs.len().div_ceil(BATCH);
    let mut failed = 0usize;

    for (batch_no, chunk) in inputs.chunks(BATCH).enumerate() {
        info!(batch = batch_no + 1, of = total_batches, "parsing batch");

        // parse and plan in parallel, each file its own transaction
        let prepared: Vec<(PathBuf, Result<PreparedConversion>)> = chunk
            .par_iter()
            .enumerate()
            .map(|(off, path)| {
                let id = format!("{base_id}-{:04}", batch_no * BATCH + off);
                let result = ConversionRequest::from_template_file(path, template, Some(id))
                    .and_then(|req| converter.prepare(&req))
                    .map_err(anyhow::Error::from);
                (path.clone(), result)
            })
            .collect();

        // netCDF output is written one file at a time
        for (path, result) in prepared {
            match result.and_then(|p| converter.write(&p).map_err(anyhow::Error::from)) {
                Ok(out) => println!("{} → {}", path.display(), out.netcdf.display()),
                Err(e) => {
                    failed += 1;
                    warn!(file = %path.display(), error = %e, "conversion failed");
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} conversions failed", inputs.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let mut config = load_config(&cli)?;

    match &cli.command {
        Commands::Convert { template, data, transaction_id, no_ncml } => {
            if *no_ncml {
                config.write_ncml = false;
            }
            let converter = Converter::new(config);
            let req = ConversionRequest::from_template_file(data, template, transaction_id.clone())
                .with_context(|| format!("loading template {}", template.display()))?;
            let out = timeit("convert", || converter.convert(&req))
                .with_context(|| format!("converting {}", data.display()))?;

            println!("transaction {}", out.transaction_id);
            println!("  netCDF   {}", out.netcdf.display());
            if let Some(ncml) = &out.ncml {
                println!("  NcML     {}", ncml.display());
            }
            println!("  template {}", out.template.display());
            println!("  rows     {}", out.rows);
        }
        Commands::Batch { template, pattern } => {
            let converter = Converter::new(config);
            timeit("batch", || run_batch(&converter, template, pattern))?;
        }
        Commands::Inspect { data, delimiter, headers } => {
            let opts = ParseOptions::new(Delimiter::from_name(delimiter))
                .with_headers(headers.iter().copied());
            let table = parse_file(data, &opts)
                .with_context(|| format!("parsing {}", data.display()))?;
            println!("{}: {} rows × {} columns", data.display(), table.row_count(), table.column_count);
            if let Some(first) = table.rows.first() {
                println!("first data line {}: {:?}", first.line, first.tokens);
            }
        }
    }

    Ok(())
}
