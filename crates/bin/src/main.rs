//! steelwatch CLI binary.
//!
//! Refreshes the published dashboard snapshot and summarizes it.

mod integration;

use clap::{Parser, Subcommand};
use integration::logging::{self, ProgressWriter};
use integration::pipeline::{RefreshOptions, run_refresh, run_summary};
use integration::settings::StoreArgs;
use std::path::PathBuf;
use std::process;
use steelwatch::output::ReportFormat;
use steelwatch_data::InstrumentSource;

#[derive(Parser)]
#[command(name = "steelwatch")]
#[command(about = "Steel-sector returns and fundamentals, published as a dashboard snapshot", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    /// Defaults to `refresh`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the snapshot and publish it
    Refresh {
        /// Instrument table (path or URL); defaults to the published snapshot
        #[arg(long)]
        instruments: Option<InstrumentSource>,

        /// Also write the snapshot to this file (.csv or .json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Build the snapshot without publishing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the dashboard summary of a snapshot
    Summary {
        /// Snapshot to read (path or URL); defaults to the published snapshot
        #[arg(long)]
        source: Option<InstrumentSource>,

        /// Output format (text, markdown or json)
        #[arg(long, default_value = "text")]
        format: ReportFormat,
    },
}

#[tokio::main]
async fn main() {
    let logs = ProgressWriter::default();
    logging::init(logs.clone());

    if let Err(e) = run(&logs).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(logs: &ProgressWriter) -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        None => run_refresh(RefreshOptions::default(), &cli.store, logs).await?,
        Some(Commands::Refresh {
            instruments,
            output,
            dry_run,
        }) => {
            let options = RefreshOptions {
                instruments,
                output,
                dry_run,
            };
            run_refresh(options, &cli.store, logs).await?;
        }
        Some(Commands::Summary { source, format }) => {
            run_summary(source, format, &cli.store).await?;
        }
    }

    Ok(())
}
