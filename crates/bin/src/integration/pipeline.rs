//! Command runners.

use super::logging::ProgressWriter;
use super::settings::StoreArgs;
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use steelwatch::output::{
    DashboardSummary, ExportFormat, Exporter, GitHubStore, Report, ReportFormat, Snapshot,
    SnapshotPublisher,
};
use steelwatch::{build_snapshot, refresh_snapshot};
use steelwatch_data::yahoo::{YahooFundamentalsProvider, YahooQuoteProvider};
use steelwatch_data::{InstrumentSource, InstrumentTable};
use steelwatch_metrics::{Horizon, LookbackWindow, MetricsBuilder};

/// Options of the `refresh` command.
#[derive(Debug, Clone, Default)]
pub(crate) struct RefreshOptions {
    pub(crate) instruments: Option<InstrumentSource>,
    pub(crate) output: Option<PathBuf>,
    pub(crate) dry_run: bool,
}

fn progress_bar(len: usize) -> Result<ProgressBar, Box<dyn Error>> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Load instruments, build every row and publish the snapshot.
pub(crate) async fn run_refresh(
    options: RefreshOptions,
    store_args: &StoreArgs,
    logs: &ProgressWriter,
) -> Result<(), Box<dyn Error>> {
    // Configuration problems abort before any network call
    let source = store_args.source_or_published(options.instruments)?;
    let publisher = if options.dry_run {
        None
    } else {
        let store = GitHubStore::new(store_args.store_config()?)?;
        Some(SnapshotPublisher::new(store, store_args.publisher_config()))
    };

    let table = InstrumentTable::load(&source).await?;
    let builder = MetricsBuilder::new(YahooQuoteProvider::new()?, YahooFundamentalsProvider::new()?);
    let window = LookbackWindow::ending_now();

    let pb = progress_bar(table.len())?;
    logs.attach(&pb);
    let on_row = |_: usize, row: &steelwatch_metrics::MetricsRow| {
        pb.set_message(row.symbol.clone());
        pb.inc(1);
    };

    let result = match &publisher {
        Some(publisher) => {
            refresh_snapshot(&builder, publisher, table.instruments(), &window, on_row)
                .await
                .map(|report| (report.snapshot, Some(report.outcome)))
        }
        None => Ok((
            build_snapshot(&builder, table.instruments(), &window, on_row).await,
            None,
        )),
    };
    pb.finish_and_clear();
    logs.detach();
    let (snapshot, outcome) = result?;

    if let Some(path) = &options.output {
        snapshot.export_to_file(path, ExportFormat::from_path(path)?)?;
        println!("Wrote {} rows to {}", snapshot.len(), path.display());
    }

    print_overview(&snapshot);

    match outcome {
        Some(outcome) => {
            let verb = if outcome.created { "Created" } else { "Updated" };
            let path = publisher.as_ref().map_or("", |p| p.path());
            println!(
                "{} {} at revision {} ({} bytes)",
                verb, path, outcome.revision, outcome.bytes
            );
        }
        None => println!("Dry run: snapshot not published"),
    }

    Ok(())
}

fn print_overview(snapshot: &Snapshot) {
    let priced = snapshot.rows().iter().filter(|r| r.has_prices()).count();
    println!(
        "\nBuilt {} rows ({} with prices, {} without)",
        snapshot.len(),
        priced,
        snapshot.len() - priced
    );

    let mut missing: Vec<&str> = snapshot
        .rows()
        .iter()
        .filter(|r| !r.has_prices())
        .map(|r| r.symbol.as_str())
        .collect();
    missing.truncate(10);
    if !missing.is_empty() {
        println!("  No price history: {}", missing.join(", "));
    }

    let summary = DashboardSummary::from_snapshot(snapshot);
    if let Some(average) = summary.horizon(Horizon::OneDay).and_then(|s| s.average) {
        println!("  Average 1-day return: {:.2}%", average);
    }
}

/// Load a snapshot and print its dashboard summary.
pub(crate) async fn run_summary(
    source: Option<InstrumentSource>,
    format: ReportFormat,
    store_args: &StoreArgs,
) -> Result<(), Box<dyn Error>> {
    let source = store_args.source_or_published(source)?;
    tracing::info!(source = %source, "Loading snapshot");

    let snapshot = Snapshot::from_csv(&source.read_text().await?)?;
    let report = Report::new(source.to_string(), DashboardSummary::from_snapshot(&snapshot));
    println!("{}", report.render(format)?);
    Ok(())
}
