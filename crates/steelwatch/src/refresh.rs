//! One refresh run: build every row, then publish the snapshot.

use steelwatch_data::{FundamentalsSource, Instrument, QuoteSource};
use steelwatch_metrics::{LookbackWindow, MetricsBuilder, MetricsRow};
use steelwatch_output::{PublishError, PublishOutcome, Snapshot, SnapshotPublisher, SnapshotStore};

/// What a completed refresh produced.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// The rows that were published, in instrument order.
    pub snapshot: Snapshot,
    /// Store result of the publish step.
    pub outcome: PublishOutcome,
}

/// Build one row per instrument, in order, calling `on_row` after each.
///
/// Per-symbol failures only empty that row's fields, so this never fails.
pub async fn build_snapshot<Q, F, C>(
    builder: &MetricsBuilder<Q, F>,
    instruments: &[Instrument],
    window: &LookbackWindow,
    mut on_row: C,
) -> Snapshot
where
    Q: QuoteSource,
    F: FundamentalsSource,
    C: FnMut(usize, &MetricsRow),
{
    tracing::info!(
        instruments = instruments.len(),
        start = %window.start.date_naive(),
        end = %window.end.date_naive(),
        "Building metrics"
    );

    let mut rows = Vec::with_capacity(instruments.len());
    for (index, instrument) in instruments.iter().enumerate() {
        let row = builder.build_row(instrument, window).await;
        on_row(index, &row);
        rows.push(row);
    }

    let priced = rows.iter().filter(|r| r.has_prices()).count();
    tracing::info!(rows = rows.len(), priced, "Built metrics");
    Snapshot::new(rows)
}

/// Build the snapshot and replace the published one.
///
/// Only the publish step can fail; its error is returned as-is.
pub async fn refresh_snapshot<Q, F, S, C>(
    builder: &MetricsBuilder<Q, F>,
    publisher: &SnapshotPublisher<S>,
    instruments: &[Instrument],
    window: &LookbackWindow,
    on_row: C,
) -> Result<RefreshReport, PublishError>
where
    Q: QuoteSource,
    F: FundamentalsSource,
    S: SnapshotStore,
    C: FnMut(usize, &MetricsRow),
{
    let snapshot = build_snapshot(builder, instruments, window, on_row).await;
    let outcome = publisher.publish(&snapshot).await?;
    Ok(RefreshReport { snapshot, outcome })
}
