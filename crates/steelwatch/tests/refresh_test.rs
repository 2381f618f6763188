//! End-to-end refresh runs against in-memory sources and store.

use chrono::{TimeZone, Utc};
use polars::prelude::*;
use std::collections::HashMap;
use steelwatch::data::{DataError, FundamentalData, FundamentalsSource, Instrument, QuoteSource};
use steelwatch::metrics::{Horizon, LookbackWindow, MetricsBuilder};
use steelwatch::output::{
    DEFAULT_SNAPSHOT_PATH, MemoryStore, PublishError, PublisherConfig, Revision, Snapshot,
    SnapshotPublisher, SnapshotStore,
};
use steelwatch::{build_snapshot, refresh_snapshot};

#[derive(Default)]
struct StaticQuotes {
    closes: HashMap<String, Vec<f64>>,
}

impl StaticQuotes {
    fn with(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.closes.insert(symbol.to_string(), closes.to_vec());
        self
    }
}

impl QuoteSource for StaticQuotes {
    async fn fetch_history(
        &self,
        symbol: &str,
        _start: chrono::DateTime<Utc>,
        _end: chrono::DateTime<Utc>,
    ) -> steelwatch::data::Result<DataFrame> {
        let Some(closes) = self.closes.get(symbol) else {
            return Err(DataError::YahooApi(format!("no data for {symbol}")));
        };
        let n = closes.len();
        let days: Vec<i32> = (0..n as i32).map(|d| 19_500 + d).collect();
        Ok(DataFrame::new(vec![
            Series::new("symbol".into(), vec![symbol; n]).into(),
            Series::new("date".into(), days)
                .cast(&DataType::Date)
                .unwrap()
                .into(),
            Series::new("close".into(), closes.clone()).into(),
        ])
        .unwrap())
    }
}

#[derive(Default)]
struct StaticFundamentals {
    data: HashMap<String, FundamentalData>,
}

impl FundamentalsSource for StaticFundamentals {
    async fn fetch_fundamentals(&self, symbol: &str) -> steelwatch::data::Result<FundamentalData> {
        Ok(self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| FundamentalData::empty(symbol)))
    }
}

fn window() -> LookbackWindow {
    LookbackWindow::ending(Utc.with_ymd_and_hms(2025, 6, 2, 21, 0, 0).unwrap())
}

#[tokio::test]
async fn test_single_instrument_snapshot_line() {
    let builder = MetricsBuilder::new(
        StaticQuotes::default().with("X", &[100.0, 105.0]),
        StaticFundamentals::default(),
    );
    let publisher = SnapshotPublisher::new(MemoryStore::new(), PublisherConfig::default());
    let instruments = vec![Instrument::new("X", "Steel", "X Corp")];

    let report = refresh_snapshot(&builder, &publisher, &instruments, &window(), |_, _| {})
        .await
        .unwrap();

    assert!(report.outcome.created);
    let stored = publisher.store().content(DEFAULT_SNAPSHOT_PATH).unwrap();
    let text = String::from_utf8(stored).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "X,Steel,X Corp,105.00,5.00,,,,,,,");
}

#[tokio::test]
async fn test_rows_match_instruments_and_failures_are_isolated() {
    let quotes = StaticQuotes::default()
        .with("NUE", &[100.0, 110.0])
        .with("STLD", &[80.0, 76.0]);
    let mut fundamentals = StaticFundamentals::default();
    fundamentals.data.insert(
        "CLF".to_string(),
        FundamentalData {
            symbol: "CLF".to_string(),
            market_cap: Some(4.2e9),
            ..FundamentalData::default()
        },
    );

    let builder = MetricsBuilder::new(quotes, fundamentals);
    let publisher = SnapshotPublisher::new(MemoryStore::new(), PublisherConfig::default());
    let instruments = vec![
        Instrument::new("NUE", "Steel", "Nucor"),
        Instrument::new("CLF", "Mining", "Cleveland-Cliffs"),
        Instrument::new("STLD", "Steel", "Steel Dynamics"),
    ];

    let mut seen = Vec::new();
    let report = refresh_snapshot(&builder, &publisher, &instruments, &window(), |i, row| {
        seen.push((i, row.symbol.clone()));
    })
    .await
    .unwrap();

    assert_eq!(
        seen,
        vec![
            (0, "NUE".to_string()),
            (1, "CLF".to_string()),
            (2, "STLD".to_string())
        ]
    );

    let rows = report.snapshot.rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].current_price, None);
    assert_eq!(rows[1].return_for(Horizon::OneDay), None);
    // No history means no fundamentals either
    assert_eq!(rows[1].market_cap, None);
    assert_eq!(rows[2].current_price, Some(76.0));

    // What was stored parses back to the same rows
    let stored = String::from_utf8(publisher.store().content(DEFAULT_SNAPSHOT_PATH).unwrap()).unwrap();
    assert!(stored.lines().any(|line| line == "CLF,Mining,Cleveland-Cliffs,,,,,,,,,"));
    let parsed = Snapshot::from_csv(&stored).unwrap();
    assert_eq!(parsed.rows()[0].return_for(Horizon::OneDay), Some(10.0));
    assert_eq!(parsed.rows()[2].return_for(Horizon::OneDay), Some(-5.0));
}

#[tokio::test]
async fn test_build_snapshot_without_publishing() {
    let builder = MetricsBuilder::new(
        StaticQuotes::default().with("NUE", &[10.0, 11.0]),
        StaticFundamentals::default(),
    );
    let instruments = vec![Instrument::new("NUE", "Steel", "Nucor")];

    let mut calls = 0;
    let snapshot = build_snapshot(&builder, &instruments, &window(), |_, _| calls += 1).await;
    assert_eq!(calls, 1);
    assert_eq!(snapshot.len(), 1);
}

/// Lets another writer in between the read and the write.
struct InterleavedStore {
    inner: MemoryStore,
}

impl SnapshotStore for InterleavedStore {
    async fn current_revision(&self, path: &str) -> Result<Option<Revision>, PublishError> {
        let revision = self.inner.current_revision(path).await?;
        self.inner.overwrite(path, b"written by another run");
        Ok(revision)
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        precondition: Option<&Revision>,
    ) -> Result<Revision, PublishError> {
        self.inner.put(path, content, precondition).await
    }
}

#[tokio::test]
async fn test_stale_revision_fails_the_run() {
    let inner = MemoryStore::new();
    inner.overwrite(DEFAULT_SNAPSHOT_PATH, b"previous run");

    let builder = MetricsBuilder::new(
        StaticQuotes::default().with("NUE", &[10.0, 11.0]),
        StaticFundamentals::default(),
    );
    let publisher = SnapshotPublisher::new(InterleavedStore { inner }, PublisherConfig::default());
    let instruments = vec![Instrument::new("NUE", "Steel", "Nucor")];

    let result = refresh_snapshot(&builder, &publisher, &instruments, &window(), |_, _| {}).await;
    assert!(matches!(result, Err(PublishError::Conflict { .. })));
    assert_eq!(
        publisher.store().inner.content(DEFAULT_SNAPSHOT_PATH),
        Some(b"written by another run".to_vec())
    );
}
