//! Snapshot export.
//!
//! The published snapshot is a flat CSV table with one row per instrument and
//! the columns in [`SNAPSHOT_COLUMNS`]. Prices, returns and ratios are written
//! with at least two decimals and no digits lost, so a parsed snapshot equals
//! the one written. Absent values are empty fields.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use steelwatch_metrics::{MetricsRow, TrailingReturns};
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::PrettyJson),
            _ => Err(ExportError::InvalidFormat(format!(
                "Cannot infer export format from {}",
                path.display()
            ))),
        }
    }
}

/// Published column names, in order.
pub const SNAPSHOT_COLUMNS: [&str; 12] = [
    "Ticker",
    "Industry",
    "Company",
    "Current Price (USD)",
    "1-Day Return (%)",
    "7-Day Return (%)",
    "30-Day Return (%)",
    "6-Month Return (%)",
    "P/E Ratio",
    "Market Cap",
    "Short Ratio",
    "Forward P/E",
];

/// One CSV line of the snapshot.
#[derive(Debug, Deserialize)]
struct SnapshotRecord {
    #[serde(rename = "Ticker")]
    symbol: String,
    #[serde(rename = "Industry")]
    sector: String,
    #[serde(rename = "Company")]
    name: String,
    #[serde(rename = "Current Price (USD)")]
    current_price: Option<f64>,
    #[serde(rename = "1-Day Return (%)")]
    one_day: Option<f64>,
    #[serde(rename = "7-Day Return (%)")]
    seven_day: Option<f64>,
    #[serde(rename = "30-Day Return (%)")]
    thirty_day: Option<f64>,
    #[serde(rename = "6-Month Return (%)")]
    six_month: Option<f64>,
    #[serde(rename = "P/E Ratio")]
    trailing_pe: Option<f64>,
    #[serde(rename = "Market Cap")]
    market_cap: Option<f64>,
    #[serde(rename = "Short Ratio")]
    short_ratio: Option<f64>,
    #[serde(rename = "Forward P/E")]
    forward_pe: Option<f64>,
}

impl From<SnapshotRecord> for MetricsRow {
    fn from(record: SnapshotRecord) -> Self {
        Self {
            symbol: record.symbol,
            sector: record.sector,
            name: record.name,
            current_price: record.current_price,
            returns: TrailingReturns {
                one_day: record.one_day,
                seven_day: record.seven_day,
                thirty_day: record.thirty_day,
                six_month: record.six_month,
            },
            trailing_pe: record.trailing_pe,
            market_cap: record.market_cap,
            short_ratio: record.short_ratio,
            forward_pe: record.forward_pe,
        }
    }
}

/// Format with at least `min_decimals` places, keeping every digit needed to
/// parse back the same value. Absent or non-finite values become empty.
fn format_value(value: Option<f64>, min_decimals: usize) -> String {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return String::new();
    };
    // Zero is written unsigned
    let v = if v == 0.0 { 0.0 } else { v };

    let shortest = v.to_string();
    let decimals = shortest.split_once('.').map_or(0, |(_, frac)| frac.len());
    if decimals >= min_decimals {
        shortest
    } else {
        format!("{:.*}", min_decimals, v)
    }
}

fn to_record(row: &MetricsRow) -> [String; 12] {
    [
        row.symbol.clone(),
        row.sector.clone(),
        row.name.clone(),
        format_value(row.current_price, 2),
        format_value(row.returns.one_day, 2),
        format_value(row.returns.seven_day, 2),
        format_value(row.returns.thirty_day, 2),
        format_value(row.returns.six_month, 2),
        format_value(row.trailing_pe, 2),
        format_value(row.market_cap, 0),
        format_value(row.short_ratio, 2),
        format_value(row.forward_pe, 2),
    ]
}

/// Write rows as snapshot CSV, header first.
pub fn write_snapshot_csv<W: Write>(rows: &[MetricsRow], writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(SNAPSHOT_COLUMNS)?;
    for row in rows {
        wtr.write_record(to_record(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// The ordered metrics table that gets published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    rows: Vec<MetricsRow>,
}

impl Snapshot {
    /// Create a snapshot from rows.
    pub const fn new(rows: Vec<MetricsRow>) -> Self {
        Self { rows }
    }

    /// Rows in publish order.
    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    /// Take the rows out.
    pub fn into_rows(self) -> Vec<MetricsRow> {
        self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the snapshot has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize to snapshot CSV.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut buf = Vec::new();
        write_snapshot_csv(&self.rows, &mut buf)?;
        String::from_utf8(buf).map_err(|e| ExportError::InvalidFormat(e.to_string()))
    }

    /// Parse snapshot CSV. Columns are matched by name.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ExportError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if let Some(missing) = SNAPSHOT_COLUMNS
            .iter()
            .find(|column| !headers.iter().any(|h| h == **column))
        {
            return Err(ExportError::InvalidFormat(format!(
                "Snapshot is missing column '{}'",
                missing
            )));
        }

        let rows = rdr
            .deserialize::<SnapshotRecord>()
            .map(|record| record.map(MetricsRow::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rows })
    }

    /// Parse snapshot CSV from a string.
    pub fn from_csv(content: &str) -> Result<Self, ExportError> {
        Self::from_reader(content.as_bytes())
    }
}

impl From<Vec<MetricsRow>> for Snapshot {
    fn from(rows: Vec<MetricsRow>) -> Self {
        Self::new(rows)
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for Snapshot {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => self.to_csv(),
            ExportFormat::Json => Ok(serde_json::to_string(&self.rows)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(&self.rows)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steelwatch_data::Instrument;
    use steelwatch_metrics::{Horizon, PriceSummary};

    const HEADER: &str = "Ticker,Industry,Company,Current Price (USD),1-Day Return (%),7-Day Return (%),30-Day Return (%),6-Month Return (%),P/E Ratio,Market Cap,Short Ratio,Forward P/E";

    fn full_row() -> MetricsRow {
        MetricsRow {
            symbol: "NUE".to_string(),
            sector: "Steel".to_string(),
            name: "Nucor Corporation".to_string(),
            current_price: Some(151.25),
            returns: TrailingReturns {
                one_day: Some(1.25),
                seven_day: Some(-3.5),
                thirty_day: Some(8.0),
                six_month: Some(-12.75),
            },
            trailing_pe: Some(14.52),
            market_cap: Some(35_000_000_000.0),
            short_ratio: Some(2.31),
            forward_pe: Some(11.8),
        }
    }

    #[test]
    fn test_header_matches_published_columns() {
        let csv = Snapshot::default().to_csv().unwrap();
        assert_eq!(csv, format!("{}\n", HEADER));
    }

    #[test]
    fn test_full_row_formatting() {
        let csv = Snapshot::new(vec![full_row()]).to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "NUE,Steel,Nucor Corporation,151.25,1.25,-3.50,8.00,-12.75,14.52,35000000000,2.31,11.80"
        );
    }

    #[test]
    fn test_absent_values_are_empty_fields() {
        let prices = PriceSummary {
            current_price: Some(30.1),
            returns: TrailingReturns {
                one_day: Some(5.0),
                ..TrailingReturns::default()
            },
        };
        let row = MetricsRow::new(
            &Instrument::new("X", "Steel", "X Corp"),
            prices,
            steelwatch_data::FundamentalData::empty("X"),
        );

        let csv = Snapshot::new(vec![row]).to_csv().unwrap();
        assert_eq!(csv.lines().nth(1), Some("X,Steel,X Corp,30.10,5.00,,,,,,,"));
    }

    #[test]
    fn test_empty_row() {
        let row = MetricsRow::empty(&Instrument::new("CLF", "Mining", "Cleveland-Cliffs"));
        let csv = Snapshot::new(vec![row]).to_csv().unwrap();
        assert_eq!(csv.lines().nth(1), Some("CLF,Mining,Cleveland-Cliffs,,,,,,,,,"));
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let mut row = MetricsRow::empty(&Instrument::new("X", "Steel", "United States Steel, Inc."));
        row.current_price = Some(40.0);
        let csv = Snapshot::new(vec![row.clone()]).to_csv().unwrap();
        assert!(csv.contains("\"United States Steel, Inc.\""));

        let parsed = Snapshot::from_csv(&csv).unwrap();
        assert_eq!(parsed.rows(), &[row]);
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(format_value(Some(5.0), 2), "5.00");
        assert_eq!(format_value(Some(11.8), 2), "11.80");
        assert_eq!(format_value(Some(3.14159), 2), "3.14159");
        assert_eq!(format_value(Some(-0.001), 2), "-0.001");
        assert_eq!(format_value(Some(-0.0), 2), "0.00");
        assert_eq!(format_value(Some(35_000_000_000.0), 0), "35000000000");
        assert_eq!(format_value(Some(1234.5), 0), "1234.5");
        assert_eq!(format_value(Some(f64::NAN), 2), "");
        assert_eq!(format_value(None, 2), "");
    }

    #[test]
    fn test_round_trip_keeps_full_precision() {
        let mut row = MetricsRow::empty(&Instrument::new("NUE", "Steel", "Nucor"));
        row.current_price = Some(151.256);
        row.returns.one_day = Some(3.14159);
        row.returns.six_month = Some(-12.345_678_901_234);
        row.short_ratio = Some(2.345);
        row.market_cap = Some(35_123_456_789.0);
        row.forward_pe = Some(0.1 + 0.2);

        let snapshot = Snapshot::new(vec![row]);
        let csv = snapshot.to_csv().unwrap();
        assert!(csv.contains("NUE,Steel,Nucor,151.256,3.14159,"));

        let parsed = Snapshot::from_csv(&csv).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_round_trip() {
        let mut sparse = MetricsRow::empty(&Instrument::new("MT", "Steel", "ArcelorMittal"));
        sparse.current_price = Some(27.4);
        sparse.returns.set(Horizon::SevenDay, Some(0.5));

        let snapshot = Snapshot::new(vec![full_row(), sparse]);
        let parsed = Snapshot::from_csv(&snapshot.to_csv().unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_parse_ignores_column_order() {
        let csv = "\
Company,Ticker,Industry,Current Price (USD),1-Day Return (%),7-Day Return (%),30-Day Return (%),6-Month Return (%),P/E Ratio,Market Cap,Short Ratio,Forward P/E
X Corp,X,Steel,10.00,,,,,,,,
";
        let parsed = Snapshot::from_csv(csv).unwrap();
        assert_eq!(parsed.rows()[0].symbol, "X");
        assert_eq!(parsed.rows()[0].name, "X Corp");
        assert_eq!(parsed.rows()[0].current_price, Some(10.0));
    }

    #[test]
    fn test_parse_missing_column() {
        let result = Snapshot::from_csv("Ticker,Industry,Company\nX,Steel,X Corp\n");
        assert!(matches!(result, Err(ExportError::InvalidFormat(msg)) if msg.contains("Current Price (USD)")));
    }

    #[test]
    fn test_parse_invalid_number() {
        let csv = format!("{}\nX,Steel,X Corp,abc,,,,,,,,\n", HEADER);
        assert!(matches!(Snapshot::from_csv(&csv), Err(ExportError::Csv(_))));
    }

    #[test]
    fn test_json_export() {
        let snapshot = Snapshot::new(vec![full_row()]);
        let json = snapshot.export_to_string(ExportFormat::Json).unwrap();
        assert!(json.contains("\"NUE\""));
        assert!(json.contains("\"one_day\":1.25"));

        let pretty = snapshot.export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(pretty.contains("  "));
    }

    #[test]
    fn test_export_to_file() {
        let snapshot = Snapshot::new(vec![full_row()]);
        let path = std::env::temp_dir().join("steelwatch_export_test.csv");

        snapshot.export_to_file(&path, ExportFormat::Csv).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(HEADER));
        assert_eq!(Snapshot::from_csv(&content).unwrap(), snapshot);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.csv")).unwrap(), ExportFormat::Csv);
        assert_eq!(
            ExportFormat::from_path(Path::new("out.JSON")).unwrap(),
            ExportFormat::PrettyJson
        );
        assert!(ExportFormat::from_path(Path::new("out")).is_err());
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }
}
