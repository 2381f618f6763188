//! Instrument table loading.
//!
//! The instrument table is a CSV file with at least the columns `Ticker`,
//! `Industry` and `Company`. Any other columns are ignored, so a previously
//! published snapshot can be fed back in as the instrument list.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const TICKER_COLUMN: &str = "Ticker";
const INDUSTRY_COLUMN: &str = "Industry";
const COMPANY_COLUMN: &str = "Company";

/// One tracked security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Ticker symbol.
    #[serde(rename = "Ticker")]
    pub symbol: String,
    /// Sector label.
    #[serde(rename = "Industry")]
    pub sector: String,
    /// Display name.
    #[serde(rename = "Company")]
    pub name: String,
}

impl Instrument {
    /// Create a new instrument.
    pub fn new(
        symbol: impl Into<String>,
        sector: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            sector: sector.into(),
            name: name.into(),
        }
    }
}

/// Where the instrument table is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentSource {
    /// A local CSV file.
    Path(PathBuf),
    /// An `http(s)` URL serving CSV.
    Url(String),
}

impl FromStr for InstrumentSource {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DataError::Parse("Empty instrument source".to_string()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::Path(PathBuf::from(s)))
        }
    }
}

impl InstrumentSource {
    /// Read the whole document, from disk or over HTTP.
    pub async fn read_text(&self) -> Result<String> {
        match self {
            Self::Path(path) => Ok(tokio::fs::read_to_string(path).await?),
            Self::Url(url) => fetch_text(url).await,
        }
    }
}

impl fmt::Display for InstrumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Ordered, duplicate-free list of instruments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentTable {
    instruments: Vec<Instrument>,
}

impl InstrumentTable {
    /// Build a table from instruments, rejecting empty and duplicate symbols.
    pub fn new(instruments: Vec<Instrument>) -> Result<Self> {
        let mut seen = HashSet::new();
        for instrument in &instruments {
            if instrument.symbol.is_empty() {
                return Err(DataError::InvalidSymbol(format!(
                    "Empty ticker for company '{}'",
                    instrument.name
                )));
            }
            if !seen.insert(instrument.symbol.as_str()) {
                return Err(DataError::DuplicateSymbol(instrument.symbol.clone()));
            }
        }
        Ok(Self { instruments })
    }

    /// Parse a table from CSV.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for required in [TICKER_COLUMN, INDUSTRY_COLUMN, COMPANY_COLUMN] {
            if !headers.iter().any(|h| h == required) {
                return Err(DataError::MissingColumn(required));
            }
        }

        let instruments = rdr
            .deserialize::<Instrument>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Self::new(instruments)
    }

    /// Parse a table from a CSV string.
    pub fn from_csv_str(content: &str) -> Result<Self> {
        Self::from_reader(content.as_bytes())
    }

    /// Load a table from a file or URL.
    pub async fn load(source: &InstrumentSource) -> Result<Self> {
        let table = Self::from_csv_str(&source.read_text().await?)?;
        tracing::info!(
            source = %source,
            instruments = table.len(),
            "Loaded instrument table"
        );
        Ok(table)
    }

    /// All instruments in table order.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// All symbols in table order.
    pub fn symbols(&self) -> Vec<String> {
        self.instruments.iter().map(|i| i.symbol.clone()).collect()
    }

    /// Look up an instrument by symbol.
    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    /// Number of instruments.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Whether the table has no instruments.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

impl<'a> IntoIterator for &'a InstrumentTable {
    type Item = &'a Instrument;
    type IntoIter = std::slice::Iter<'a, Instrument>;

    fn into_iter(self) -> Self::IntoIter {
        self.instruments.iter()
    }
}

/// Fetch a text document over HTTP, failing on non-success statuses.
pub async fn fetch_text(url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(DataError::Http(format!(
            "Failed to fetch {}: HTTP {}",
            url,
            response.status()
        )));
    }

    Ok(response.text().await?)
}
