//! Fundamental data fetching from Yahoo Finance.
//!
//! Uses the `quoteSummary` endpoint with the `summaryDetail` and
//! `defaultKeyStatistics` modules. Yahoo requires a session cookie and a
//! matching crumb on this endpoint; both are obtained once per provider.

use crate::error::{DataError, Result};
use crate::source::{FundamentalData, FundamentalsSource};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Page that hands out the session cookie.
const COOKIE_URL: &str = "https://fc.yahoo.com";

/// Endpoint returning the crumb bound to the session cookie.
const CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";

/// quoteSummary endpoint, symbol appended.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

const MODULES: &str = "summaryDetail,defaultKeyStatistics";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryEnvelope {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<QuoteSummaryError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    summary_detail: SummaryDetail,
    #[serde(default)]
    default_key_statistics: KeyStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(default, rename = "trailingPE")]
    trailing_pe: RawValue,
    #[serde(default, rename = "forwardPE")]
    forward_pe: RawValue,
    #[serde(default)]
    market_cap: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    #[serde(default)]
    short_ratio: RawValue,
    #[serde(default, rename = "forwardPE")]
    forward_pe: RawValue,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; missing values are `{}`.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

impl RawValue {
    fn value(&self) -> Option<f64> {
        self.raw.filter(|v| v.is_finite())
    }
}

/// Parse a quoteSummary response body into fundamentals.
pub(crate) fn parse_quote_summary(symbol: &str, body: &str) -> Result<FundamentalData> {
    let envelope: QuoteSummaryEnvelope = serde_json::from_str(body)?;
    let summary = envelope.quote_summary;

    if let Some(error) = summary.error {
        if error.code.eq_ignore_ascii_case("not found") {
            return Ok(FundamentalData::empty(symbol));
        }
        return Err(DataError::YahooApi(format!(
            "{}: {}",
            error.code, error.description
        )));
    }

    let Some(result) = summary.result.and_then(|r| r.into_iter().next()) else {
        return Ok(FundamentalData::empty(symbol));
    };

    let detail = result.summary_detail;
    let stats = result.default_key_statistics;

    Ok(FundamentalData {
        symbol: symbol.to_string(),
        trailing_pe: detail.trailing_pe.value(),
        market_cap: detail.market_cap.value(),
        short_ratio: stats.short_ratio.value(),
        forward_pe: detail.forward_pe.value().or_else(|| stats.forward_pe.value()),
    })
}

/// Whether Yahoo refused the session crumb. The response is a 401 whose body
/// carries an `Unauthorized` / `Invalid Crumb` error.
fn crumb_rejected(status: reqwest::StatusCode, body: &str) -> bool {
    status == reqwest::StatusCode::UNAUTHORIZED
        || body.contains("\"Unauthorized\"")
        || body.to_ascii_lowercase().contains("invalid crumb")
}

/// Yahoo Finance fundamentals provider.
#[derive(Debug)]
pub struct YahooFundamentalsProvider {
    client: reqwest::Client,
    crumb: Mutex<Option<String>>,
    rate_limit_delay: Duration,
}

impl YahooFundamentalsProvider {
    /// Create a new Yahoo Finance fundamentals provider.
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(1000))
    }

    /// Create a new provider with custom rate limiting.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            crumb: Mutex::new(None),
            rate_limit_delay,
        })
    }

    /// Get the session crumb, performing the cookie handshake on first use.
    async fn crumb(&self) -> Result<String> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        // The cookie page answers 404 but still sets the session cookie
        self.client.get(COOKIE_URL).send().await?;

        let response = self.client.get(CRUMB_URL).send().await?;
        if !response.status().is_success() {
            return Err(DataError::Http(format!(
                "Failed to obtain Yahoo crumb: HTTP {}",
                response.status()
            )));
        }
        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() {
            return Err(DataError::YahooApi("Empty crumb".to_string()));
        }

        tracing::debug!("Obtained Yahoo session crumb");
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    /// Drop the cached crumb so the next request performs a new handshake.
    async fn forget_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    /// Fetch fundamental data for a single symbol.
    pub async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalData> {
        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let crumb = self.crumb().await?;
        let url = format!("{}/{}", QUOTE_SUMMARY_URL, symbol);

        tracing::debug!(symbol, "Requesting fundamentals");
        let result = self
            .client
            .get(&url)
            .query(&[("modules", MODULES), ("crumb", crumb.as_str())])
            .send()
            .await;

        sleep(self.rate_limit_delay).await;

        let response = result?;
        let status = response.status();
        let body = response.text().await?;

        // A stale session: the next call redoes the handshake
        if crumb_rejected(status, &body) {
            tracing::debug!(symbol, "Yahoo rejected the session crumb");
            self.forget_crumb().await;
            return Err(DataError::YahooApi(format!(
                "Session crumb rejected for {}",
                symbol
            )));
        }

        // Unknown symbols come back as 404 with an error body
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::Http(format!(
                "Failed to fetch fundamentals for {}: HTTP {}",
                symbol, status
            )));
        }

        parse_quote_summary(symbol, &body)
    }
}

impl FundamentalsSource for YahooFundamentalsProvider {
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalData> {
        Self::fetch_fundamentals(self, symbol).await
    }
}
