//! Rendered dashboard reports.

use crate::summary::DashboardSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown output format.
    #[error("Unknown report format '{0}' (expected text, markdown or json)")]
    UnknownFormat(String),
}

/// Output format of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Terminal tables.
    #[default]
    Text,
    /// Markdown document.
    Markdown,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Markdown => f.write_str("markdown"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// A dashboard summary together with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Snapshot location (path or URL).
    pub source: String,

    /// Report generation timestamp.
    pub generated_at: DateTime<Utc>,

    /// Summary contents.
    pub summary: DashboardSummary,
}

impl Report {
    /// Create a new report stamped with the current time.
    pub fn new(source: impl Into<String>, summary: DashboardSummary) -> Self {
        Self {
            source: source.into(),
            generated_at: Utc::now(),
            summary,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render in the given format.
    pub fn render(&self, format: ReportFormat) -> Result<String, ReportError> {
        match format {
            ReportFormat::Text => Ok(format!(
                "Source: {}\nGenerated: {}\n{}",
                self.source,
                self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                self.summary.to_ascii_table()
            )),
            ReportFormat::Markdown => Ok(format!(
                "{}\n_Source: {} (generated {})_\n",
                self.summary.to_markdown(),
                self.source,
                self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            ReportFormat::Json => self.to_json(),
        }
    }
}
