//! Dashboard summary of a published snapshot.
//!
//! Aggregates the snapshot the way the dashboard presents it: average and
//! extreme returns per horizon, returns by industry, and the correlation
//! matrix of the numeric columns.

use crate::export::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use steelwatch_metrics::{Horizon, MetricsRow, TrailingReturns};

/// Numeric snapshot columns entering the correlation matrix, in order.
pub const NUMERIC_COLUMNS: [&str; 9] = [
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

fn numeric_values(row: &MetricsRow) -> [Option<f64>; 9] {
    [
        row.current_price,
        row.returns.one_day,
        row.returns.seven_day,
        row.returns.thirty_day,
        row.returns.six_month,
        row.trailing_pe,
        row.market_cap,
        row.short_ratio,
        row.forward_pe,
    ]
}

/// A company holding an extreme return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leader {
    /// Ticker symbol.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Return in percent.
    pub value: f64,
}

/// Aggregates for one horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonStats {
    /// The horizon.
    pub horizon: Horizon,
    /// Mean return over rows that have one.
    pub average: Option<f64>,
    /// Highest return; the first row wins ties.
    pub top: Option<Leader>,
    /// Lowest return; the first row wins ties.
    pub lowest: Option<Leader>,
    /// Rows with a return for this horizon.
    pub observations: usize,
}

impl HorizonStats {
    fn compute(horizon: Horizon, rows: &[MetricsRow]) -> Self {
        let mut sum = 0.0;
        let mut observations = 0;
        let mut top: Option<Leader> = None;
        let mut lowest: Option<Leader> = None;

        for row in rows {
            let Some(value) = row.return_for(horizon).filter(|v| v.is_finite()) else {
                continue;
            };
            sum += value;
            observations += 1;

            if top.as_ref().is_none_or(|t| value > t.value) {
                top = Some(Leader::of(row, value));
            }
            if lowest.as_ref().is_none_or(|l| value < l.value) {
                lowest = Some(Leader::of(row, value));
            }
        }

        Self {
            horizon,
            average: (observations > 0).then(|| sum / observations as f64),
            top,
            lowest,
            observations,
        }
    }
}

impl Leader {
    fn of(row: &MetricsRow, value: f64) -> Self {
        Self {
            symbol: row.symbol.clone(),
            name: row.name.clone(),
            value,
        }
    }
}

/// Average returns of one industry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryReturns {
    /// Industry label.
    pub industry: String,
    /// Number of companies in the industry.
    pub companies: usize,
    /// Mean return per horizon, nulls skipped.
    pub averages: TrailingReturns,
}

/// Pearson correlations over pairwise-complete observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Column names, in row and column order.
    pub columns: Vec<String>,
    /// `values[i][j]` is the correlation of column `i` with column `j`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Correlate [`NUMERIC_COLUMNS`] over the rows.
    pub fn from_rows(rows: &[MetricsRow]) -> Self {
        let data: Vec<[Option<f64>; 9]> = rows.iter().map(numeric_values).collect();
        let n = NUMERIC_COLUMNS.len();

        let mut values = vec![vec![None; n]; n];
        for i in 0..n {
            for j in i..n {
                let pairs: Vec<(f64, f64)> = data
                    .iter()
                    .filter_map(|r| match (r[i], r[j]) {
                        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
                        _ => None,
                    })
                    .collect();
                let r = pearson(&pairs);
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        Self {
            columns: NUMERIC_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            values,
        }
    }

    /// Correlation between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Sample Pearson correlation; `None` with fewer than two pairs or zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom < 1e-12 {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Everything the dashboard shows about one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Number of companies.
    pub companies: usize,
    /// Stats per horizon, shortest first.
    pub horizons: Vec<HorizonStats>,
    /// Returns by industry, in first-seen order.
    pub industries: Vec<IndustryReturns>,
    /// Correlations of the numeric columns.
    pub correlations: CorrelationMatrix,
}

impl DashboardSummary {
    /// Summarize the rows.
    pub fn from_rows(rows: &[MetricsRow]) -> Self {
        let horizons = Horizon::ALL
            .iter()
            .map(|&h| HorizonStats::compute(h, rows))
            .collect();

        Self {
            companies: rows.len(),
            horizons,
            industries: industry_returns(rows),
            correlations: CorrelationMatrix::from_rows(rows),
        }
    }

    /// Summarize a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::from_rows(snapshot.rows())
    }

    /// Stats for one horizon.
    pub fn horizon(&self, horizon: Horizon) -> Option<&HorizonStats> {
        self.horizons.iter().find(|s| s.horizon == horizon)
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nDashboard Summary: {} companies\n", self.companies));
        output.push_str(&"=".repeat(80));
        output.push('\n');

        output.push_str("\nReturns by Horizon:\n");
        output.push_str(&"-".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "{:<10} {:>10} {:>26} {:>26}\n",
            "Horizon", "Average", "Top", "Lowest"
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        for stats in &self.horizons {
            output.push_str(&format!(
                "{:<10} {:>10} {:>26} {:>26}\n",
                stats.horizon.label(),
                fmt_pct(stats.average),
                fmt_leader(stats.top.as_ref()),
                fmt_leader(stats.lowest.as_ref())
            ));
        }

        if !self.industries.is_empty() {
            output.push_str("\nAverage Returns by Industry:\n");
            output.push_str(&"-".repeat(80));
            output.push('\n');
            output.push_str(&format!(
                "{:<20} {:>6} {:>12} {:>12} {:>12} {:>12}\n",
                "Industry", "Count", "1-Day", "7-Day", "30-Day", "6-Month"
            ));
            output.push_str(&"-".repeat(80));
            output.push('\n');
            for industry in &self.industries {
                output.push_str(&format!(
                    "{:<20} {:>6} {:>12} {:>12} {:>12} {:>12}\n",
                    industry.industry,
                    industry.companies,
                    fmt_pct(industry.averages.one_day),
                    fmt_pct(industry.averages.seven_day),
                    fmt_pct(industry.averages.thirty_day),
                    fmt_pct(industry.averages.six_month)
                ));
            }
        }

        output.push_str("\nCorrelation Matrix:\n");
        output.push_str(&"-".repeat(80));
        output.push('\n');
        output.push_str(&format!("{:<20}", ""));
        for i in 0..self.correlations.columns.len() {
            output.push_str(&format!(" {:>6}", format!("[{}]", i + 1)));
        }
        output.push('\n');
        for (i, column) in self.correlations.columns.iter().enumerate() {
            output.push_str(&format!("{:<20}", format!("[{}] {}", i + 1, truncate(column, 15))));
            for value in &self.correlations.values[i] {
                output.push_str(&format!(" {:>6}", fmt_corr(*value)));
            }
            output.push('\n');
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Dashboard Summary\n\n");
        output.push_str(&format!("**Companies:** {}\n\n", self.companies));

        output.push_str("## Returns by Horizon\n\n");
        output.push_str("| Horizon | Average | Top | Lowest |\n");
        output.push_str("|---------|---------|-----|--------|\n");
        for stats in &self.horizons {
            output.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                stats.horizon.label(),
                fmt_pct(stats.average),
                fmt_leader(stats.top.as_ref()),
                fmt_leader(stats.lowest.as_ref())
            ));
        }
        output.push('\n');

        if !self.industries.is_empty() {
            output.push_str("## Average Returns by Industry\n\n");
            output.push_str("| Industry | Companies | 1-Day | 7-Day | 30-Day | 6-Month |\n");
            output.push_str("|----------|-----------|-------|-------|--------|---------|\n");
            for industry in &self.industries {
                output.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    industry.industry,
                    industry.companies,
                    fmt_pct(industry.averages.one_day),
                    fmt_pct(industry.averages.seven_day),
                    fmt_pct(industry.averages.thirty_day),
                    fmt_pct(industry.averages.six_month)
                ));
            }
            output.push('\n');
        }

        output.push_str("## Correlation Matrix\n\n");
        output.push_str("| |");
        for column in &self.correlations.columns {
            output.push_str(&format!(" {} |", column));
        }
        output.push('\n');
        output.push_str("|---|");
        output.push_str(&"---|".repeat(self.correlations.columns.len()));
        output.push('\n');
        for (column, values) in self.correlations.columns.iter().zip(&self.correlations.values) {
            output.push_str(&format!("| {} |", column));
            for value in values {
                output.push_str(&format!(" {} |", fmt_corr(*value)));
            }
            output.push('\n');
        }

        output
    }
}

impl fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dashboard Summary: {} companies", self.companies)?;
        for stats in &self.horizons {
            writeln!(
                f,
                "  {} average: {}",
                stats.horizon.label(),
                fmt_pct(stats.average)
            )?;
        }
        Ok(())
    }
}

fn industry_returns(rows: &[MetricsRow]) -> Vec<IndustryReturns> {
    // (industry, companies, per-horizon sum and count)
    let mut groups: Vec<(String, usize, [(f64, usize); 4])> = Vec::new();

    for row in rows {
        let index = match groups.iter().position(|(name, _, _)| *name == row.sector) {
            Some(index) => index,
            None => {
                groups.push((row.sector.clone(), 0, [(0.0, 0); 4]));
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        group.1 += 1;
        for (k, horizon) in Horizon::ALL.iter().enumerate() {
            if let Some(value) = row.return_for(*horizon).filter(|v| v.is_finite()) {
                group.2[k].0 += value;
                group.2[k].1 += 1;
            }
        }
    }

    groups
        .into_iter()
        .map(|(industry, companies, sums)| {
            let mut averages = TrailingReturns::default();
            for (k, horizon) in Horizon::ALL.iter().enumerate() {
                let (sum, count) = sums[k];
                averages.set(*horizon, (count > 0).then(|| sum / count as f64));
            }
            IndustryReturns {
                industry,
                companies,
                averages,
            }
        })
        .collect()
}

fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v))
}

fn fmt_corr(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

fn fmt_leader(leader: Option<&Leader>) -> String {
    leader.map_or_else(
        || "n/a".to_string(),
        |l| format!("{} ({:.2}%)", l.symbol, l.value),
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
