//! Command-line interface definitions and argument parsing

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

/// Analyses the tool can run over a transaction CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Analysis {
    /// Descriptive statistics of the amount column
    Summary,
    /// Spend per time bucket
    TimeSeries,
    /// Total spend per group, largest first
    Distribution,
    /// Top spending categories
    TopCategories,
    /// Customers banded by total spend
    CustomerSegments,
    /// Per-customer behavioral metrics
    CustomerMetrics,
    /// Correlation between category spend across customers
    Correlation,
}

/// Transaction analysis CLI: derived statistics and charts from CSV data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    pub input: String,

    /// Type of analysis to perform
    #[arg(short, long, value_enum, default_value = "summary")]
    pub analysis: Analysis,

    /// Column to group by (summary, time-series, distribution)
    #[arg(short, long)]
    pub groupby: Option<String>,

    /// Number of top categories to show
    #[arg(short = 'n', long, default_value = "5")]
    pub n_top: usize,

    /// Frequency for time-series analysis: day, week, month, quarter or year
    #[arg(short, long, default_value = "month")]
    pub frequency: String,

    /// Number of customer segments
    #[arg(short, long, default_value = "3")]
    pub segments: usize,

    /// Keep only rows on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Keep only rows on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Keep only rows with this category
    #[arg(long)]
    pub category: Option<String>,

    /// Keep only rows with this customer ID
    #[arg(long)]
    pub customer: Option<String>,

    /// Path for the chart image; no chart is rendered without it
    #[arg(short, long)]
    pub output: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the optional date filter bounds.
    /// Expected format: "YYYY-MM-DD"
    pub fn parse_date_filters(&self) -> crate::Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let parse = |value: &Option<String>| -> crate::Result<Option<NaiveDate>> {
            match value {
                Some(s) => {
                    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                        .map_err(|_| anyhow::anyhow!("invalid date filter: {}", s))?;
                    Ok(Some(date))
                }
                None => Ok(None),
            }
        };
        Ok((parse(&self.start_date)?, parse(&self.end_date)?))
    }
}
