//! SpendLens: A Rust CLI application for analyzing transaction data from CSV files
//!
//! This library turns raw transaction records (date, category, amount,
//! customer id) into derived analytical views: summary statistics,
//! time-bucketed trends, spend distributions, customer segments and
//! cross-category correlation, with optional chart rendering.

pub mod analyzer;
pub mod cli;
pub mod data;
pub mod error;
pub mod table;
pub mod viz;

// Re-export public items for easier access
pub use analyzer::{
    category_correlation, customer_metrics, distribution, resample, resample_by,
    segment_customers, summary, summary_by, top_categories, Frequency,
};
pub use cli::{Analysis, Args};
pub use data::{
    filter_by_category, filter_by_customer, filter_by_date_range, load_transactions,
};
pub use error::AnalysisError;
pub use table::{Column, Record, ResultSeries, ResultTable, Scalar, Table};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
