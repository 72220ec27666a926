//! The tabular analysis engine
//!
//! Every operation is a stateless transform: it borrows the table read-only,
//! validates its preconditions up front, and returns a freshly allocated
//! result. Grouped variants are separate functions rather than optional
//! parameters, so default resolution is explicit in the call site.

use crate::error::AnalysisError;
use crate::table::{Column, ResultSeries, ResultTable, Scalar, Table};
use chrono::{Datelike, Duration, NaiveDate};
use ndarray::Array2;
use std::collections::{BTreeMap, BTreeSet};

/// Time bucket width for resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Frequency {
    /// Parse a frequency token. Accepts the full name or the single-letter
    /// short code, case-insensitive.
    pub fn from_token(token: &str) -> Result<Frequency, AnalysisError> {
        match token.to_ascii_lowercase().as_str() {
            "day" | "d" => Ok(Frequency::Day),
            "week" | "w" => Ok(Frequency::Week),
            "month" | "m" => Ok(Frequency::Month),
            "quarter" | "q" => Ok(Frequency::Quarter),
            "year" | "y" => Ok(Frequency::Year),
            other => Err(AnalysisError::Parameter(format!(
                "unsupported frequency '{}': expected day, week, month, quarter or year",
                other
            ))),
        }
    }

    /// Truncate a date to the start of its bucket. Weeks start on Monday,
    /// months/quarters/years on the first day of the period.
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Day => date,
            Frequency::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            Frequency::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                .unwrap_or(date),
            Frequency::Quarter => {
                let quarter_start = ((date.month() - 1) / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), quarter_start, 1).unwrap_or(date)
            }
            Frequency::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }
}

/// Shared precondition: every operation rejects an empty table.
fn ensure_nonempty(table: &Table) -> Result<(), AnalysisError> {
    if table.is_empty() {
        Err(AnalysisError::EmptyData)
    } else {
        Ok(())
    }
}

/// Descriptive statistics over the whole `amount` column.
///
/// Returns a single-row table with count, mean, median, sample standard
/// deviation, min and max.
pub fn summary(table: &Table) -> Result<ResultTable, AnalysisError> {
    ensure_nonempty(table)?;
    let amounts: Vec<f64> = table.records().iter().map(|r| r.amount).collect();
    Ok(ResultTable {
        index_name: "column".to_string(),
        columns: stat_columns(false),
        rows: vec![("amount".to_string(), stat_row(&amounts, false))],
    })
}

/// Descriptive statistics of `amount` per value of `group_col`.
///
/// Adds a `sum` column and orders rows by the group key's natural sort order.
pub fn summary_by(table: &Table, group_col: &str) -> Result<ResultTable, AnalysisError> {
    ensure_nonempty(table)?;
    let col = Column::from_name(group_col)?;

    let mut partitions = table.partition_by(col);
    partitions.sort_by(|a, b| a.0.cmp(&b.0));

    let rows = partitions
        .into_iter()
        .map(|(key, indices)| {
            let amounts = table.amounts(&indices);
            (key, stat_row(&amounts, true))
        })
        .collect();

    Ok(ResultTable {
        index_name: group_col.to_string(),
        columns: stat_columns(true),
        rows,
    })
}

/// Sum of `amount` per time bucket, in chronological order.
///
/// Buckets with no records are not synthesized.
pub fn resample(table: &Table, freq: Frequency) -> Result<ResultSeries, AnalysisError> {
    ensure_nonempty(table)?;
    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in table.records() {
        *buckets.entry(freq.truncate(record.date)).or_insert(0.0) += record.amount;
    }
    Ok(ResultSeries {
        name: "amount".to_string(),
        index_name: "date".to_string(),
        points: buckets
            .into_iter()
            .map(|(d, v)| (d.format("%Y-%m-%d").to_string(), v))
            .collect(),
    })
}

/// One resampled time series per value of `group_col`, outer-joined on a
/// shared chronological bucket axis. A group with no records in a bucket
/// contributes 0.0 there.
pub fn resample_by(
    table: &Table,
    freq: Frequency,
    group_col: &str,
) -> Result<ResultTable, AnalysisError> {
    ensure_nonempty(table)?;
    let col = Column::from_name(group_col)?;

    let mut partitions = table.partition_by(col);
    partitions.sort_by(|a, b| a.0.cmp(&b.0));

    let mut per_group: Vec<(String, BTreeMap<NaiveDate, f64>)> = Vec::new();
    let mut axis: BTreeSet<NaiveDate> = BTreeSet::new();
    for (key, indices) in partitions {
        let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for &row in &indices {
            let record = &table.records()[row];
            *buckets.entry(freq.truncate(record.date)).or_insert(0.0) += record.amount;
        }
        axis.extend(buckets.keys().copied());
        per_group.push((key, buckets));
    }

    let columns: Vec<String> = per_group.iter().map(|(k, _)| k.clone()).collect();
    let rows = axis
        .into_iter()
        .map(|bucket| {
            let cells = per_group
                .iter()
                .map(|(_, buckets)| Scalar::Float(buckets.get(&bucket).copied().unwrap_or(0.0)))
                .collect();
            (bucket.format("%Y-%m-%d").to_string(), cells)
        })
        .collect();

    Ok(ResultTable {
        index_name: "date".to_string(),
        columns,
        rows,
    })
}

/// Sum of `amount` per value of `by_col`, sorted descending by the summed
/// value. Ties keep first-seen group order (the sort is stable).
pub fn distribution(table: &Table, by_col: &str) -> Result<ResultSeries, AnalysisError> {
    ensure_nonempty(table)?;
    let col = Column::from_name(by_col)?;

    let mut points: Vec<(String, f64)> = table
        .partition_by(col)
        .into_iter()
        .map(|(key, indices)| (key, table.amounts(&indices).iter().sum()))
        .collect();
    points.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(ResultSeries {
        name: "amount".to_string(),
        index_name: by_col.to_string(),
        points,
    })
}

/// The top `n` spending categories. `n` larger than the number of distinct
/// categories returns all of them; `n = 0` yields an empty series.
pub fn top_categories(table: &Table, n: usize) -> Result<ResultSeries, AnalysisError> {
    let mut series = distribution(table, "category")?;
    series.points.truncate(n);
    Ok(series)
}

/// Rank customers by total spend and split them into contiguous bands.
///
/// Bands hold `floor(customers / n_segments)` customers each, except the
/// last (lowest-spending) band, which absorbs the remainder. With fewer
/// customers than segments every customer gets a singleton segment.
/// "Segment 1" holds the highest spenders.
pub fn segment_customers(table: &Table, n_segments: usize) -> Result<ResultTable, AnalysisError> {
    ensure_nonempty(table)?;
    if n_segments == 0 {
        return Err(AnalysisError::Parameter(
            "number of segments must be at least 1".to_string(),
        ));
    }

    let mut totals: Vec<(String, f64)> = table
        .partition_by(Column::CustomerId)
        .into_iter()
        .map(|(key, indices)| (key, table.amounts(&indices).iter().sum()))
        .collect();
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let n_customers = totals.len();
    let mut segments = n_segments;
    let mut band_size = n_customers / segments;
    if band_size == 0 {
        segments = n_customers;
        band_size = 1;
    }

    let rows = totals
        .into_iter()
        .enumerate()
        .map(|(rank, (customer, total))| {
            // The last band takes every remaining customer
            let band = (rank / band_size).min(segments - 1);
            let label = format!("Segment {}", band + 1);
            (
                customer,
                vec![Scalar::Float(total), Scalar::Text(label)],
            )
        })
        .collect();

    Ok(ResultTable {
        index_name: "customer_id".to_string(),
        columns: vec!["total_amount".to_string(), "segment".to_string()],
        rows,
    })
}

/// Per-customer behavioral metrics, rows ordered by customer id.
///
/// `days_active` is the whole-day span between first and last transaction.
/// `frequency` is transactions per active day, falling back to the raw
/// transaction count for single-day customers.
pub fn customer_metrics(table: &Table) -> Result<ResultTable, AnalysisError> {
    ensure_nonempty(table)?;

    let mut partitions = table.partition_by(Column::CustomerId);
    partitions.sort_by(|a, b| a.0.cmp(&b.0));

    let rows = partitions
        .into_iter()
        .map(|(customer, indices)| {
            let amounts = table.amounts(&indices);
            let count = amounts.len();
            let total: f64 = amounts.iter().sum();

            let mut first = table.records()[indices[0]].date;
            let mut last = first;
            for &row in &indices[1..] {
                let d = table.records()[row].date;
                first = first.min(d);
                last = last.max(d);
            }
            let days_active = (last - first).num_days();
            let frequency = if days_active > 0 {
                count as f64 / days_active as f64
            } else {
                count as f64
            };

            let cells = vec![
                Scalar::Int(count as i64),
                Scalar::Float(total),
                Scalar::Float(mean(&amounts)),
                Scalar::Float(median(&amounts)),
                Scalar::Float(sample_std(&amounts)),
                Scalar::Date(first),
                Scalar::Date(last),
                Scalar::Int(days_active),
                Scalar::Float(frequency),
            ];
            (customer, cells)
        })
        .collect();

    Ok(ResultTable {
        index_name: "customer_id".to_string(),
        columns: vec![
            "transaction_count".to_string(),
            "total_amount".to_string(),
            "mean_amount".to_string(),
            "median_amount".to_string(),
            "amount_stddev".to_string(),
            "first_date".to_string(),
            "last_date".to_string(),
            "days_active".to_string(),
            "frequency".to_string(),
        ],
        rows,
    })
}

/// Pearson correlation between per-category spend across customers.
///
/// The pivot fills absent (customer, category) combinations with zero, so a
/// customer who never bought a category contributes 0 rather than a gap.
/// The diagonal is exactly 1.0; a zero-variance category yields NaN for
/// every off-diagonal pair involving it.
pub fn category_correlation(table: &Table) -> Result<ResultTable, AnalysisError> {
    ensure_nonempty(table)?;

    let categories: BTreeSet<String> = table
        .records()
        .iter()
        .map(|r| r.category.clone())
        .collect();
    let customers: BTreeSet<String> = table
        .records()
        .iter()
        .map(|r| r.customer_id.clone())
        .collect();
    let categories: Vec<String> = categories.into_iter().collect();
    let customers: Vec<String> = customers.into_iter().collect();

    let cat_index: BTreeMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let cust_index: BTreeMap<&str, usize> = customers
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    // Zero-filled pivot: customers x categories, cell = summed amount
    let mut pivot = Array2::<f64>::zeros((customers.len(), categories.len()));
    for record in table.records() {
        let row = cust_index[record.customer_id.as_str()];
        let col = cat_index[record.category.as_str()];
        pivot[[row, col]] += record.amount;
    }

    let n = categories.len();
    let columns: Vec<Vec<f64>> = (0..n).map(|j| pivot.column(j).to_vec()).collect();
    let mut matrix = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        matrix[[i, i]] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&columns[i], &columns[j]);
            matrix[[i, j]] = r;
            matrix[[j, i]] = r;
        }
    }

    let rows = categories
        .iter()
        .enumerate()
        .map(|(i, cat)| {
            let cells = (0..n).map(|j| Scalar::Float(matrix[[i, j]])).collect();
            (cat.clone(), cells)
        })
        .collect();

    Ok(ResultTable {
        index_name: "category".to_string(),
        columns: categories,
        rows,
    })
}

fn stat_columns(with_sum: bool) -> Vec<String> {
    let mut cols = vec![
        "count".to_string(),
        "mean".to_string(),
        "median".to_string(),
        "std".to_string(),
        "min".to_string(),
        "max".to_string(),
    ];
    if with_sum {
        cols.push("sum".to_string());
    }
    cols
}

fn stat_row(amounts: &[f64], with_sum: bool) -> Vec<Scalar> {
    let min = amounts.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = amounts.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let mut cells = vec![
        Scalar::Int(amounts.len() as i64),
        Scalar::Float(mean(amounts)),
        Scalar::Float(median(amounts)),
        Scalar::Float(sample_std(amounts)),
        Scalar::Float(min),
        Scalar::Float(max),
    ];
    if with_sum {
        cells.push(Scalar::Float(amounts.iter().sum()));
    }
    cells
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation (n - 1 denominator). NaN for fewer than two
/// values, matching the unbiased estimator being undefined there.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Pearson correlation coefficient. NaN when either input has zero variance.
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n == 0 || n != y.len() {
        return f64::NAN;
    }
    let mx = mean(x);
    let my = mean(y);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}
