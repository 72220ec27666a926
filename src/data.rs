//! Loading, validation and cleaning of transaction CSV files
//!
//! Everything the analysis engine assumes about its input is established
//! here: the four required columns exist, dates and amounts are typed, and
//! missing values are imputed (mean for amounts, most frequent value for
//! categories, a fixed placeholder for customer ids).

use crate::table::{Record, Table};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

/// Columns a transaction CSV must carry. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "category", "amount", "customer_id"];

/// Placeholder for rows with no customer id.
pub const UNKNOWN_CUSTOMER: &str = "UNKNOWN";

/// One CSV row before cleaning. All fields arrive as text; empty cells
/// count as missing.
#[derive(Debug, Deserialize)]
struct RawRecord {
    date: String,
    category: String,
    amount: String,
    customer_id: String,
}

/// Load a transaction CSV into a typed table.
///
/// Validates the header, parses dates and amounts, and fills missing
/// values. A file with a valid header but no data rows yields an empty
/// table; the engine rejects that at analysis time.
pub fn load_transactions(path: &str) -> crate::Result<Table> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open '{}'", path))?;

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .copied()
        .collect();
    if !missing.is_empty() {
        bail!("missing required columns: {}", missing.join(", "));
    }

    let mut raw_rows: Vec<RawRecord> = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        let raw: RawRecord = row.with_context(|| format!("malformed CSV row {}", i + 2))?;
        raw_rows.push(raw);
    }

    clean_rows(raw_rows)
}

fn clean_rows(raw_rows: Vec<RawRecord>) -> crate::Result<Table> {
    if raw_rows.is_empty() {
        return Ok(Table::default());
    }

    // Amounts first: unparseable or missing cells get the mean of the rest
    let parsed_amounts: Vec<Option<f64>> = raw_rows
        .iter()
        .map(|r| r.amount.trim().parse::<f64>().ok())
        .collect();
    let present: Vec<f64> = parsed_amounts.iter().filter_map(|a| *a).collect();
    if present.is_empty() {
        bail!("no numeric values in the 'amount' column");
    }
    let amount_mean = present.iter().sum::<f64>() / present.len() as f64;

    // Missing categories get the most frequent one
    let mut counts: HashMap<String, usize> = HashMap::new();
    for raw in &raw_rows {
        let category = raw.category.trim();
        if !category.is_empty() {
            *counts.entry(category.to_string()).or_insert(0) += 1;
        }
    }
    // Ties on frequency resolve to the lexicographically smallest category
    let mode = match counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
    {
        Some((category, _)) => category.clone(),
        None => bail!("no values in the 'category' column"),
    };

    let mut records = Vec::with_capacity(raw_rows.len());
    for (i, (raw, amount)) in raw_rows.iter().zip(parsed_amounts).enumerate() {
        let date = parse_date(raw.date.trim())
            .with_context(|| format!("invalid date '{}' in row {}", raw.date, i + 2))?;
        let category = if raw.category.trim().is_empty() {
            mode.clone()
        } else {
            raw.category.trim().to_string()
        };
        let customer_id = if raw.customer_id.trim().is_empty() {
            UNKNOWN_CUSTOMER.to_string()
        } else {
            raw.customer_id.trim().to_string()
        };
        records.push(Record {
            date,
            category,
            amount: amount.unwrap_or(amount_mean),
            customer_id,
        });
    }

    Ok(Table::new(records))
}

/// Parse a date cell. Accepts plain dates and datetime stamps, keeping day
/// granularity either way.
pub fn parse_date(value: &str) -> crate::Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.date());
        }
    }
    bail!("unrecognized date format: '{}'", value)
}

/// Rows whose date falls inside the (inclusive) range. `None` bounds are
/// open ends.
pub fn filter_by_date_range(
    table: &Table,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Table {
    let records = table
        .records()
        .iter()
        .filter(|r| start.map_or(true, |s| r.date >= s))
        .filter(|r| end.map_or(true, |e| r.date <= e))
        .cloned()
        .collect();
    Table::new(records)
}

pub fn filter_by_category(table: &Table, categories: &[String]) -> Table {
    let records = table
        .records()
        .iter()
        .filter(|r| categories.iter().any(|c| *c == r.category))
        .cloned()
        .collect();
    Table::new(records)
}

pub fn filter_by_customer(table: &Table, customers: &[String]) -> Table {
    let records = table
        .records()
        .iter()
        .filter(|r| customers.iter().any(|c| *c == r.customer_id))
        .cloned()
        .collect();
    Table::new(records)
}

/// Distinct categories in first-seen order.
pub fn unique_categories(table: &Table) -> Vec<String> {
    let mut seen = Vec::new();
    for record in table.records() {
        if !seen.contains(&record.category) {
            seen.push(record.category.clone());
        }
    }
    seen
}

/// Distinct customer ids in first-seen order.
pub fn unique_customers(table: &Table) -> Vec<String> {
    let mut seen = Vec::new();
    for record in table.records() {
        if !seen.contains(&record.customer_id) {
            seen.push(record.customer_id.clone());
        }
    }
    seen
}

/// Earliest and latest transaction dates, or `None` for an empty table.
pub fn date_range(table: &Table) -> Option<(NaiveDate, NaiveDate)> {
    let mut iter = table.records().iter().map(|r| r.date);
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,category,amount,customer_id").unwrap();
        writeln!(file, "2023-01-01,groceries,100.50,C001").unwrap();
        writeln!(file, "2023-01-02,electronics,250.75,C002").unwrap();
        writeln!(file, "2023-01-03,groceries,75.25,C001").unwrap();
        writeln!(file, "2023-01-04,clothing,125.00,C003").unwrap();
        file
    }

    #[test]
    fn test_load_transactions() {
        let file = create_test_csv();
        let table = load_transactions(file.path().to_str().unwrap()).unwrap();

        assert_eq!(table.len(), 4);
        let first = &table.records()[0];
        assert_eq!(first.category, "groceries");
        assert_eq!(first.amount, 100.50);
        assert_eq!(first.customer_id, "C001");
    }

    #[test]
    fn test_missing_columns_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,category,amount").unwrap();
        writeln!(file, "2023-01-01,groceries,100.50").unwrap();

        let result = load_transactions(file.path().to_str().unwrap());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("customer_id"));
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(load_transactions("/nonexistent/data.csv").is_err());
    }

    #[test]
    fn test_header_only_file_is_empty_table() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,category,amount,customer_id").unwrap();
        let table = load_transactions(file.path().to_str().unwrap()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_amount_imputed_with_mean() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,category,amount,customer_id").unwrap();
        writeln!(file, "2023-01-01,groceries,100.00,C001").unwrap();
        writeln!(file, "2023-01-02,groceries,,C001").unwrap();
        writeln!(file, "2023-01-03,groceries,200.00,C001").unwrap();

        let table = load_transactions(file.path().to_str().unwrap()).unwrap();
        assert_eq!(table.records()[1].amount, 150.00);
    }

    #[test]
    fn test_category_imputed_with_mode() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,category,amount,customer_id").unwrap();
        writeln!(file, "2023-01-01,groceries,10.00,C001").unwrap();
        writeln!(file, "2023-01-02,groceries,20.00,C001").unwrap();
        writeln!(file, "2023-01-03,clothing,30.00,C001").unwrap();
        writeln!(file, "2023-01-04,,40.00,C001").unwrap();

        let table = load_transactions(file.path().to_str().unwrap()).unwrap();
        assert_eq!(table.records()[3].category, "groceries");
    }

    #[test]
    fn test_missing_customer_gets_placeholder() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,category,amount,customer_id").unwrap();
        writeln!(file, "2023-01-01,groceries,10.00,").unwrap();

        let table = load_transactions(file.path().to_str().unwrap()).unwrap();
        assert_eq!(table.records()[0].customer_id, UNKNOWN_CUSTOMER);
    }

    #[test]
    fn test_invalid_date_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,category,amount,customer_id").unwrap();
        writeln!(file, "01/02/2023,groceries,10.00,C001").unwrap();

        assert!(load_transactions(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_datetime_stamps_truncate_to_day() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,category,amount,customer_id").unwrap();
        writeln!(file, "2023-01-01T08:26:00,groceries,10.00,C001").unwrap();

        let table = load_transactions(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            table.records()[0].date,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_filter_by_date_range() {
        let file = create_test_csv();
        let table = load_transactions(file.path().to_str().unwrap()).unwrap();

        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 3).unwrap();

        assert_eq!(filter_by_date_range(&table, Some(start), Some(end)).len(), 2);
        assert_eq!(filter_by_date_range(&table, Some(start), None).len(), 3);
        assert_eq!(filter_by_date_range(&table, None, Some(end)).len(), 3);
        assert_eq!(filter_by_date_range(&table, None, None).len(), 4);
    }

    #[test]
    fn test_filter_by_category_and_customer() {
        let file = create_test_csv();
        let table = load_transactions(file.path().to_str().unwrap()).unwrap();

        let groceries = filter_by_category(&table, &["groceries".to_string()]);
        assert_eq!(groceries.len(), 2);

        let c001 = filter_by_customer(&table, &["C001".to_string()]);
        assert_eq!(c001.len(), 2);
        assert!(c001.records().iter().all(|r| r.customer_id == "C001"));
    }

    #[test]
    fn test_uniques_and_date_range() {
        let file = create_test_csv();
        let table = load_transactions(file.path().to_str().unwrap()).unwrap();

        assert_eq!(
            unique_categories(&table),
            vec!["groceries", "electronics", "clothing"]
        );
        assert_eq!(unique_customers(&table), vec!["C001", "C002", "C003"]);

        let (min, max) = date_range(&table).unwrap();
        assert_eq!(min, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(max, NaiveDate::from_ymd_opt(2023, 1, 4).unwrap());
    }
}
