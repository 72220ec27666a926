//! Typed in-memory table of transaction records and the derived result types
//!
//! The analysis engine operates on a `Table`: an ordered, immutable sequence
//! of `Record`s sharing one fixed schema. Grouping produces index partitions
//! over the row storage rather than copying rows, and results come back as
//! either a `ResultSeries` (key -> scalar) or a `ResultTable` (key -> row of
//! typed cells).

use crate::error::AnalysisError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

/// A single transaction. Immutable once loaded; the engine only reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub customer_id: String,
}

/// The closed column set of the transaction schema.
///
/// Column references from callers are resolved by name through
/// [`Column::from_name`]; there are no positional fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Category,
    Amount,
    CustomerId,
}

impl Column {
    /// Resolve a column by its schema name.
    pub fn from_name(name: &str) -> Result<Column, AnalysisError> {
        match name {
            "date" => Ok(Column::Date),
            "category" => Ok(Column::Category),
            "amount" => Ok(Column::Amount),
            "customer_id" => Ok(Column::CustomerId),
            other => Err(AnalysisError::Schema(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Category => "category",
            Column::Amount => "amount",
            Column::CustomerId => "customer_id",
        }
    }
}

/// An ordered sequence of records sharing the transaction schema.
#[derive(Debug, Clone, Default)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        Table { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The grouping key a record exposes for the given column.
    pub fn key_at(&self, row: usize, col: Column) -> String {
        let r = &self.records[row];
        match col {
            Column::Date => r.date.format("%Y-%m-%d").to_string(),
            Column::Category => r.category.clone(),
            Column::Amount => format!("{:.2}", r.amount),
            Column::CustomerId => r.customer_id.clone(),
        }
    }

    /// Partition row indices by the value of `col`.
    ///
    /// Partitions come back in first-seen key order and together cover every
    /// row exactly once. Callers that need natural key order sort afterwards.
    pub fn partition_by(&self, col: Column) -> Vec<(String, Vec<usize>)> {
        let mut partitions: Vec<(String, Vec<usize>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for row in 0..self.records.len() {
            let key = self.key_at(row, col);
            match positions.get(&key) {
                Some(&pos) => partitions[pos].1.push(row),
                None => {
                    positions.insert(key.clone(), partitions.len());
                    partitions.push((key, vec![row]));
                }
            }
        }
        partitions
    }

    /// Amounts for a set of row indices.
    pub fn amounts(&self, rows: &[usize]) -> Vec<f64> {
        rows.iter().map(|&i| self.records[i].amount).collect()
    }
}

/// One typed output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Float(f64),
    Int(i64),
    Date(NaiveDate),
    Text(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(v) => Some(*v),
            Scalar::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Float(v) if v.is_nan() => write!(f, "NaN"),
            Scalar::Float(v) => write!(f, "{:.2}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A keyed sequence of scalar values, e.g. a spend distribution or one
/// resampled time series. Point order is meaningful and preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSeries {
    pub name: String,
    pub index_name: String,
    pub points: Vec<(String, f64)>,
}

impl ResultSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.points.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

impl fmt::Display for ResultSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_width = self
            .points
            .iter()
            .map(|(k, _)| k.len())
            .max()
            .unwrap_or(0)
            .max(self.index_name.len());
        writeln!(f, "{:key_width$} | {}", self.index_name, self.name)?;
        for (key, value) in &self.points {
            writeln!(f, "{:key_width$} | {:.2}", key, value)?;
        }
        Ok(())
    }
}

/// A table of derived rows keyed by a group value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<Scalar>)>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell lookup by row key and column name.
    pub fn get(&self, row_key: &str, column: &str) -> Option<&Scalar> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|(k, _)| k == row_key)
            .and_then(|(_, cells)| cells.get(col))
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        let mut key_width = self.index_name.len();
        let rendered: Vec<(String, Vec<String>)> = self
            .rows
            .iter()
            .map(|(key, cells)| {
                key_width = key_width.max(key.len());
                let cells: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
                for (i, cell) in cells.iter().enumerate() {
                    if i < widths.len() {
                        widths[i] = widths[i].max(cell.len());
                    }
                }
                (key.clone(), cells)
            })
            .collect();

        write!(f, "{:key_width$}", self.index_name)?;
        for (col, &w) in self.columns.iter().zip(widths.iter()) {
            write!(f, " | {:>w$}", col)?;
        }
        writeln!(f)?;
        for (key, cells) in &rendered {
            write!(f, "{:key_width$}", key)?;
            for (cell, &w) in cells.iter().zip(widths.iter()) {
                write!(f, " | {:>w$}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
