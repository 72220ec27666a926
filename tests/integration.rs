//! Integration tests for SpendLens

use spendlens::table::Scalar;
use spendlens::{analyzer, data, AnalysisError, Frequency};
use std::io::Write;
use tempfile::NamedTempFile;

/// Create a test CSV file with sample transaction data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,category,amount,customer_id").unwrap();
    writeln!(file, "2023-01-01,groceries,100.50,C001").unwrap();
    writeln!(file, "2023-01-02,electronics,250.75,C002").unwrap();
    writeln!(file, "2023-01-03,groceries,75.25,C001").unwrap();
    writeln!(file, "2023-01-04,clothing,125.00,C003").unwrap();
    writeln!(file, "2023-01-05,electronics,300.00,C001").unwrap();
    writeln!(file, "2023-01-06,groceries,50.00,C002").unwrap();
    file
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_end_to_end_distribution() {
    let file = create_test_csv();
    let table = data::load_transactions(file.path().to_str().unwrap()).unwrap();
    assert_eq!(table.len(), 6);

    let dist = analyzer::distribution(&table, "category").unwrap();
    assert_eq!(dist.points.len(), 3);
    assert_eq!(dist.points[0].0, "electronics");
    assert!(close(dist.points[0].1, 550.75));
    assert_eq!(dist.points[1].0, "groceries");
    assert!(close(dist.points[1].1, 225.75));
    assert_eq!(dist.points[2].0, "clothing");
    assert!(close(dist.points[2].1, 125.00));
}

#[test]
fn test_end_to_end_customer_metrics() {
    let file = create_test_csv();
    let table = data::load_transactions(file.path().to_str().unwrap()).unwrap();

    let metrics = analyzer::customer_metrics(&table).unwrap();
    assert_eq!(metrics.len(), 3);

    assert_eq!(metrics.get("C001", "transaction_count"), Some(&Scalar::Int(3)));
    let total = metrics.get("C001", "total_amount").unwrap().as_f64().unwrap();
    assert!(close(total, 475.75));
    assert_eq!(metrics.get("C001", "days_active"), Some(&Scalar::Int(4)));
    let freq = metrics.get("C001", "frequency").unwrap().as_f64().unwrap();
    assert!(close(freq, 0.75));
}

#[test]
fn test_summary_reconciles_with_distribution() {
    let file = create_test_csv();
    let table = data::load_transactions(file.path().to_str().unwrap()).unwrap();

    let stats = analyzer::summary(&table).unwrap();
    assert_eq!(
        stats.get("amount", "count"),
        Some(&Scalar::Int(table.len() as i64))
    );

    let grouped = analyzer::summary_by(&table, "category").unwrap();
    let group_total: f64 = grouped
        .rows
        .iter()
        .map(|(key, _)| grouped.get(key, "sum").unwrap().as_f64().unwrap())
        .sum();
    let dist = analyzer::distribution(&table, "category").unwrap();
    let dist_total: f64 = dist.points.iter().map(|(_, v)| v).sum();
    assert!(close(group_total, dist_total));
    assert!(close(group_total, 901.50));
}

#[test]
fn test_filtered_pipeline() {
    let file = create_test_csv();
    let table = data::load_transactions(file.path().to_str().unwrap()).unwrap();

    let filtered = data::filter_by_customer(&table, &["C001".to_string()]);
    assert_eq!(filtered.len(), 3);

    let dist = analyzer::distribution(&filtered, "category").unwrap();
    assert_eq!(dist.points[0].0, "electronics");
    assert!(close(dist.points[0].1, 300.00));
}

#[test]
fn test_resample_consistency_across_frequencies() {
    let file = create_test_csv();
    let table = data::load_transactions(file.path().to_str().unwrap()).unwrap();

    let daily = analyzer::resample(&table, Frequency::Day).unwrap();
    let monthly = analyzer::resample(&table, Frequency::Month).unwrap();
    let yearly = analyzer::resample(&table, Frequency::Year).unwrap();

    assert_eq!(daily.len(), 6);
    assert_eq!(monthly.len(), 1);
    assert_eq!(yearly.len(), 1);

    let daily_total: f64 = daily.points.iter().map(|(_, v)| v).sum();
    assert!(close(daily_total, monthly.points[0].1));
    assert!(close(daily_total, yearly.points[0].1));
}

#[test]
fn test_segments_partition_all_customers() {
    let file = create_test_csv();
    let table = data::load_transactions(file.path().to_str().unwrap()).unwrap();

    let segments = analyzer::segment_customers(&table, 2).unwrap();
    assert_eq!(segments.len(), 3);

    // No duplicates, no omissions
    let mut customers: Vec<&str> = segments.rows.iter().map(|(k, _)| k.as_str()).collect();
    customers.sort();
    assert_eq!(customers, vec!["C001", "C002", "C003"]);

    // Highest spender is in Segment 1
    assert_eq!(
        segments.get("C001", "segment"),
        Some(&Scalar::Text("Segment 1".to_string()))
    );
}

#[test]
fn test_correlation_matrix_properties() {
    let file = create_test_csv();
    let table = data::load_transactions(file.path().to_str().unwrap()).unwrap();

    let corr = analyzer::category_correlation(&table).unwrap();
    assert_eq!(corr.len(), 3);

    for (key, _) in &corr.rows {
        assert_eq!(corr.get(key, key), Some(&Scalar::Float(1.0)));
        for other in &corr.columns {
            let a = corr.get(key, other).unwrap().as_f64().unwrap();
            let b = corr.get(other, key).unwrap().as_f64().unwrap();
            assert!((a.is_nan() && b.is_nan()) || close(a, b));
        }
    }
}

#[test]
fn test_error_handling_empty_and_unknown_column() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,category,amount,customer_id").unwrap();
    let empty = data::load_transactions(file.path().to_str().unwrap()).unwrap();
    assert!(empty.is_empty());

    let err = analyzer::summary(&empty).unwrap_err();
    assert_eq!(err, AnalysisError::EmptyData);

    let file = create_test_csv();
    let table = data::load_transactions(file.path().to_str().unwrap()).unwrap();
    let err = analyzer::distribution(&table, "region").unwrap_err();
    assert_eq!(err, AnalysisError::Schema("region".to_string()));
}

#[test]
fn test_chart_rendering_pipeline() {
    let file = create_test_csv();
    let table = data::load_transactions(file.path().to_str().unwrap()).unwrap();
    let temp_dir = tempfile::tempdir().unwrap();

    let dist = analyzer::distribution(&table, "category").unwrap();
    let bar_path = temp_dir.path().join("dist.png");
    spendlens::viz::bar_chart(&dist, bar_path.to_str().unwrap(), "Distribution").unwrap();
    assert!(bar_path.exists());

    let corr = analyzer::category_correlation(&table).unwrap();
    let heat_path = temp_dir.path().join("corr.png");
    spendlens::viz::heatmap(&corr, heat_path.to_str().unwrap(), "Correlation").unwrap();
    assert!(heat_path.exists());
}
