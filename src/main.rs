//! SpendLens: Transaction analysis CLI
//!
//! This is the main entrypoint that orchestrates data loading, filtering,
//! analysis dispatch, result printing and optional chart rendering.

use anyhow::Result;
use clap::Parser;
use spendlens::table::{ResultSeries, ResultTable, Table};
use spendlens::{analyzer, data, viz, Analysis, Args, Frequency};
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    if args.verbose {
        println!("SpendLens - Transaction Analysis");
        println!("================================\n");
    }

    let start_time = Instant::now();

    // Step 1: Load the data
    if args.verbose {
        println!("Step 1: Loading data");
        println!("  Input file: {}", args.input);
    }

    let load_start = Instant::now();
    let mut table = data::load_transactions(&args.input)?;
    println!("✓ Data loaded: {} rows", table.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }

    // Step 2: Apply filters
    let (start_date, end_date) = args.parse_date_filters()?;
    if start_date.is_some() || end_date.is_some() {
        table = data::filter_by_date_range(&table, start_date, end_date);
        println!("Filtered by date range: {} rows remaining", table.len());
    }
    if let Some(category) = &args.category {
        table = data::filter_by_category(&table, &[category.clone()]);
        println!("Filtered by category '{}': {} rows remaining", category, table.len());
    }
    if let Some(customer) = &args.customer {
        table = data::filter_by_customer(&table, &[customer.clone()]);
        println!("Filtered by customer '{}': {} rows remaining", customer, table.len());
    }

    // Step 3: Run the analysis
    if args.verbose {
        println!("\nStep 2: Running analysis ({:?})", args.analysis);
    }
    let analysis_start = Instant::now();
    run_analysis(&args, &table)?;
    if args.verbose {
        println!(
            "  Analysis time: {:.2}s",
            analysis_start.elapsed().as_secs_f64()
        );
    }

    if args.verbose {
        println!("\n=== Complete ===");
        println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}

/// Dispatch the requested analysis, print the result and render the chart
/// that fits it when an output path was given.
fn run_analysis(args: &Args, table: &Table) -> Result<()> {
    match args.analysis {
        Analysis::Summary => {
            let stats = match &args.groupby {
                Some(col) => analyzer::summary_by(table, col)?,
                None => analyzer::summary(table)?,
            };
            println!("\n=== Summary Statistics ===");
            print!("{}", stats);
            if args.groupby.is_some() {
                render_column_bars(args, &stats, "sum", "Total Amount by Group")?;
            } else if args.output.is_some() {
                println!("No chart for the ungrouped summary; use --groupby");
            }
        }
        Analysis::TimeSeries => {
            let freq = Frequency::from_token(&args.frequency)?;
            println!("\n=== Time Series ({}) ===", args.frequency);
            match &args.groupby {
                Some(col) => {
                    let result = analyzer::resample_by(table, freq, col)?;
                    print!("{}", result);
                    if let Some(path) = &args.output {
                        let x_labels: Vec<String> =
                            result.rows.iter().map(|(k, _)| k.clone()).collect();
                        let lines: Vec<(String, Vec<f64>)> = result
                            .columns
                            .iter()
                            .enumerate()
                            .map(|(col_idx, name)| {
                                let values = result
                                    .rows
                                    .iter()
                                    .map(|(_, cells)| cells[col_idx].as_f64().unwrap_or(0.0))
                                    .collect();
                                (name.clone(), values)
                            })
                            .collect();
                        viz::line_chart(&lines, &x_labels, path, "Spending Over Time")?;
                    }
                }
                None => {
                    let series = analyzer::resample(table, freq)?;
                    print!("{}", series);
                    if let Some(path) = &args.output {
                        let x_labels: Vec<String> =
                            series.points.iter().map(|(k, _)| k.clone()).collect();
                        let values: Vec<f64> = series.points.iter().map(|(_, v)| *v).collect();
                        let lines = vec![("amount".to_string(), values)];
                        viz::line_chart(&lines, &x_labels, path, "Spending Over Time")?;
                    }
                }
            }
        }
        Analysis::Distribution => {
            let by = args.groupby.as_deref().unwrap_or("category");
            let dist = analyzer::distribution(table, by)?;
            println!("\n=== Spending Distribution by {} ===", by);
            print!("{}", dist);
            render_series_bars(args, &dist, "Spending Distribution")?;
        }
        Analysis::TopCategories => {
            let top = analyzer::top_categories(table, args.n_top)?;
            println!("\n=== Top {} Spending Categories ===", args.n_top);
            print!("{}", top);
            render_series_bars(args, &top, "Top Spending Categories")?;
        }
        Analysis::CustomerSegments => {
            let segments = analyzer::segment_customers(table, args.segments)?;
            println!("\n=== Customer Segments ===");
            print!("{}", segments);
            render_column_bars(args, &segments, "total_amount", "Customer Spend by Rank")?;
        }
        Analysis::CustomerMetrics => {
            let metrics = analyzer::customer_metrics(table)?;
            println!("\n=== Customer Metrics ===");
            print!("{}", metrics);
            render_column_bars(args, &metrics, "total_amount", "Total Spend per Customer")?;
        }
        Analysis::Correlation => {
            let corr = analyzer::category_correlation(table)?;
            println!("\n=== Category Correlation ===");
            print!("{}", corr);
            if let Some(path) = &args.output {
                viz::heatmap(&corr, path, "Category Correlation")?;
            }
        }
    }
    Ok(())
}

fn render_series_bars(args: &Args, series: &ResultSeries, title: &str) -> Result<()> {
    if let Some(path) = &args.output {
        viz::bar_chart(series, path, title)?;
    }
    Ok(())
}

/// Bar-chart one numeric column of a result table against its row keys.
fn render_column_bars(args: &Args, table: &ResultTable, column: &str, title: &str) -> Result<()> {
    let Some(path) = &args.output else {
        return Ok(());
    };
    let col_idx = table
        .columns
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| anyhow::anyhow!("column '{}' missing from result", column))?;
    let series = ResultSeries {
        name: column.to_string(),
        index_name: table.index_name.clone(),
        points: table
            .rows
            .iter()
            .map(|(key, cells)| (key.clone(), cells[col_idx].as_f64().unwrap_or(0.0)))
            .collect(),
    };
    viz::bar_chart(&series, path, title)?;
    Ok(())
}
