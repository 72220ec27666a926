//! Chart rendering for analysis results using Plotters

use crate::table::{ResultSeries, ResultTable, Scalar};
use anyhow::bail;
use plotters::prelude::*;

const CHART_SIZE: (u32, u32) = (800, 600);

/// Vertical bar chart of a keyed series, one bar per point in series order.
pub fn bar_chart(series: &ResultSeries, output_path: &str, title: &str) -> crate::Result<()> {
    if series.is_empty() {
        bail!("nothing to plot: series is empty");
    }

    let values: Vec<f64> = series.points.iter().map(|(_, v)| *v).collect();
    let labels: Vec<String> = series.points.iter().map(|(k, _)| k.clone()).collect();
    let (y_min, y_max) = value_bounds(&values);
    let n = values.len();

    let root = BitMapBackend::new(output_path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..n as f64, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| {
            let idx = x.floor() as usize;
            labels.get(idx).cloned().unwrap_or_default()
        })
        .x_desc(series.index_name.clone())
        .y_desc(series.name.clone())
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, &value) in values.iter().enumerate() {
        let x0 = i as f64 + 0.1;
        let x1 = i as f64 + 0.9;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x0, 0.0), (x1, value)],
            BLUE.filled(),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{:.2}", value),
            (i as f64 + 0.5, value),
            ("sans-serif", 12),
        )))?;
    }

    root.present()?;
    println!("Bar chart saved to: {}", output_path);

    Ok(())
}

/// Line chart of one or more series over a shared categorical x axis.
///
/// Bucket labels land on the x axis in the order given; a legend appears
/// when more than one line is drawn.
pub fn line_chart(
    lines: &[(String, Vec<f64>)],
    x_labels: &[String],
    output_path: &str,
    title: &str,
) -> crate::Result<()> {
    if lines.is_empty() || x_labels.is_empty() {
        bail!("nothing to plot: no series data");
    }

    let all_values: Vec<f64> = lines.iter().flat_map(|(_, vs)| vs.iter().copied()).collect();
    let (y_min, y_max) = value_bounds(&all_values);
    let x_max = (x_labels.len().saturating_sub(1)).max(1) as f64;
    let labels: Vec<String> = x_labels.to_vec();

    let root = BitMapBackend::new(output_path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_labels(x_labels.len())
        .x_label_formatter(&|x| {
            let idx = x.round() as usize;
            labels.get(idx).cloned().unwrap_or_default()
        })
        .x_desc("date")
        .y_desc("amount")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (idx, (name, values)) in lines.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect();
        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(name.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 15, y)], color.stroke_width(2))
            });
        chart.draw_series(
            points
                .into_iter()
                .map(|p| Circle::new(p, 3, Palette99::pick(idx).to_rgba().filled())),
        )?;
    }

    if lines.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    println!("Line chart saved to: {}", output_path);

    Ok(())
}

/// Correlation matrix heatmap. Cells shade blue for negative through white
/// to red for positive; NaN cells render grey.
pub fn heatmap(matrix: &ResultTable, output_path: &str, title: &str) -> crate::Result<()> {
    if matrix.is_empty() {
        bail!("nothing to plot: matrix is empty");
    }

    let n_rows = matrix.rows.len();
    let n_cols = matrix.columns.len();
    let row_labels: Vec<String> = matrix.rows.iter().map(|(k, _)| k.clone()).collect();
    let col_labels = matrix.columns.clone();

    let root = BitMapBackend::new(output_path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..n_cols as f64, 0f64..n_rows as f64)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n_cols)
        .x_label_formatter(&|x| {
            let idx = x.floor() as usize;
            col_labels.get(idx).cloned().unwrap_or_default()
        })
        .y_labels(n_rows)
        .y_label_formatter(&|y| {
            // Row 0 is drawn at the top
            let idx = n_rows.saturating_sub(1 + y.floor() as usize);
            row_labels.get(idx).cloned().unwrap_or_default()
        })
        .draw()?;

    for (i, (_, cells)) in matrix.rows.iter().enumerate() {
        let y = (n_rows - 1 - i) as f64;
        for (j, cell) in cells.iter().enumerate() {
            let value = match cell {
                Scalar::Float(v) => *v,
                other => other.as_f64().unwrap_or(f64::NAN),
            };
            let x = j as f64;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x, y), (x + 1.0, y + 1.0)],
                correlation_color(value).filled(),
            )))?;
            let label = if value.is_nan() {
                "NaN".to_string()
            } else {
                format!("{:.2}", value)
            };
            chart.draw_series(std::iter::once(Text::new(
                label,
                (x + 0.35, y + 0.5),
                ("sans-serif", 14),
            )))?;
        }
    }

    root.present()?;
    println!("Heatmap saved to: {}", output_path);

    Ok(())
}

/// Map a correlation coefficient in [-1, 1] to a blue-white-red shade.
fn correlation_color(value: f64) -> RGBColor {
    if value.is_nan() {
        return RGBColor(180, 180, 180);
    }
    let v = value.clamp(-1.0, 1.0);
    if v >= 0.0 {
        let fade = (255.0 * (1.0 - v)) as u8;
        RGBColor(255, fade, fade)
    } else {
        let fade = (255.0 * (1.0 + v)) as u8;
        RGBColor(fade, fade, 255)
    }
}

/// Plot bounds with headroom, keeping zero inside the range so bars have a
/// stable baseline.
fn value_bounds(values: &[f64]) -> (f64, f64) {
    let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let upper = if max > 0.0 { max * 1.1 } else { 1.0 };
    let lower = if min < 0.0 { min * 1.1 } else { 0.0 };
    (lower, upper)
}
