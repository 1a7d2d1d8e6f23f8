use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use plotters::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::benchmark::benchmark_client::{BenchmarkError, CaseMeasurements};

/// One row of `api_test_results.csv`, one per API call.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRecord {
    pub test_case: String,
    pub timestamp: String,
    pub latency_ms: f64,
    pub prediction: String,
}

/// Latency statistics of one test case, in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub test_case: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
}

pub fn records_from_case(test_case: &str, measurements: &CaseMeasurements) -> Vec<BenchmarkRecord> {
    measurements
        .latencies_ms
        .iter()
        .zip(&measurements.predictions)
        .zip(&measurements.timestamps)
        .map(|((&latency_ms, prediction), timestamp)| BenchmarkRecord {
            test_case: test_case.to_string(),
            timestamp: timestamp.clone(),
            latency_ms,
            prediction: label_to_string(prediction),
        })
        .collect()
}

/// Renders a label the way it appears in the CSV: strings unquoted, everything else as JSON.
pub fn label_to_string(label: &Value) -> String {
    match label {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Most frequent label; the first one seen wins a tie.
pub fn most_common_prediction(predictions: &[Value]) -> Option<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for prediction in predictions {
        let label = label_to_string(prediction);
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (label, count) in counts {
        if best.as_ref().is_none_or(|(_, best_count)| count > *best_count) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). Undefined below two observations.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let squared: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (squared / (values.len() - 1) as f64).sqrt()
}

/// Groups latencies by test case, cases in ascending name order.
pub fn summarize(records: &[BenchmarkRecord]) -> Vec<LatencySummary> {
    let mut by_case: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        by_case.entry(record.test_case.as_str()).or_default().push(record.latency_ms);
    }

    by_case
        .into_iter()
        .map(|(test_case, latencies)| LatencySummary {
            test_case: test_case.to_string(),
            mean: mean(&latencies),
            min: latencies.iter().copied().fold(f64::INFINITY, f64::min),
            max: latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std: sample_std(&latencies),
        })
        .collect()
}

pub fn format_summary_table(summaries: &[LatencySummary]) -> String {
    let name_width = summaries
        .iter()
        .map(|s| s.test_case.len())
        .chain(std::iter::once("test_case".len()))
        .max()
        .unwrap_or(0);

    let mut table = String::new();
    let _ = writeln!(
        table,
        "{:<name_width$} {:>10} {:>10} {:>10} {:>10}",
        "test_case", "mean", "min", "max", "std"
    );
    for s in summaries {
        let _ = writeln!(
            table,
            "{:<name_width$} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
            s.test_case, s.mean, s.min, s.max, s.std
        );
    }
    table
}

pub fn write_csv(path: &Path, records: &[BenchmarkRecord]) -> Result<(), BenchmarkError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn plot_error<E: std::fmt::Display>(e: E) -> BenchmarkError {
    BenchmarkError::Plot(e.to_string())
}

/// Latencies beyond the whiskers of `quartiles`.
fn latency_outliers(latencies: &[f64], quartiles: &Quartiles) -> Vec<f64> {
    let [lower, _, _, _, upper] = quartiles.values();
    latencies
        .iter()
        .copied()
        .filter(|&latency| (latency as f32) < lower || (latency as f32) > upper)
        .collect()
}

/// y range holding every whisker and every latency. Starts at 0 unless a
/// lower whisker goes below it.
fn latency_axis_range(latencies: &[Vec<f64>], quartiles: &[Quartiles]) -> (f32, f32) {
    let (mut low, mut high) = (0f32, 0f32);
    for q in quartiles {
        let values = q.values();
        low = low.min(values[0]);
        high = high.max(values[4]);
    }
    for &latency in latencies.iter().flatten() {
        low = low.min(latency as f32);
        high = high.max(latency as f32);
    }
    (low * 1.1, high.max(1.0) * 1.1)
}

/// Box plot of latency per test case, cases in the order they were run.
/// Points past the whiskers are drawn as circles.
pub fn render_boxplot(path: &Path, records: &[BenchmarkRecord]) -> Result<(), BenchmarkError> {
    let mut case_names: Vec<String> = Vec::new();
    let mut latencies: Vec<Vec<f64>> = Vec::new();
    for record in records {
        match case_names.iter().position(|name| *name == record.test_case) {
            Some(i) => latencies[i].push(record.latency_ms),
            None => {
                case_names.push(record.test_case.clone());
                latencies.push(vec![record.latency_ms]);
            }
        }
    }
    if case_names.is_empty() {
        return Err(BenchmarkError::Plot("no latency records to plot".to_string()));
    }

    let quartiles: Vec<Quartiles> = latencies.iter().map(|l| Quartiles::new(l.as_slice())).collect();
    let (y_min, y_max) = latency_axis_range(&latencies, &quartiles);

    let root = SVGBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("API Latency Distribution by Test Case", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(case_names[..].into_segmented(), y_min..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Test Case")
        .y_desc("Latency (ms)")
        .x_label_formatter(&|value| match value {
            SegmentValue::Exact(name) | SegmentValue::CenterOf(name) => name.to_string(),
            SegmentValue::Last => String::new(),
        })
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(case_names.iter().zip(quartiles.iter()).map(|(name, q)| {
            Boxplot::new_vertical(SegmentValue::CenterOf(name), q)
                .width(40)
                .whisker_width(0.5)
                .style(BLUE)
        }))
        .map_err(plot_error)?;

    chart
        .draw_series(case_names.iter().zip(latencies.iter().zip(&quartiles)).flat_map(
            |(name, (case_latencies, q))| {
                latency_outliers(case_latencies, q).into_iter().map(move |latency| {
                    Circle::new((SegmentValue::CenterOf(name), latency as f32), 3, BLUE.filled())
                })
            },
        ))
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}
