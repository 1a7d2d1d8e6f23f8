use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::api_objects::PredictRequest;
use crate::benchmark::benchmark_report::{
    format_summary_table, mean, most_common_prediction, records_from_case, render_boxplot,
    summarize, write_csv, BenchmarkRecord, LatencySummary,
};
use crate::utils::BenchmarkConfig;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response from {0} has no prediction field")]
    MissingPrediction(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plot error: {0}")]
    Plot(String),
}

/// Per-call results of one test case, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct CaseMeasurements {
    pub latencies_ms: Vec<f64>,
    pub predictions: Vec<Value>,
    pub timestamps: Vec<String>,
}

/// Sends `text` to `url` `num_calls` times, one request after the other.
/// Latency covers the request and reading the whole response body.
pub async fn run_case(
    client: &Client,
    url: &str,
    text: &str,
    num_calls: usize,
) -> Result<CaseMeasurements, BenchmarkError> {
    let payload = PredictRequest { text };
    let mut measurements = CaseMeasurements {
        latencies_ms: Vec::with_capacity(num_calls),
        predictions: Vec::with_capacity(num_calls),
        timestamps: Vec::with_capacity(num_calls),
    };

    for call in 0..num_calls {
        let timestamp = Local::now();
        let start_time = Instant::now();
        let response = client.post(url).json(&payload).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        let latency_ms = start_time.elapsed().as_secs_f64() * 1000.0;

        let body: Value = serde_json::from_slice(&body)?;
        let prediction = body
            .get("prediction")
            .cloned()
            .ok_or_else(|| BenchmarkError::MissingPrediction(url.to_string()))?;
        debug!(call, latency_ms, %prediction, "Prediction call finished");

        measurements.latencies_ms.push(latency_ms);
        measurements.predictions.push(prediction);
        measurements.timestamps.push(timestamp.format(TIMESTAMP_FORMAT).to_string());
    }

    Ok(measurements)
}

/// Hidden sibling of `path` that output is written to before being moved into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut file_name = OsString::from(".");
    file_name.push(path.file_name().unwrap_or_default());
    file_name.push(".partial");
    path.with_file_name(file_name)
}

/// Writes the CSV and the plot next to their targets, then renames both.
/// On failure the staged files and any renamed output are removed.
fn save_outputs(config: &BenchmarkConfig, records: &[BenchmarkRecord]) -> Result<(), BenchmarkError> {
    let csv_staging = staging_path(&config.results_csv);
    let plot_staging = staging_path(&config.plot_path);

    let written = write_csv(&csv_staging, records)
        .and_then(|()| render_boxplot(&plot_staging, records))
        .and_then(|()| Ok(std::fs::rename(&csv_staging, &config.results_csv)?));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&csv_staging);
        let _ = std::fs::remove_file(&plot_staging);
        return Err(e);
    }
    info!(path = %config.results_csv.display(), rows = records.len(), "Saved results");

    if let Err(e) = std::fs::rename(&plot_staging, &config.plot_path) {
        let _ = std::fs::remove_file(&plot_staging);
        let _ = std::fs::remove_file(&config.results_csv);
        return Err(e.into());
    }
    info!(path = %config.plot_path.display(), "Saved latency box plot");
    Ok(())
}

/// Runs every case in order, then writes the CSV, the box plot and prints the
/// summary table. Nothing is written if any call or output fails.
pub async fn run_benchmark(
    client: &Client,
    config: &BenchmarkConfig,
    test_cases: &[(&str, &str)],
) -> Result<Vec<LatencySummary>, BenchmarkError> {
    info!(url = %config.url, num_calls = config.num_calls, cases = test_cases.len(), "Starting benchmark");
    let mut all_results: Vec<BenchmarkRecord> = Vec::new();

    for (case_name, text) in test_cases {
        println!("Testing {}...", case_name);
        let measurements = run_case(client, &config.url, text, config.num_calls).await?;

        let most_common = most_common_prediction(&measurements.predictions).unwrap_or_default();
        println!("Most common prediction: {}", most_common);
        println!("Average latency: {:.2}ms\n", mean(&measurements.latencies_ms));

        all_results.extend(records_from_case(case_name, &measurements));
    }

    save_outputs(config, &all_results)?;

    let summaries = summarize(&all_results);
    println!("\nSummary Statistics:");
    print!("{}", format_summary_table(&summaries));
    Ok(summaries)
}
