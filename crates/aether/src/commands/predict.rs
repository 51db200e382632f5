//! One-shot sample and prediction

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::time::Duration;
use tabled::Tabled;

use super::App;
use crate::output::{
    color_prediction, format_gib, format_percent, print_json, print_table, print_warning,
    OutputFormat,
};
use aether_lib::collector::{MetricSampler, SystemSampler};
use aether_lib::predictor::{extract_features, Evaluation, OutputFormatter, Predictor};
use aether_lib::{FeatureVector, GaugeKind, MetricSample, Prediction};

/// CPU usage is a delta between refreshes, so the first refresh needs a gap
const CPU_PRIMING_DELAY: Duration = Duration::from_millis(500);

/// Row for the prediction table
#[derive(Tabled, Serialize)]
struct PredictionRow {
    #[tabled(rename = "Gauge")]
    gauge: String,
    #[tabled(rename = "Reading")]
    reading: String,
    #[tabled(rename = "Bucket")]
    bucket: u8,
    #[tabled(rename = "Predicted")]
    predicted: String,
    #[tabled(rename = "Adjusted")]
    adjusted: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
}

#[derive(Serialize)]
struct PredictReport<'a> {
    sample: &'a MetricSample,
    features: &'a FeatureVector,
    prediction: &'a Prediction,
    adjusted: &'a Prediction,
    degraded: bool,
    fallback: bool,
    model_version: &'a str,
}

/// Sample the host once and print readings, buckets and predictions
pub async fn predict_once(app: &App) -> Result<()> {
    let predictor = app.load_predictor().await;
    let pipeline = app.config.pipeline();

    let mut sampler = SystemSampler::new();
    tokio::time::sleep(CPU_PRIMING_DELAY).await;
    let sample = sampler.sample().context("Failed to sample host utilisation")?;
    let features = extract_features(&sample).context("Reading outside the bucketing range")?;
    let Evaluation {
        prediction,
        fallback,
    } = predictor.evaluate(&features);
    let adjusted = OutputFormatter::with_config(pipeline.output).adjust(&prediction);

    app.logger.log_prediction(
        "predict",
        sample.cpu_percent,
        sample.ram_percent,
        prediction.predicted_cpu,
        prediction.predicted_ram,
        predictor.model_version(),
    );

    if app.format == OutputFormat::Json {
        print_json(&PredictReport {
            sample: &sample,
            features: &features,
            prediction: &prediction,
            adjusted: &adjusted,
            degraded: predictor.is_degraded(),
            fallback,
            model_version: predictor.model_version(),
        });
        return Ok(());
    }

    let thresholds = pipeline.thresholds;
    let rows = vec![
        PredictionRow {
            gauge: GaugeKind::Cpu.to_string(),
            reading: format_percent(sample.cpu_percent),
            bucket: features.cpu_bucket,
            predicted: format!("{:.2}", prediction.predicted_cpu),
            adjusted: color_prediction(adjusted.predicted_cpu, thresholds.cpu_threshold),
            threshold: format!("{:.1}", thresholds.cpu_threshold),
        },
        PredictionRow {
            gauge: GaugeKind::Ram.to_string(),
            reading: format_percent(sample.ram_percent),
            bucket: features.ram_bucket,
            predicted: format!("{:.2}", prediction.predicted_ram),
            adjusted: color_prediction(adjusted.predicted_ram, thresholds.ram_threshold),
            threshold: format!("{:.1}", thresholds.ram_threshold),
        },
    ];

    println!("{}", "Usage prediction".bold());
    print_table(&rows, app.format, "No readings");
    println!(
        "Memory: {} used of {} ({} available)",
        format_gib(sample.used_memory_bytes),
        format_gib(sample.total_memory_bytes),
        format_gib(sample.available_memory_bytes)
    );
    println!("Model: {}", predictor.model_version());
    if predictor.is_degraded() {
        print_warning("No model artifact loaded, predictions come from the stand-in");
    } else if fallback {
        print_warning("The model failed on this reading, prediction comes from the stand-in");
    }
    Ok(())
}
