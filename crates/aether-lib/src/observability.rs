//! Observability infrastructure for the monitor
//!
//! Provides:
//! - Prometheus metrics (sampling latency, prediction latency, tick outcomes,
//!   warnings, degraded mode, model version)
//! - Structured logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PipelineMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct PipelineMetricsInner {
    sample_latency_seconds: Histogram,
    prediction_latency_seconds: Histogram,
    ticks_completed: IntCounter,
    ticks_skipped: IntCounterVec,
    warnings_fired: IntCounterVec,
    inference_fallbacks: IntCounter,
    predictor_degraded: IntGauge,
    model_version_info: GaugeVec,
    open_sessions: IntGauge,
}

impl PipelineMetricsInner {
    fn new() -> Self {
        Self {
            sample_latency_seconds: register_histogram!(
                "aether_sample_latency_seconds",
                "Time spent reading CPU and memory utilisation",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register sample_latency_seconds"),

            prediction_latency_seconds: register_histogram!(
                "aether_prediction_latency_seconds",
                "Time spent running the usage prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            ticks_completed: register_int_counter!(
                "aether_ticks_completed_total",
                "Pipeline ticks that ran every stage"
            )
            .expect("Failed to register ticks_completed"),

            ticks_skipped: register_int_counter_vec!(
                "aether_ticks_skipped_total",
                "Pipeline ticks abandoned, by failing stage",
                &["stage"]
            )
            .expect("Failed to register ticks_skipped"),

            warnings_fired: register_int_counter_vec!(
                "aether_warnings_fired_total",
                "Threshold warnings shown, by gauge",
                &["gauge"]
            )
            .expect("Failed to register warnings_fired"),

            inference_fallbacks: register_int_counter!(
                "aether_inference_fallbacks_total",
                "Predictions served by the stand-in after a model error"
            )
            .expect("Failed to register inference_fallbacks"),

            predictor_degraded: register_int_gauge!(
                "aether_predictor_degraded",
                "1 when predictions use the stand-in instead of a model"
            )
            .expect("Failed to register predictor_degraded"),

            model_version_info: register_gauge_vec!(
                "aether_model_version_info",
                "Information about the currently loaded model artifact",
                &["version", "regressor"]
            )
            .expect("Failed to register model_version_info"),

            open_sessions: register_int_gauge!(
                "aether_open_gauge_sessions",
                "Number of gauge views currently open"
            )
            .expect("Failed to register open_sessions"),
        }
    }
}

/// Pipeline metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PipelineMetrics {
    _private: (),
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PipelineMetricsInner {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new)
    }

    pub fn observe_sample_latency(&self, duration_secs: f64) {
        self.inner().sample_latency_seconds.observe(duration_secs);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_ticks_completed(&self) {
        self.inner().ticks_completed.inc();
    }

    pub fn inc_ticks_skipped(&self, stage: &str) {
        self.inner().ticks_skipped.with_label_values(&[stage]).inc();
    }

    pub fn inc_warnings_fired(&self, gauge: &str) {
        self.inner().warnings_fired.with_label_values(&[gauge]).inc();
    }

    pub fn inc_inference_fallbacks(&self) {
        self.inner().inference_fallbacks.inc();
    }

    pub fn set_predictor_degraded(&self, degraded: bool) {
        self.inner().predictor_degraded.set(i64::from(degraded));
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str, regressor: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, regressor])
            .set(1.0);
    }

    pub fn session_opened(&self) {
        self.inner().open_sessions.inc();
    }

    pub fn session_closed(&self) {
        self.inner().open_sessions.dec();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for monitor events
///
/// Provides consistent field names for predictions, warnings and
/// lifecycle events so JSON logs can be filtered by `event`.
#[derive(Clone)]
pub struct StructuredLogger {
    host: String,
}

impl StructuredLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Log a prediction for one tick
    pub fn log_prediction(
        &self,
        gauge: &str,
        cpu_percent: f64,
        ram_percent: f64,
        predicted_cpu: f64,
        predicted_ram: f64,
        model_version: &str,
    ) {
        info!(
            event = "prediction_generated",
            host = %self.host,
            gauge = %gauge,
            cpu_percent = cpu_percent,
            ram_percent = ram_percent,
            predicted_cpu = predicted_cpu,
            predicted_ram = predicted_ram,
            model_version = %model_version,
            "Generated usage prediction"
        );
    }

    /// Log a fired threshold warning
    pub fn log_warning(&self, gauge: &str, value: f64, threshold: f64) {
        warn!(
            event = "prediction_warning",
            host = %self.host,
            gauge = %gauge,
            value = value,
            threshold = threshold,
            "Predicted usage crossed threshold"
        );
    }

    /// Log a skipped tick
    pub fn log_tick_skipped(&self, gauge: &str, stage: &str, reason: &str) {
        warn!(
            event = "tick_skipped",
            host = %self.host,
            gauge = %gauge,
            stage = %stage,
            reason = %reason,
            "Pipeline tick skipped"
        );
    }

    /// Log the artifact load result
    pub fn log_model_loaded(&self, version: &str, degraded: bool) {
        if degraded {
            warn!(
                event = "model_loaded",
                host = %self.host,
                model_version = %version,
                degraded = true,
                "No model artifact, predictions are degraded"
            );
        } else {
            info!(
                event = "model_loaded",
                host = %self.host,
                model_version = %version,
                degraded = false,
                "Model artifact ready"
            );
        }
    }

    /// Log a sign-in or sign-up
    pub fn log_user_event(&self, action: &str, email: &str, success: bool) {
        info!(
            event = "user_event",
            host = %self.host,
            action = %action,
            email = %email,
            success = success,
            "User store action"
        );
    }

    /// Log startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "app_started",
            host = %self.host,
            app_version = %version,
            "Aether started"
        );
    }

    /// Log shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "app_shutdown",
            host = %self.host,
            reason = %reason,
            "Aether shutting down"
        );
    }
}
