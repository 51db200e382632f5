//! One open gauge view and its per-tick pipeline

use super::{PipelineConfig, PipelineStage};
use crate::collector::MetricSampler;
use crate::models::{FeatureVector, GaugeKind, MetricSample, Prediction};
use crate::notifier::{ThresholdNotifier, Warning, WarningState};
use crate::observability::{PipelineMetrics, StructuredLogger};
use crate::predictor::{extract_features, Evaluation, OutputFormatter, Predictor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

/// What happened during one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Every stage ran
    Completed {
        sample: MetricSample,
        features: FeatureVector,
        /// Model output in original units
        prediction: Prediction,
        /// Prediction after axis offsets; this is what thresholds see
        adjusted: Prediction,
        /// No model is loaded
        degraded: bool,
        /// The stand-in produced this tick's prediction
        fallback: bool,
        warning: Option<Warning>,
    },
    /// A stage failed; nothing from this tick carries over
    Skipped {
        stage: PipelineStage,
        reason: String,
    },
}

/// Report for one tick, sent to the surface rendering the gauge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub seq: u64,
    pub gauge: GaugeKind,
    pub outcome: TickOutcome,
    pub duration_us: u64,
}

impl TickReport {
    pub fn warning(&self) -> Option<&Warning> {
        match &self.outcome {
            TickOutcome::Completed { warning, .. } => warning.as_ref(),
            TickOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, TickOutcome::Completed { .. })
    }
}

/// A gauge view's pipeline state
///
/// The warning state lives here and nowhere else: closing the view drops
/// it, and opening the view again starts a fresh session.
pub struct GaugeSession<S> {
    gauge: GaugeKind,
    sampler: S,
    predictor: Arc<dyn Predictor>,
    notifier: ThresholdNotifier,
    formatter: OutputFormatter,
    warning: WarningState,
    stage: PipelineStage,
    ticks: u64,
    metrics: PipelineMetrics,
    logger: StructuredLogger,
}

impl<S: MetricSampler> GaugeSession<S> {
    /// Open a gauge view
    pub fn open(
        gauge: GaugeKind,
        sampler: S,
        predictor: Arc<dyn Predictor>,
        config: &PipelineConfig,
    ) -> Self {
        let metrics = PipelineMetrics::new();
        metrics.session_opened();
        info!(
            gauge = %gauge,
            degraded = predictor.is_degraded(),
            model_version = %predictor.model_version(),
            "Gauge view opened"
        );

        Self {
            gauge,
            sampler,
            predictor,
            notifier: ThresholdNotifier::new(config.thresholds),
            formatter: OutputFormatter::with_config(config.output),
            warning: WarningState::new(),
            stage: PipelineStage::Idle,
            ticks: 0,
            metrics,
            logger: StructuredLogger::new(format!("gauge-{}", gauge)),
        }
    }

    pub fn gauge(&self) -> GaugeKind {
        self.gauge
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn warning_state(&self) -> WarningState {
        self.warning
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks
    }

    pub fn is_degraded(&self) -> bool {
        self.predictor.is_degraded()
    }

    /// Run one full Sample → Bucket → Predict → Notify cycle
    pub fn tick(&mut self) -> TickReport {
        let start = Instant::now();
        self.ticks += 1;

        let outcome = match self.run_stages() {
            Ok(outcome) => {
                self.metrics.inc_ticks_completed();
                outcome
            }
            Err((stage, reason)) => {
                self.metrics.inc_ticks_skipped(stage.as_str());
                self.logger
                    .log_tick_skipped(&self.gauge.to_string(), stage.as_str(), &reason);
                TickOutcome::Skipped { stage, reason }
            }
        };
        self.enter(PipelineStage::Idle);

        TickReport {
            seq: self.ticks,
            gauge: self.gauge,
            outcome,
            duration_us: start.elapsed().as_micros() as u64,
        }
    }

    fn run_stages(&mut self) -> Result<TickOutcome, (PipelineStage, String)> {
        self.enter(PipelineStage::Sampling);
        let started = Instant::now();
        let sample = self
            .sampler
            .sample()
            .map_err(|e| (PipelineStage::Sampling, e.to_string()))?;
        self.metrics
            .observe_sample_latency(started.elapsed().as_secs_f64());

        self.enter(PipelineStage::Bucketing);
        let features =
            extract_features(&sample).map_err(|e| (PipelineStage::Bucketing, e.to_string()))?;

        self.enter(PipelineStage::Predicting);
        let started = Instant::now();
        let Evaluation {
            prediction,
            fallback,
        } = self.predictor.evaluate(&features);
        self.metrics
            .observe_prediction_latency(started.elapsed().as_secs_f64());
        let degraded = self.predictor.is_degraded();
        if fallback && !degraded {
            self.metrics.inc_inference_fallbacks();
        }
        let adjusted = self.formatter.adjust(&prediction);

        self.enter(PipelineStage::Notifying);
        let value = match self.gauge {
            GaugeKind::Cpu => adjusted.predicted_cpu,
            GaugeKind::Ram => adjusted.predicted_ram,
        };
        let decision = self.notifier.check(self.gauge, value, &mut self.warning);
        debug!(gauge = %self.gauge, value, decision = ?decision, "Threshold checked");
        let warning = decision.into_warning();
        if let Some(w) = &warning {
            self.metrics.inc_warnings_fired(&w.gauge.to_string());
            self.logger
                .log_warning(&w.gauge.to_string(), w.value, w.threshold);
        }

        self.logger.log_prediction(
            &self.gauge.to_string(),
            sample.cpu_percent,
            sample.ram_percent,
            prediction.predicted_cpu,
            prediction.predicted_ram,
            self.predictor.model_version(),
        );

        Ok(TickOutcome::Completed {
            sample,
            features,
            prediction,
            adjusted,
            degraded,
            fallback,
            warning,
        })
    }

    fn enter(&mut self, stage: PipelineStage) {
        trace!(gauge = %self.gauge, from = %self.stage, to = %stage, "Pipeline stage");
        self.stage = stage;
    }
}

impl<S> Drop for GaugeSession<S> {
    fn drop(&mut self) {
        self.metrics.session_closed();
        info!(gauge = %self.gauge, ticks = self.ticks, "Gauge view closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ScriptedSampler;
    use crate::predictor::{ArtifactPredictor, FallbackPredictor, LinearModel, ModelArtifact};

    fn degraded() -> Arc<dyn Predictor> {
        Arc::new(ArtifactPredictor::new_without_model())
    }

    fn open(gauge: GaugeKind, readings: Vec<(f64, f64)>) -> GaugeSession<ScriptedSampler> {
        GaugeSession::open(
            gauge,
            ScriptedSampler::new(readings),
            degraded(),
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn test_degraded_tick_completes() {
        let mut session = open(GaugeKind::Cpu, vec![(10.0, 20.0)]);
        let report = session.tick();

        assert_eq!(report.seq, 1);
        match report.outcome {
            TickOutcome::Completed {
                prediction,
                adjusted,
                degraded,
                ..
            } => {
                assert_eq!(prediction, Prediction::new(11.0, 21.0));
                assert_eq!(adjusted, Prediction::new(9.0, 23.0));
                assert!(degraded);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(session.stage(), PipelineStage::Idle);
    }

    #[test]
    fn test_out_of_range_tick_does_not_block_next() {
        let mut session = open(GaugeKind::Cpu, vec![(150.0, 20.0), (10.0, 20.0)]);

        let first = session.tick();
        match &first.outcome {
            TickOutcome::Skipped { stage, reason } => {
                assert_eq!(*stage, PipelineStage::Bucketing);
                assert!(reason.contains("150"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(session.stage(), PipelineStage::Idle);
        assert!(!session.warning_state().is_shown());

        let second = session.tick();
        assert!(second.is_completed());
        assert!(second.warning().is_some());
    }

    #[test]
    fn test_sampler_failure_is_skipped() {
        let mut session = open(GaugeKind::Ram, vec![]);
        let report = session.tick();
        assert!(matches!(
            report.outcome,
            TickOutcome::Skipped {
                stage: PipelineStage::Sampling,
                ..
            }
        ));
    }

    #[test]
    fn test_warning_fires_once_per_view() {
        // Stand-in predicts reading + 1, offset -2: adjusted cpu is 6, 7, 8
        let readings = vec![(7.0, 0.0), (8.0, 0.0), (9.0, 0.0)];
        let mut session = open(GaugeKind::Cpu, readings.clone());
        let fired: Vec<bool> = (0..3).map(|_| session.tick().warning().is_some()).collect();
        assert_eq!(fired, vec![true, false, false]);
        drop(session);

        let mut reopened = open(GaugeKind::Cpu, readings);
        assert!(reopened.tick().warning().is_some());
    }

    #[test]
    fn test_gauge_checks_its_own_axis() {
        // adjusted cpu = 1 - 2 + 1 = 0 (clear); adjusted ram = 50 + 1 + 2 = 53 (breach)
        let mut cpu = open(GaugeKind::Cpu, vec![(1.0, 50.0)]);
        assert!(cpu.tick().warning().is_none());

        let mut ram = open(GaugeKind::Ram, vec![(1.0, 50.0)]);
        let report = ram.tick();
        let warning = report.warning().unwrap();
        assert_eq!(warning.gauge, GaugeKind::Ram);
        assert_eq!(warning.value, 53.0);
    }

    #[test]
    fn test_loaded_model_drives_warnings() {
        // Model predicts a flat 3.0 on both axes
        let model = LinearModel {
            coef: vec![vec![0.0; 4], vec![0.0; 4]],
            intercept: vec![3.0, 3.0],
        };
        let artifact = ModelArtifact::from_linear(model, None, None, "flat").unwrap();
        let predictor: Arc<dyn Predictor> = Arc::new(ArtifactPredictor::new(artifact));

        let mut cpu = GaugeSession::open(
            GaugeKind::Cpu,
            ScriptedSampler::new([(95.0, 95.0)]),
            predictor.clone(),
            &PipelineConfig::default(),
        );
        let report = cpu.tick();
        assert!(report.warning().is_none());
        assert!(!cpu.is_degraded());

        // ram: 3 + 2 = 5, below 11
        let mut ram = GaugeSession::open(
            GaugeKind::Ram,
            ScriptedSampler::new([(95.0, 95.0)]),
            predictor,
            &PipelineConfig::default(),
        );
        assert!(ram.tick().warning().is_none());
    }

    /// Model that is loaded but fails on every input
    struct FailingModel;

    impl Predictor for FailingModel {
        fn evaluate(&self, features: &FeatureVector) -> Evaluation {
            FallbackPredictor::evaluate(features)
        }

        fn is_degraded(&self) -> bool {
            false
        }

        fn model_version(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_runtime_fallback_is_reported() {
        let mut session = GaugeSession::open(
            GaugeKind::Cpu,
            ScriptedSampler::new([(10.0, 20.0)]),
            Arc::new(FailingModel),
            &PipelineConfig::default(),
        );
        match session.tick().outcome {
            TickOutcome::Completed {
                prediction,
                degraded,
                fallback,
                ..
            } => {
                assert_eq!(prediction, Prediction::new(11.0, 21.0));
                assert!(!degraded);
                assert!(fallback);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_report_serializes_with_outcome_tag() {
        let mut session = open(GaugeKind::Cpu, vec![(150.0, 20.0)]);
        let json = serde_json::to_value(session.tick()).unwrap();
        assert_eq!(json["outcome"]["outcome"], "skipped");
        assert_eq!(json["outcome"]["stage"], "bucketing");
        assert_eq!(json["gauge"], "cpu");
    }
}
