//! Timer loop driving a gauge session
//!
//! Ticks execute inline between timer waits, so the next timer tick is not
//! awaited until the current tick finished; ticks never overlap. Missed
//! timer ticks are skipped rather than replayed in a burst.

use super::session::{GaugeSession, TickReport};
use crate::collector::MetricSampler;
use crate::health::HealthRegistry;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Default tick period for gauge views
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Report channel capacity; the surface drains it every tick
const REPORT_BUFFER: usize = 16;

/// Drives one [`GaugeSession`] until its view is closed
pub struct PipelineRunner<S> {
    session: GaugeSession<S>,
    tick_interval: Duration,
    max_ticks: Option<u64>,
    health: Option<HealthRegistry>,
    report_tx: mpsc::Sender<TickReport>,
}

impl<S: MetricSampler> PipelineRunner<S> {
    /// Create a runner and the receiver the surface reads reports from
    pub fn new(
        session: GaugeSession<S>,
        tick_interval: Duration,
    ) -> (Self, mpsc::Receiver<TickReport>) {
        let (report_tx, report_rx) = mpsc::channel(REPORT_BUFFER);
        let runner = Self {
            session,
            tick_interval,
            max_ticks: None,
            health: None,
            report_tx,
        };
        (runner, report_rx)
    }

    /// Close the view on its own after `ticks` ticks
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Feed tick outcomes into a health registry
    pub fn with_health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    /// Run until shutdown, the tick limit, or the surface dropping its receiver
    ///
    /// Returns the session so the caller decides when the view is torn down.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> GaugeSession<S> {
        info!(
            gauge = %self.session.gauge(),
            interval_ms = self.tick_interval.as_millis() as u64,
            max_ticks = ?self.max_ticks,
            "Starting gauge pipeline"
        );

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => {
                    info!("Shutting down gauge pipeline");
                    break;
                }
            }

            let report = self.session.tick();
            if let Some(health) = &self.health {
                health.record_tick(&report.outcome).await;
            }
            let limit_reached = self.max_ticks.is_some_and(|max| report.seq >= max);

            // A surface that stopped draining must not hold off shutdown
            tokio::select! {
                sent = self.report_tx.send(report) => {
                    if sent.is_err() {
                        info!("Gauge surface gone, stopping pipeline");
                        break;
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down gauge pipeline");
                    break;
                }
            }
            if limit_reached {
                info!(ticks = self.session.ticks_run(), "Tick limit reached");
                break;
            }
        }

        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ScriptedSampler;
    use crate::health::{components, ComponentStatus};
    use crate::models::GaugeKind;
    use crate::pipeline::{PipelineConfig, PipelineStage, TickOutcome};
    use crate::predictor::{ArtifactPredictor, Predictor};
    use std::sync::Arc;

    fn session(readings: Vec<(f64, f64)>) -> GaugeSession<ScriptedSampler> {
        let predictor: Arc<dyn Predictor> = Arc::new(ArtifactPredictor::new_without_model());
        GaugeSession::open(
            GaugeKind::Cpu,
            ScriptedSampler::new(readings).repeat_last(),
            predictor,
            &PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_runs_until_tick_limit() {
        let (runner, mut rx) = PipelineRunner::new(
            session(vec![(150.0, 10.0), (10.0, 10.0)]),
            Duration::from_millis(5),
        );
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let session = runner.with_max_ticks(3).run(shutdown_rx).await;
        assert_eq!(session.ticks_run(), 3);
        assert_eq!(session.stage(), PipelineStage::Idle);

        let mut reports = Vec::new();
        while let Ok(r) = rx.try_recv() {
            reports.push(r);
        }
        let seqs: Vec<u64> = reports.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert!(matches!(
            reports[0].outcome,
            TickOutcome::Skipped {
                stage: PipelineStage::Bucketing,
                ..
            }
        ));
        assert!(reports[1].is_completed());
        assert!(reports[2].is_completed());
        // Edge-triggered: only the first completed tick warns
        assert!(reports[1].warning().is_some());
        assert!(reports[2].warning().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_stops_runner() {
        let (runner, mut rx) =
            PipelineRunner::new(session(vec![(10.0, 10.0)]), Duration::from_millis(5));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(runner.run(shutdown_rx));
        let first = rx.recv().await.unwrap();
        assert_eq!(first.seq, 1);

        shutdown_tx.send(()).unwrap();
        let session = handle.await.unwrap();
        assert!(session.ticks_run() >= 1);
    }

    #[tokio::test]
    async fn test_shutdown_while_surface_stalled() {
        let (runner, _rx) =
            PipelineRunner::new(session(vec![(10.0, 10.0)]), Duration::from_millis(1));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        // Nobody reads reports, so the buffer fills and the send blocks
        let handle = tokio::spawn(runner.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown_tx.send(()).unwrap();

        let session = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("runner ignored shutdown")
            .unwrap();
        assert!(session.ticks_run() > REPORT_BUFFER as u64);
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_runner() {
        let (runner, rx) =
            PipelineRunner::new(session(vec![(10.0, 10.0)]), Duration::from_millis(5));
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        drop(rx);

        let session = runner.run(shutdown_rx).await;
        assert_eq!(session.ticks_run(), 1);
    }

    #[tokio::test]
    async fn test_health_tracks_sampler() {
        let registry = HealthRegistry::new();
        registry.register(components::SAMPLER).await;

        let predictor: Arc<dyn Predictor> = Arc::new(ArtifactPredictor::new_without_model());
        let empty = GaugeSession::open(
            GaugeKind::Ram,
            ScriptedSampler::new([]),
            predictor,
            &PipelineConfig::default(),
        );
        let (runner, _rx) = PipelineRunner::new(empty, Duration::from_millis(5));
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        runner
            .with_health(registry.clone())
            .with_max_ticks(1)
            .run(shutdown_rx)
            .await;

        assert_eq!(
            registry.status_of(components::SAMPLER).await,
            Some(ComponentStatus::Degraded)
        );
    }
}
