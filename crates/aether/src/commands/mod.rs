//! Command implementations

pub mod predict;
pub mod users;
pub mod watch;

use crate::config::AppConfig;
use crate::output::OutputFormat;
use aether_lib::health::{components, HealthRegistry};
use aether_lib::predictor::{ArtifactPredictor, Predictor};
use aether_lib::{PipelineMetrics, StructuredLogger};
use std::sync::Arc;
use tracing::error;

/// Shared state handed to every command
pub struct App {
    pub config: AppConfig,
    pub format: OutputFormat,
    pub health: HealthRegistry,
    pub metrics: PipelineMetrics,
    pub logger: StructuredLogger,
}

impl App {
    /// Load the model artifact, running degraded when it is missing or unusable
    pub async fn load_predictor(&self) -> Arc<ArtifactPredictor> {
        let predictor = match ArtifactPredictor::load_or_degrade(&self.config.model_dir) {
            Ok(p) => p,
            Err(e) => {
                error!(
                    error = %e,
                    model_dir = %self.config.model_dir.display(),
                    "Model artifact unusable, continuing in degraded mode"
                );
                ArtifactPredictor::new_without_model()
            }
        };

        let degraded = predictor.is_degraded();
        if degraded {
            self.health
                .set_degraded(components::PREDICTOR, "No usable model artifact")
                .await;
        } else {
            self.health.set_healthy(components::PREDICTOR).await;
        }
        self.metrics.set_predictor_degraded(degraded);
        self.metrics
            .set_model_version(predictor.model_version(), predictor.regressor_kind());
        self.logger
            .log_model_loaded(predictor.model_version(), degraded);

        Arc::new(predictor)
    }
}
