//! Component health for the monitor
//!
//! Tracks whether the sampler and predictor are working
//! normally, running degraded (e.g. predictor without a model) or failing,
//! and whether startup has finished. Gauge sessions feed tick outcomes in
//! through [`HealthRegistry::record_tick`].

use crate::pipeline::{PipelineStage, TickOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component works with reduced fidelity
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentStatus::Healthy => write!(f, "healthy"),
            ComponentStatus::Degraded => write!(f, "degraded"),
            ComponentStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// The worst status among the components, healthy when there are none
    pub fn compute_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|h| h.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }

    /// Messages of every non-healthy component, keyed by component name
    pub fn problems(&self) -> Vec<(&str, &str)> {
        self.components
            .iter()
            .filter(|(_, h)| h.status != ComponentStatus::Healthy)
            .map(|(name, h)| (name.as_str(), h.message.as_deref().unwrap_or("")))
            .collect()
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const SAMPLER: &str = "sampler";
    pub const PREDICTOR: &str = "predictor";
}

/// Health registry shared between the app and its gauge sessions
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Current status of a single component
    pub async fn status_of(&self, name: &str) -> Option<ComponentStatus> {
        self.components.read().await.get(name).map(|h| h.status)
    }

    /// Fold a tick outcome into sampler and predictor health
    ///
    /// A failed sample marks the sampler degraded until the next successful
    /// one. Bucketing failures are about the reading, not the sampler, and
    /// leave it untouched. A loaded model that failed and fell back to the
    /// stand-in marks the predictor degraded until it predicts again.
    pub async fn record_tick(&self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Completed {
                degraded, fallback, ..
            } => {
                if self.status_of(components::SAMPLER).await != Some(ComponentStatus::Healthy) {
                    self.set_healthy(components::SAMPLER).await;
                }
                if !*degraded {
                    if *fallback {
                        self.set_degraded(components::PREDICTOR, "Inference failed, stand-in used")
                            .await;
                    } else if self.status_of(components::PREDICTOR).await
                        == Some(ComponentStatus::Degraded)
                    {
                        self.set_healthy(components::PREDICTOR).await;
                    }
                }
            }
            TickOutcome::Skipped {
                stage: PipelineStage::Sampling,
                reason,
            } => {
                self.set_degraded(components::SAMPLER, reason.clone()).await;
            }
            TickOutcome::Skipped { .. } => {}
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        let reason = if !ready {
            Some("Monitor not yet initialized".to_string())
        } else if health.status == ComponentStatus::Unhealthy {
            Some("A component is unhealthy".to_string())
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
