//! Sample → bucket → predict → notify, once per tick
//!
//! Each open gauge view owns a [`GaugeSession`]. A session runs every stage
//! of a tick to completion before returning, so a tick can never observe a
//! half-finished previous tick. [`PipelineRunner`] drives a session from a
//! fixed-period timer until the view is closed.

mod runner;
mod session;

pub use runner::{PipelineRunner, DEFAULT_TICK_INTERVAL};
pub use session::{GaugeSession, TickOutcome, TickReport};

use crate::notifier::ThresholdConfig;
use crate::predictor::OutputConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stages of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Idle,
    Sampling,
    Bucketing,
    Predicting,
    Notifying,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Sampling => "sampling",
            PipelineStage::Bucketing => "bucketing",
            PipelineStage::Predicting => "predicting",
            PipelineStage::Notifying => "notifying",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a gauge session
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Period between ticks
    pub tick_interval: Duration,
    /// Warning thresholds
    pub thresholds: ThresholdConfig,
    /// Offsets applied to predictions before threshold checks
    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            thresholds: ThresholdConfig::default(),
            output: OutputConfig::default(),
        }
    }
}
