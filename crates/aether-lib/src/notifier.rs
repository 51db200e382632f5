//! Threshold warnings for predicted usage
//!
//! Warnings are edge-triggered per gauge session: the first breach fires,
//! every later breach in the same session is suppressed. Opening a new
//! session starts with a fresh [`WarningState`].

use crate::models::GaugeKind;
use serde::{Deserialize, Serialize};

/// Default CPU threshold, compared against the offset CPU prediction
pub const DEFAULT_CPU_THRESHOLD: f64 = 4.0;

/// Default RAM threshold, compared against the offset RAM prediction
pub const DEFAULT_RAM_THRESHOLD: f64 = 11.0;

/// Threshold configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub cpu_threshold: f64,
    pub ram_threshold: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: DEFAULT_CPU_THRESHOLD,
            ram_threshold: DEFAULT_RAM_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    pub fn threshold_for(&self, gauge: GaugeKind) -> f64 {
        match gauge {
            GaugeKind::Cpu => self.cpu_threshold,
            GaugeKind::Ram => self.ram_threshold,
        }
    }
}

/// Whether a gauge session has already shown its warning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarningState {
    shown: bool,
}

impl WarningState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }
}

/// A warning to surface to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub gauge: GaugeKind,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub timestamp: i64,
}

/// Outcome of a threshold check
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyDecision {
    /// First breach in this session
    Fire(Warning),
    /// Breach, but the session already showed its warning
    Suppressed,
    /// Value at or below the threshold
    Clear,
}

impl NotifyDecision {
    pub fn fired(&self) -> bool {
        matches!(self, NotifyDecision::Fire(_))
    }

    pub fn into_warning(self) -> Option<Warning> {
        match self {
            NotifyDecision::Fire(w) => Some(w),
            _ => None,
        }
    }
}

/// Compares predictions against fixed thresholds
#[derive(Debug, Clone, Default)]
pub struct ThresholdNotifier {
    config: ThresholdConfig,
}

impl ThresholdNotifier {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn check_cpu(&self, predicted_cpu: f64, state: &mut WarningState) -> NotifyDecision {
        self.check(GaugeKind::Cpu, predicted_cpu, state)
    }

    pub fn check_ram(&self, predicted_ram: f64, state: &mut WarningState) -> NotifyDecision {
        self.check(GaugeKind::Ram, predicted_ram, state)
    }

    pub fn check(&self, gauge: GaugeKind, value: f64, state: &mut WarningState) -> NotifyDecision {
        let threshold = self.config.threshold_for(gauge);
        if value.is_nan() || value <= threshold {
            return NotifyDecision::Clear;
        }
        if state.shown {
            return NotifyDecision::Suppressed;
        }
        state.shown = true;

        NotifyDecision::Fire(Warning {
            gauge,
            value,
            threshold,
            message: format!(
                "{} usage is predicted to rise ({:.2} > {:.2}). Consider closing heavy applications.",
                gauge, value, threshold
            ),
            timestamp: chrono::Utc::now().timestamp(),
        })
    }
}
