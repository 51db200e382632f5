//! Axis adjustments applied to raw predictions before threshold checks

use crate::models::Prediction;
use serde::{Deserialize, Serialize};

/// Offset added to the predicted CPU value before the threshold check
pub const DEFAULT_CPU_OFFSET: f64 = -2.0;

/// Offset added to the predicted RAM value before the threshold check
pub const DEFAULT_RAM_OFFSET: f64 = 2.0;

/// Per-axis offsets. The thresholds were tuned against offset values, so
/// these must travel together with the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub cpu_offset: f64,
    pub ram_offset: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cpu_offset: DEFAULT_CPU_OFFSET,
            ram_offset: DEFAULT_RAM_OFFSET,
        }
    }
}

/// Applies [`OutputConfig`] to raw predictions
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn adjust(&self, raw: &Prediction) -> Prediction {
        Prediction::new(
            raw.predicted_cpu + self.config.cpu_offset,
            raw.predicted_ram + self.config.ram_offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_offsets() {
        let adjusted = OutputFormatter::new().adjust(&Prediction::new(11.0, 21.0));
        assert_eq!(adjusted, Prediction::new(9.0, 23.0));
    }

    #[test]
    fn test_custom_offsets() {
        let formatter = OutputFormatter::with_config(OutputConfig {
            cpu_offset: 0.0,
            ram_offset: -1.5,
        });
        assert_eq!(formatter.adjust(&Prediction::new(3.0, 3.0)), Prediction::new(3.0, 1.5));
    }
}
