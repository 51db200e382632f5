//! Host sampler backed by sysinfo

use super::{MetricSampler, SampleError};
use crate::models::MetricSample;
use chrono::Utc;
use sysinfo::System;
use tracing::debug;

/// Reads global CPU and memory utilisation through a persistent sysinfo handle
///
/// CPU usage is computed by sysinfo as the delta since the previous refresh,
/// so the handle must live across ticks. The first reading after creation is
/// relative to the primed refresh done in [`SystemSampler::new`].
pub struct SystemSampler {
    sys: System,
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self { sys }
    }
}

impl MetricSampler for SystemSampler {
    fn sample(&mut self) -> Result<MetricSample, SampleError> {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        if total == 0 {
            return Err(SampleError::NoMemoryInfo);
        }
        let available = self.sys.available_memory();
        let used = total.saturating_sub(available);

        let sample = MetricSample {
            cpu_percent: f64::from(self.sys.global_cpu_usage()),
            ram_percent: used as f64 / total as f64 * 100.0,
            total_memory_bytes: total,
            used_memory_bytes: used,
            available_memory_bytes: available,
            timestamp: Utc::now(),
        };

        debug!(
            cpu_percent = sample.cpu_percent,
            ram_percent = sample.ram_percent,
            "Sampled host utilisation"
        );
        Ok(sample)
    }
}
