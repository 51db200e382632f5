//! Core data models shared across the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single point-in-time reading of system utilisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub total_memory_bytes: u64,
    pub used_memory_bytes: u64,
    pub available_memory_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// Build a sample from percentages only (memory byte counts left at zero)
    pub fn from_percentages(cpu_percent: f64, ram_percent: f64) -> Self {
        Self {
            cpu_percent,
            ram_percent,
            total_memory_bytes: 0,
            used_memory_bytes: 0,
            available_memory_bytes: 0,
            timestamp: Utc::now(),
        }
    }
}

/// Model input: (cpu_percent, cpu_bucket, ram_percent, ram_bucket)
///
/// CPU buckets are coded 0..=2 and RAM buckets 3..=5. The disjoint codes are
/// what the shipped artifacts were trained on and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub cpu_percent: f64,
    pub cpu_bucket: u8,
    pub ram_percent: f64,
    pub ram_bucket: u8,
}

impl FeatureVector {
    pub const LEN: usize = 4;

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.cpu_percent,
            f64::from(self.cpu_bucket),
            self.ram_percent,
            f64::from(self.ram_bucket),
        ]
    }
}

/// Model output in original units. Not clamped to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_cpu: f64,
    pub predicted_ram: f64,
}

impl Prediction {
    pub fn new(predicted_cpu: f64, predicted_ram: f64) -> Self {
        Self {
            predicted_cpu,
            predicted_ram,
        }
    }
}

/// Which gauge view a session is rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeKind {
    Cpu,
    Ram,
}

impl fmt::Display for GaugeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GaugeKind::Cpu => write!(f, "CPU"),
            GaugeKind::Ram => write!(f, "RAM"),
        }
    }
}

impl std::str::FromStr for GaugeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(GaugeKind::Cpu),
            "ram" | "mem" | "memory" => Ok(GaugeKind::Ram),
            other => Err(format!("unknown gauge '{}', expected cpu or ram", other)),
        }
    }
}
