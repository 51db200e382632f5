//! Metric sampling from the host operating system
//!
//! Samplers return an instantaneous snapshot of CPU and memory utilisation.
//! They never block for an averaging window: the pipeline's tick cadence is
//! the averaging window.

mod scripted;
mod system;


pub use scripted::ScriptedSampler;
pub use system::SystemSampler;

use crate::models::MetricSample;
use thiserror::Error;

/// Errors produced while sampling
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("operating system reported zero total memory")]
    NoMemoryInfo,

    #[error("sampler has no more readings")]
    Exhausted,
}

/// Trait for metric sampling implementations
pub trait MetricSampler: Send {
    /// Take one non-blocking snapshot of CPU and memory utilisation
    fn sample(&mut self) -> Result<MetricSample, SampleError>;
}

impl<S: MetricSampler + ?Sized> MetricSampler for Box<S> {
    fn sample(&mut self) -> Result<MetricSample, SampleError> {
        (**self).sample()
    }
}
