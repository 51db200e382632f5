//! Replays a fixed sequence of readings

use super::{MetricSampler, SampleError};
use crate::models::MetricSample;
use std::collections::VecDeque;

/// Sampler that yields pre-recorded (cpu, ram) percentages in order
///
/// Used for replaying captured readings and in tests. Values are passed
/// through unchecked so out-of-range readings reach the bucketizer.
#[derive(Debug, Default)]
pub struct ScriptedSampler {
    readings: VecDeque<(f64, f64)>,
    repeat_last: bool,
    last: Option<(f64, f64)>,
}

impl ScriptedSampler {
    pub fn new(readings: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            repeat_last: false,
            last: None,
        }
    }

    /// Keep returning the final reading once the script runs out
    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl MetricSampler for ScriptedSampler {
    fn sample(&mut self) -> Result<MetricSample, SampleError> {
        let reading = match self.readings.pop_front() {
            Some(r) => r,
            None if self.repeat_last => self.last.ok_or(SampleError::Exhausted)?,
            None => return Err(SampleError::Exhausted),
        };
        self.last = Some(reading);
        Ok(MetricSample::from_percentages(reading.0, reading.1))
    }
}
