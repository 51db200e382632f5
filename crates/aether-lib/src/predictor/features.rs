//! Load bucketing and feature construction
//!
//! Readings are rounded to whole percentages (ties to even) before they are
//! bucketed and placed in the feature vector, which is how the shipped
//! artifacts were trained.

use crate::models::{FeatureVector, GaugeKind, MetricSample};
use thiserror::Error;

/// CPU load bands: inclusive (low, high, code)
pub const CPU_BANDS: [(u8, u8, u8); 3] = [(0, 30, 0), (31, 70, 1), (71, 100, 2)];

/// RAM load bands: inclusive (low, high, code)
pub const RAM_BANDS: [(u8, u8, u8); 3] = [(0, 50, 3), (51, 80, 4), (81, 100, 5)];

/// A reading fell outside [0, 100] and cannot be bucketed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BucketError {
    #[error("{axis} load value {value} is outside [0, 100]")]
    OutOfRange { axis: GaugeKind, value: f64 },
}

/// Bucket a CPU percentage into 0 (low), 1 (medium) or 2 (high)
pub fn bucket_cpu(percent: f64) -> Result<u8, BucketError> {
    bucket(GaugeKind::Cpu, percent, &CPU_BANDS)
}

/// Bucket a RAM percentage into 3 (low), 4 (medium) or 5 (high)
pub fn bucket_ram(percent: f64) -> Result<u8, BucketError> {
    bucket(GaugeKind::Ram, percent, &RAM_BANDS)
}

/// Build the model input for a sample
pub fn extract_features(sample: &MetricSample) -> Result<FeatureVector, BucketError> {
    let cpu_bucket = bucket_cpu(sample.cpu_percent)?;
    let ram_bucket = bucket_ram(sample.ram_percent)?;
    Ok(FeatureVector {
        cpu_percent: sample.cpu_percent.round_ties_even(),
        cpu_bucket,
        ram_percent: sample.ram_percent.round_ties_even(),
        ram_bucket,
    })
}

fn bucket(axis: GaugeKind, percent: f64, bands: &[(u8, u8, u8)]) -> Result<u8, BucketError> {
    // Range is checked on the rounded value; NaN matches no band
    let rounded = percent.round_ties_even();
    bands
        .iter()
        .find(|(low, high, _)| rounded >= f64::from(*low) && rounded <= f64::from(*high))
        .map(|(_, _, code)| *code)
        .ok_or(BucketError::OutOfRange {
            axis,
            value: percent,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_bands_cover_every_integer() {
        for p in 0..=30 {
            assert_eq!(bucket_cpu(f64::from(p)).unwrap(), 0, "p = {}", p);
        }
        for p in 31..=70 {
            assert_eq!(bucket_cpu(f64::from(p)).unwrap(), 1, "p = {}", p);
        }
        for p in 71..=100 {
            assert_eq!(bucket_cpu(f64::from(p)).unwrap(), 2, "p = {}", p);
        }
    }

    #[test]
    fn test_ram_bands_cover_every_integer() {
        for p in 0..=50 {
            assert_eq!(bucket_ram(f64::from(p)).unwrap(), 3, "p = {}", p);
        }
        for p in 51..=80 {
            assert_eq!(bucket_ram(f64::from(p)).unwrap(), 4, "p = {}", p);
        }
        for p in 81..=100 {
            assert_eq!(bucket_ram(f64::from(p)).unwrap(), 5, "p = {}", p);
        }
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(bucket_cpu(30.0).unwrap(), 0);
        assert_eq!(bucket_cpu(31.0).unwrap(), 1);
        assert_eq!(bucket_cpu(70.0).unwrap(), 1);
        assert_eq!(bucket_cpu(71.0).unwrap(), 2);
        assert_eq!(bucket_ram(50.0).unwrap(), 3);
        assert_eq!(bucket_ram(51.0).unwrap(), 4);
        assert_eq!(bucket_ram(80.0).unwrap(), 4);
        assert_eq!(bucket_ram(81.0).unwrap(), 5);
    }

    #[test]
    fn test_fractional_readings_round_first() {
        assert_eq!(bucket_cpu(30.4).unwrap(), 0);
        assert_eq!(bucket_cpu(30.5).unwrap(), 0);
        assert_eq!(bucket_cpu(30.6).unwrap(), 1);
        assert_eq!(bucket_ram(80.5).unwrap(), 4);
        assert_eq!(bucket_ram(80.51).unwrap(), 5);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(
            bucket_cpu(150.0),
            Err(BucketError::OutOfRange {
                axis: GaugeKind::Cpu,
                value: 150.0
            })
        );
        assert!(bucket_cpu(-0.6).is_err());
        assert!(bucket_ram(100.6).is_err());
        assert!(bucket_ram(f64::NAN).is_err());
        assert!(bucket_cpu(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rounding_noise_at_range_ends_is_accepted() {
        assert_eq!(bucket_cpu(100.3).unwrap(), 2);
        assert_eq!(bucket_ram(100.5).unwrap(), 5);
        assert_eq!(bucket_cpu(-0.4).unwrap(), 0);
        assert_eq!(bucket_ram(-0.2).unwrap(), 3);

        let fv = extract_features(&MetricSample::from_percentages(100.3, 50.0)).unwrap();
        assert_eq!(fv.cpu_percent, 100.0);
        assert_eq!(fv.cpu_bucket, 2);
    }

    #[test]
    fn test_extract_features() {
        let sample = MetricSample::from_percentages(42.3, 88.7);
        let fv = extract_features(&sample).unwrap();
        assert_eq!(fv.cpu_percent, 42.0);
        assert_eq!(fv.cpu_bucket, 1);
        assert_eq!(fv.ram_percent, 89.0);
        assert_eq!(fv.ram_bucket, 5);
    }

    #[test]
    fn test_extract_features_reports_failing_axis() {
        let sample = MetricSample::from_percentages(10.0, 150.0);
        let err = extract_features(&sample).unwrap_err();
        assert!(matches!(err, BucketError::OutOfRange { axis: GaugeKind::Ram, .. }));
        assert!(err.to_string().contains("RAM"));
    }
}
