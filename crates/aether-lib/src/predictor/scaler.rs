//! Affine feature/target scalers fit at training time

use serde::{Deserialize, Serialize};

/// A per-column affine transform shipped alongside the model
///
/// `Standard` mirrors a standardising scaler (`(x - mean) / scale`) and
/// `MinMax` a range scaler (`x * scale + min`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AffineScaler {
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl AffineScaler {
    /// Number of columns this scaler was fit on
    pub fn width(&self) -> usize {
        match self {
            AffineScaler::Standard { scale, .. } | AffineScaler::MinMax { scale, .. } => {
                scale.len()
            }
        }
    }

    /// Check shape and values; returns a reason on failure
    pub fn validate(&self, expected_width: usize) -> Result<(), String> {
        let (offset, scale) = self.parts();
        if offset.len() != expected_width || scale.len() != expected_width {
            return Err(format!(
                "expected {} columns, found offset={} scale={}",
                expected_width,
                offset.len(),
                scale.len()
            ));
        }
        if offset.iter().chain(scale).any(|v| !v.is_finite()) {
            return Err("non-finite scaler parameter".to_string());
        }
        if scale.iter().any(|s| *s == 0.0) {
            return Err("zero scale".to_string());
        }
        Ok(())
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        match self {
            AffineScaler::Standard { mean, scale } => values
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            AffineScaler::MinMax { min, scale } => values
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        }
    }

    pub fn inverse_transform(&self, values: &[f64]) -> Vec<f64> {
        match self {
            AffineScaler::Standard { mean, scale } => values
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
            AffineScaler::MinMax { min, scale } => values
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
        }
    }

    fn parts(&self) -> (&[f64], &[f64]) {
        match self {
            AffineScaler::Standard { mean, scale } => (mean, scale),
            AffineScaler::MinMax { min, scale } => (min, scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> AffineScaler {
        AffineScaler::Standard {
            mean: vec![50.0, 1.0],
            scale: vec![10.0, 0.5],
        }
    }

    #[test]
    fn test_standard_transform() {
        let out = standard().transform(&[60.0, 2.0]);
        assert_eq!(out, vec![1.0, 2.0]);
        let back = standard().inverse_transform(&out);
        assert_eq!(back, vec![60.0, 2.0]);
    }

    #[test]
    fn test_min_max_transform() {
        let scaler = AffineScaler::MinMax {
            min: vec![0.0, -0.5],
            scale: vec![0.01, 0.1],
        };
        let out = scaler.transform(&[50.0, 5.0]);
        assert!((out[0] - 0.5).abs() < 1e-12);
        assert!(out[1].abs() < 1e-12);
        let back = scaler.inverse_transform(&out);
        assert!((back[0] - 50.0).abs() < 1e-9);
        assert!((back[1] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(standard().validate(2).is_ok());
        assert!(standard().validate(4).unwrap_err().contains("expected 4"));

        let zero = AffineScaler::Standard {
            mean: vec![0.0],
            scale: vec![0.0],
        };
        assert_eq!(zero.validate(1).unwrap_err(), "zero scale");
    }

    #[test]
    fn test_deserialize_tagged() {
        let json = r#"{"kind":"min_max","min":[0.0],"scale":[2.0]}"#;
        let scaler: AffineScaler = serde_json::from_str(json).unwrap();
        assert_eq!(scaler.width(), 1);
        assert!(matches!(scaler, AffineScaler::MinMax { .. }));
    }
}
