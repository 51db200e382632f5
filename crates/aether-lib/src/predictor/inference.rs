//! Prediction over a loaded artifact, with a degraded stand-in
//!
//! The artifact is immutable after load, so one predictor can be shared by
//! every gauge session without locking. Counters are atomics.

use super::artifact::{ArtifactError, ModelArtifact};
use super::{Evaluation, Predictor};
use crate::models::{FeatureVector, Prediction};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

/// Version label reported when no artifact is loaded
pub const DEGRADED_VERSION: &str = "fallback";

/// Predictor backed by a model artifact, or the stand-in when none is loaded
pub struct ArtifactPredictor {
    artifact: Option<ModelArtifact>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
    fallback_count: AtomicU64,
}

impl ArtifactPredictor {
    /// Create a predictor in degraded mode
    pub fn new_without_model() -> Self {
        Self::build(None)
    }

    /// Create a predictor around a loaded artifact
    pub fn new(artifact: ModelArtifact) -> Self {
        Self::build(Some(artifact))
    }

    /// Load the artifact directory; a missing artifact is an error here
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        ModelArtifact::load(dir).map(Self::new)
    }

    /// Load the artifact directory, degrading when it is missing
    ///
    /// A corrupt artifact is still an error: the caller decides whether to
    /// stop or to continue with [`ArtifactPredictor::new_without_model`].
    pub fn load_or_degrade(dir: &Path) -> Result<Self, ArtifactError> {
        match Self::load(dir) {
            Ok(p) => Ok(p),
            Err(ArtifactError::Missing { path }) => {
                warn!(
                    path = %path.display(),
                    "Model artifact missing, predictions run in degraded mode"
                );
                Ok(Self::new_without_model())
            }
            Err(e) => Err(e),
        }
    }

    fn build(artifact: Option<ModelArtifact>) -> Self {
        Self {
            artifact,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
            fallback_count: AtomicU64::new(0),
        }
    }

    /// Regressor backing the artifact, `"none"` in degraded mode
    pub fn regressor_kind(&self) -> &'static str {
        self.artifact
            .as_ref()
            .map(ModelArtifact::regressor_kind)
            .unwrap_or("none")
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
            fallbacks: self.fallback_count.load(Ordering::Relaxed),
        }
    }
}

impl Predictor for ArtifactPredictor {
    fn evaluate(&self, features: &FeatureVector) -> Evaluation {
        let artifact = match &self.artifact {
            Some(a) => a,
            None => return FallbackPredictor::evaluate(features),
        };

        let start = Instant::now();
        let result = artifact.run(features);
        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        match result {
            Ok([cpu, ram]) => Evaluation {
                prediction: Prediction::new(cpu, ram),
                fallback: false,
            },
            Err(e) => {
                self.fallback_count.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Inference error, using fallback");
                FallbackPredictor::evaluate(features)
            }
        }
    }

    fn is_degraded(&self) -> bool {
        self.artifact.is_none()
    }

    fn model_version(&self) -> &str {
        self.artifact
            .as_ref()
            .map(ModelArtifact::version)
            .unwrap_or(DEGRADED_VERSION)
    }
}

/// Inference statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
    pub fallbacks: u64,
}

/// Deterministic stand-in used when no model is available
pub struct FallbackPredictor;

impl FallbackPredictor {
    /// One percentage point above the current readings on each axis
    pub fn predict(features: &FeatureVector) -> Prediction {
        Prediction::new(features.cpu_percent + 1.0, features.ram_percent + 1.0)
    }

    pub(crate) fn evaluate(features: &FeatureVector) -> Evaluation {
        Evaluation {
            prediction: Self::predict(features),
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{AffineScaler, LinearModel};

    fn features(cpu: f64, ram: f64) -> FeatureVector {
        FeatureVector {
            cpu_percent: cpu,
            cpu_bucket: 0,
            ram_percent: ram,
            ram_bucket: 3,
        }
    }

    fn linear_predictor() -> ArtifactPredictor {
        let model = LinearModel {
            coef: vec![vec![0.9, 2.0, 0.0, 0.0], vec![0.0, 0.0, 1.1, -1.0]],
            intercept: vec![0.25, 0.75],
        };
        let x = AffineScaler::MinMax {
            min: vec![0.0; 4],
            scale: vec![0.01, 0.5, 0.01, 0.2],
        };
        let y = AffineScaler::MinMax {
            min: vec![0.0, 0.0],
            scale: vec![0.01, 0.01],
        };
        ArtifactPredictor::new(ModelArtifact::from_linear(model, Some(x), Some(y), "v-test").unwrap())
    }

    #[test]
    fn test_degraded_prediction() {
        let predictor = ArtifactPredictor::new_without_model();
        assert!(predictor.is_degraded());
        assert_eq!(predictor.model_version(), DEGRADED_VERSION);
        assert_eq!(predictor.predict(&features(10.0, 20.0)), Prediction::new(11.0, 21.0));
    }

    #[test]
    fn test_evaluation_marks_stand_in() {
        let input = features(10.0, 20.0);
        assert!(ArtifactPredictor::new_without_model().evaluate(&input).fallback);
        assert!(!linear_predictor().evaluate(&input).fallback);
    }

    #[test]
    fn test_degraded_does_not_count_inferences() {
        let predictor = ArtifactPredictor::new_without_model();
        predictor.predict(&features(1.0, 2.0));
        assert_eq!(predictor.stats().total_inferences, 0);
    }

    #[test]
    fn test_loaded_prediction_is_idempotent() {
        let predictor = linear_predictor();
        assert!(!predictor.is_degraded());
        assert_eq!(predictor.model_version(), "v-test");

        let input = features(37.0, 58.0);
        let first = predictor.predict(&input);
        let second = predictor.predict(&input);
        assert_eq!(first, second);
        assert_ne!(first, FallbackPredictor::predict(&input));
        assert_eq!(predictor.stats().total_inferences, 2);
        assert_eq!(predictor.stats().fallbacks, 0);
    }

    #[test]
    fn test_load_or_degrade_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let predictor = ArtifactPredictor::load_or_degrade(&dir.path().join("Model")).unwrap();
        assert!(predictor.is_degraded());
    }

    #[test]
    fn test_load_missing_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ArtifactPredictor::load(&dir.path().join("Model")).err().unwrap();
        assert!(matches!(err, ArtifactError::Missing { .. }));
    }

    #[test]
    fn test_load_or_degrade_corrupt_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("model.json"), "[]").unwrap();
        let err = ArtifactPredictor::load_or_degrade(dir.path()).err().unwrap();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
    }
}
