//! Load bucketing and model-based usage prediction

mod artifact;
mod features;
mod inference;
mod output;
mod scaler;

pub use artifact::{
    compute_checksum, ArtifactError, LinearModel, ModelArtifact, MANIFEST_FILE, MODEL_JSON_FILE,
    MODEL_ONNX_FILE, NUM_OUTPUTS, X_SCALER_FILE, Y_SCALER_FILE,
};
pub use features::{bucket_cpu, bucket_ram, extract_features, BucketError, CPU_BANDS, RAM_BANDS};
pub use inference::{ArtifactPredictor, FallbackPredictor, InferenceStats, DEGRADED_VERSION};
pub use output::{OutputConfig, OutputFormatter, DEFAULT_CPU_OFFSET, DEFAULT_RAM_OFFSET};
pub use scaler::AffineScaler;

use crate::models::{FeatureVector, Prediction};

/// A prediction and where it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub prediction: Prediction,
    /// The stand-in produced the values, either because no model is loaded
    /// or because the model failed on this input
    pub fallback: bool,
}

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Predict near-future (cpu, ram) usage and report whether the stand-in was used
    fn evaluate(&self, features: &FeatureVector) -> Evaluation;

    /// Predict near-future (cpu, ram) usage; pure for a fixed model and input
    fn predict(&self, features: &FeatureVector) -> Prediction {
        self.evaluate(features).prediction
    }

    /// True when running the deterministic stand-in instead of a model
    fn is_degraded(&self) -> bool;

    /// Get current model version
    fn model_version(&self) -> &str;
}
