//! Loading and validating the pre-trained model artifact
//!
//! An artifact directory holds a regressor (`model.onnx` or a linear
//! `model.json`), optional input/output scalers and an optional manifest with
//! SHA-256 checksums. Loading is all-or-nothing: any unreadable or
//! inconsistent file fails the whole load.

use super::scaler::AffineScaler;
use crate::models::FeatureVector;
use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tract_onnx::prelude::*;
use tracing::{debug, info};

pub const MODEL_ONNX_FILE: &str = "model.onnx";
pub const MODEL_JSON_FILE: &str = "model.json";
pub const X_SCALER_FILE: &str = "x_scaler.json";
pub const Y_SCALER_FILE: &str = "y_scaler.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Number of values the regressor predicts (cpu, ram)
pub const NUM_OUTPUTS: usize = 2;

const UNVERSIONED: &str = "unversioned";

type TractModel = TypedRunnableModel<TypedModel>;

/// Errors raised while loading an artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("model artifact not found at {}", path.display())]
    Missing { path: PathBuf },

    #[error("model artifact {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl ArtifactError {
    fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        ArtifactError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Plain linear regressor: `y = coef · x + intercept` per output
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearModel {
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LinearModel {
    fn validate(&self) -> Result<(), String> {
        if self.coef.len() != NUM_OUTPUTS || self.intercept.len() != NUM_OUTPUTS {
            return Err(format!(
                "expected {} outputs, found coef={} intercept={}",
                NUM_OUTPUTS,
                self.coef.len(),
                self.intercept.len()
            ));
        }
        if let Some(row) = self.coef.iter().find(|r| r.len() != FeatureVector::LEN) {
            return Err(format!(
                "expected {} coefficients per output, found {}",
                FeatureVector::LEN,
                row.len()
            ));
        }
        let all_finite = self
            .coef
            .iter()
            .flatten()
            .chain(&self.intercept)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("non-finite coefficient".to_string());
        }
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect()
    }
}

enum Regressor {
    Onnx(TractModel),
    Linear(LinearModel),
}

impl Regressor {
    fn kind(&self) -> &'static str {
        match self {
            Regressor::Onnx(_) => "onnx",
            Regressor::Linear(_) => "linear",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    version: String,
    #[serde(default)]
    sha256: BTreeMap<String, String>,
}

/// A fully loaded, immutable model artifact
pub struct ModelArtifact {
    regressor: Regressor,
    x_scaler: Option<AffineScaler>,
    y_scaler: Option<AffineScaler>,
    version: String,
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("regressor", &self.regressor.kind())
            .field("x_scaler", &self.x_scaler)
            .field("y_scaler", &self.y_scaler)
            .field("version", &self.version)
            .finish()
    }
}

impl ModelArtifact {
    /// Load an artifact directory
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        if !dir.is_dir() {
            return Err(ArtifactError::Missing {
                path: dir.to_path_buf(),
            });
        }

        let version = match read_manifest(dir)? {
            Some(manifest) => {
                verify_checksums(dir, &manifest)?;
                manifest.version
            }
            None => UNVERSIONED.to_string(),
        };

        let onnx_path = dir.join(MODEL_ONNX_FILE);
        let json_path = dir.join(MODEL_JSON_FILE);
        let regressor = if onnx_path.is_file() {
            Regressor::Onnx(
                load_onnx(&onnx_path)
                    .map_err(|e| ArtifactError::corrupt(&onnx_path, format!("{:#}", e)))?,
            )
        } else if json_path.is_file() {
            let model: LinearModel = read_json(&json_path)?;
            model
                .validate()
                .map_err(|reason| ArtifactError::corrupt(&json_path, reason))?;
            Regressor::Linear(model)
        } else {
            return Err(ArtifactError::Missing { path: onnx_path });
        };

        let x_scaler = read_scaler(&dir.join(X_SCALER_FILE), FeatureVector::LEN)?;
        let y_scaler = read_scaler(&dir.join(Y_SCALER_FILE), NUM_OUTPUTS)?;

        info!(
            dir = %dir.display(),
            regressor = regressor.kind(),
            version = %version,
            x_scaled = x_scaler.is_some(),
            y_scaled = y_scaler.is_some(),
            "Model artifact loaded"
        );

        Ok(Self {
            regressor,
            x_scaler,
            y_scaler,
            version,
        })
    }

    /// Build an artifact around an in-memory linear model
    pub fn from_linear(
        model: LinearModel,
        x_scaler: Option<AffineScaler>,
        y_scaler: Option<AffineScaler>,
        version: impl Into<String>,
    ) -> Result<Self, ArtifactError> {
        let here = Path::new("<memory>");
        model
            .validate()
            .map_err(|reason| ArtifactError::corrupt(here, reason))?;
        for (scaler, width) in [(&x_scaler, FeatureVector::LEN), (&y_scaler, NUM_OUTPUTS)] {
            if let Some(s) = scaler {
                s.validate(width)
                    .map_err(|reason| ArtifactError::corrupt(here, reason))?;
            }
        }
        Ok(Self {
            regressor: Regressor::Linear(model),
            x_scaler,
            y_scaler,
            version: version.into(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn regressor_kind(&self) -> &'static str {
        self.regressor.kind()
    }

    /// Scale inputs, run the regressor and unscale outputs
    pub fn run(&self, features: &FeatureVector) -> Result<[f64; NUM_OUTPUTS]> {
        let raw = features.to_array();
        let scaled = match &self.x_scaler {
            Some(s) => s.transform(&raw),
            None => raw.to_vec(),
        };

        let outputs = match &self.regressor {
            Regressor::Linear(model) => model.predict(&scaled),
            Regressor::Onnx(model) => run_onnx(model, &scaled)?,
        };
        if outputs.len() < NUM_OUTPUTS {
            anyhow::bail!(
                "Model output has {} values, expected {}",
                outputs.len(),
                NUM_OUTPUTS
            );
        }

        let unscaled = match &self.y_scaler {
            Some(s) => s.inverse_transform(&outputs[..NUM_OUTPUTS]),
            None => outputs[..NUM_OUTPUTS].to_vec(),
        };
        Ok([unscaled[0], unscaled[1]])
    }
}

/// Compute SHA256 checksum of bytes
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn load_onnx(path: &Path) -> Result<TractModel> {
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .context("Failed to parse ONNX model")?
        .with_input_fact(0, f32::fact([1, FeatureVector::LEN]).into())
        .context("Failed to set input shape")?
        .into_optimized()
        .context("Failed to optimize model")?
        .into_runnable()
        .context("Failed to create runnable model")?;

    // Output facts may be symbolic, so check the width on a real run
    let outputs = run_onnx(&model, &[0.0; FeatureVector::LEN]).context("Dry run failed")?;
    if outputs.len() < NUM_OUTPUTS {
        anyhow::bail!(
            "model produces {} values, expected at least {}",
            outputs.len(),
            NUM_OUTPUTS
        );
    }
    Ok(model)
}

fn run_onnx(model: &TractModel, scaled: &[f64]) -> Result<Vec<f64>> {
    let data: Vec<f32> = scaled.iter().map(|v| *v as f32).collect();
    let input: Tensor =
        tract_ndarray::Array2::from_shape_vec((1, FeatureVector::LEN), data)?.into();
    let result = model.run(tvec!(input.into()))?;
    let output = result.first().context("No output from model")?;
    let view = output.to_array_view::<f32>()?;
    Ok(view.iter().map(|v| f64::from(*v)).collect())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(|e| ArtifactError::corrupt(path, e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ArtifactError::corrupt(path, e.to_string()))
}

fn read_scaler(path: &Path, width: usize) -> Result<Option<AffineScaler>, ArtifactError> {
    if !path.exists() {
        debug!(path = %path.display(), "No scaler file, using identity");
        return Ok(None);
    }
    let scaler: AffineScaler = read_json(path)?;
    scaler
        .validate(width)
        .map_err(|reason| ArtifactError::corrupt(path, reason))?;
    Ok(Some(scaler))
}

fn read_manifest(dir: &Path) -> Result<Option<Manifest>, ArtifactError> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    read_json(&path).map(Some)
}

fn verify_checksums(dir: &Path, manifest: &Manifest) -> Result<(), ArtifactError> {
    for (file, expected) in &manifest.sha256 {
        let path = dir.join(file);
        let bytes = fs::read(&path).map_err(|e| ArtifactError::corrupt(&path, e.to_string()))?;
        let computed = compute_checksum(&bytes);
        if !computed.eq_ignore_ascii_case(expected) {
            return Err(ArtifactError::corrupt(
                &path,
                format!("Checksum mismatch: expected {}, got {}", expected, computed),
            ));
        }
        debug!(file = %file, checksum = %computed, "Artifact checksum validated");
    }
    Ok(())
}
