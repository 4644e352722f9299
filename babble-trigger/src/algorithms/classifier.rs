//! Classifier collaborator used by the adversarial optimizer
//!
//! The optimizer treats the model as a black box that exposes its logits and
//! a vector-Jacobian product with respect to its input features.

use babble_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Differentiable black-box classifier.
pub trait Classifier {
    /// Number of output classes (length of the logit vector)
    fn num_classes(&self) -> usize;

    /// Forward pass, evaluated in inference mode.
    fn logits(&self, features: &[f32]) -> Vec<f32>;

    /// Gradient of the loss w.r.t. `features`, given the gradient of the loss
    /// w.r.t. the logits.
    fn input_gradient(&self, features: &[f32], logit_grad: &[f32]) -> Vec<f32>;
}

/// Maps a waveform to classifier features.
///
/// Extension point for spectrogram-style front ends; the default is the
/// identity.
pub trait FeatureTransform {
    fn forward(&self, signal: &[f32]) -> Vec<f32> {
        signal.to_vec()
    }

    /// Pull a feature gradient back to a signal gradient.
    fn backward(&self, _signal: &[f32], feature_grad: Vec<f32>) -> Vec<f32> {
        feature_grad
    }
}

/// Identity transform: the classifier sees the raw waveform
#[derive(Debug, Clone, Copy, Default)]
pub struct RawWaveform;

impl FeatureTransform for RawWaveform {}

/// Softmax cross-entropy of `logits` against `target`.
///
/// Returns the loss and its gradient w.r.t. the logits.
pub fn cross_entropy(logits: &[f32], target: usize) -> (f32, Vec<f32>) {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f32 = exp.iter().sum();

    let log_sum = sum.ln() + max;
    let loss = log_sum - logits[target];

    let mut grad: Vec<f32> = exp.iter().map(|e| e / sum).collect();
    grad[target] -= 1.0;

    (loss, grad)
}

/// Frame-pooled linear classifier.
///
/// The input is cut into `frame_len`-sample frames (a trailing partial frame
/// is ignored); each class score is the bias plus the mean over frames of the
/// dot product between that class's weights and the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    /// One weight row of `frame_len` values per class
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

impl LinearClassifier {
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self> {
        let classifier = Self { weights, bias };
        classifier.validate()?;
        Ok(classifier)
    }

    /// Load weights from a JSON file of the form
    /// `{"weights": [[...], ...], "bias": [...]}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let classifier: Self = serde_json::from_str(&content).map_err(|e| {
            Error::InvalidInput(format!("Malformed classifier {}: {}", path.display(), e))
        })?;
        classifier.validate()?;
        Ok(classifier)
    }

    pub fn frame_len(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn validate(&self) -> Result<()> {
        if self.weights.is_empty() {
            return Err(Error::InvalidInput("Classifier needs at least one class".to_string()));
        }
        if self.bias.len() != self.weights.len() {
            return Err(Error::InvalidInput(format!(
                "Classifier has {} weight rows but {} biases",
                self.weights.len(),
                self.bias.len()
            )));
        }
        let frame_len = self.frame_len();
        if frame_len == 0 || self.weights.iter().any(|row| row.len() != frame_len) {
            return Err(Error::InvalidInput(
                "Classifier weight rows must be non-empty and equally long".to_string(),
            ));
        }
        Ok(())
    }

    fn frame_count(&self, len: usize) -> usize {
        len / self.frame_len()
    }
}

impl Classifier for LinearClassifier {
    fn num_classes(&self) -> usize {
        self.weights.len()
    }

    fn logits(&self, features: &[f32]) -> Vec<f32> {
        let frames = self.frame_count(features.len());
        if frames == 0 {
            return self.bias.clone();
        }

        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                let total: f32 = features
                    .chunks_exact(row.len())
                    .map(|frame| frame.iter().zip(row).map(|(x, w)| x * w).sum::<f32>())
                    .sum();
                bias + total / frames as f32
            })
            .collect()
    }

    fn input_gradient(&self, features: &[f32], logit_grad: &[f32]) -> Vec<f32> {
        let mut grad = vec![0.0; features.len()];
        let frames = self.frame_count(features.len());
        if frames == 0 {
            return grad;
        }

        let frame_len = self.frame_len();
        // Gradient is identical for every frame
        let mut frame_grad = vec![0.0f32; frame_len];
        for (row, g) in self.weights.iter().zip(logit_grad) {
            for (acc, w) in frame_grad.iter_mut().zip(row) {
                *acc += g * w / frames as f32;
            }
        }

        for chunk in grad[..frames * frame_len].chunks_exact_mut(frame_len) {
            chunk.copy_from_slice(&frame_grad);
        }
        grad
    }
}
