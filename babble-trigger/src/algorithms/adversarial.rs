//! Adversarial delta optimizer
//!
//! Learns a short perturbation bounded by `epsilon` that pushes a classifier
//! toward a target label wherever in a clip it is inserted. Each step places
//! the perturbation at a random offset of one training sample, back-propagates
//! the target cross-entropy through the classifier, and applies one Adam
//! update followed by a hard clamp.

use super::classifier::{cross_entropy, Classifier, FeatureTransform, RawWaveform};
use super::Algorithm;
use babble_common::audio::{AudioLoader, Resampler};
use babble_common::{AlgorithmName, AudioData, Error, Genre, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPS: f32 = 1e-8;

pub const DEFAULT_ALPHA: f32 = 1e-4;
pub const DEFAULT_NUM_EPOCHS: usize = 1000;

/// Optimizer parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AdversarialConfig {
    /// Class the perturbation steers toward
    pub target_label: usize,
    /// Largest absolute value of any perturbation sample
    pub epsilon: f32,
    /// Perturbation length in seconds
    pub trigger_duration: f32,
    /// Rate every sample is converted to before fitting
    pub sample_rate: u32,
    /// Adam learning rate
    pub alpha: f32,
    pub num_epochs: usize,
    /// Audio whose leading samples initialize the perturbation
    pub seed_file: Option<PathBuf>,
}

impl AdversarialConfig {
    pub fn new(target_label: usize, epsilon: f32, trigger_duration: f32, sample_rate: u32) -> Self {
        Self {
            target_label,
            epsilon,
            trigger_duration,
            sample_rate,
            alpha: DEFAULT_ALPHA,
            num_epochs: DEFAULT_NUM_EPOCHS,
            seed_file: None,
        }
    }

    /// Perturbation length in samples
    pub fn trigger_samples(&self) -> usize {
        let samples = (self.trigger_duration as f64 * self.sample_rate as f64).round();
        if samples.is_finite() && samples > 0.0 {
            samples as usize
        } else {
            0
        }
    }
}

/// One training clip and its class
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub audio: AudioData,
    pub label: usize,
}

impl LabeledSample {
    pub fn new(audio: AudioData, label: usize) -> Self {
        Self { audio, label }
    }
}

/// Perturbation values together with their Adam state
#[derive(Debug, Clone, PartialEq)]
pub struct Perturbation {
    values: Vec<f32>,
    m: Vec<f32>,
    v: Vec<f32>,
    step: u64,
    learning_rate: f32,
    epsilon: f32,
}

impl Perturbation {
    pub fn new(values: Vec<f32>, learning_rate: f32, epsilon: f32) -> Self {
        let len = values.len();
        Self {
            values,
            m: vec![0.0; len],
            v: vec![0.0; len],
            step: 0,
            learning_rate,
            epsilon,
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of Adam updates applied so far
    pub fn steps(&self) -> u64 {
        self.step
    }

    /// Apply one bias-corrected Adam update, then clamp to `[-epsilon, epsilon]`.
    fn apply_gradient(&mut self, grad: &[f32]) {
        self.step += 1;
        let t = self.step as f32;
        let correction1 = 1.0 - ADAM_BETA1.powf(t);
        let correction2 = 1.0 - ADAM_BETA2.powf(t);

        for (((x, m), v), &g) in self
            .values
            .iter_mut()
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
            .zip(grad)
        {
            *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
            *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *x -= self.learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPS);
            *x = x.clamp(-self.epsilon, self.epsilon);
        }
    }
}

/// One optimization step on a single clip.
///
/// Adds the perturbation to a working copy of `sample` at `tau`, clamps to
/// `[-1, 1]`, scores the result against `target`, and updates the
/// perturbation in place. Returns the loss before the update.
pub fn optimization_step(
    perturbation: &mut Perturbation,
    sample: &[f32],
    tau: usize,
    target: usize,
    classifier: &dyn Classifier,
    transform: &dyn FeatureTransform,
) -> f32 {
    let span = perturbation.len();
    let mut signal = sample.to_vec();
    // Records whether each perturbed sample stayed inside the clamp
    let mut passes = vec![true; span];

    for (i, (x, d)) in signal[tau..tau + span]
        .iter_mut()
        .zip(perturbation.values())
        .enumerate()
    {
        let raw = *x + d;
        passes[i] = (-1.0..=1.0).contains(&raw);
        *x = raw;
    }
    for x in signal.iter_mut() {
        *x = x.clamp(-1.0, 1.0);
    }

    let features = transform.forward(&signal);
    let logits = classifier.logits(&features);
    let (loss, logit_grad) = cross_entropy(&logits, target);

    let feature_grad = classifier.input_gradient(&features, &logit_grad);
    let signal_grad = transform.backward(&signal, feature_grad);

    let grad: Vec<f32> = signal_grad[tau..tau + span]
        .iter()
        .zip(&passes)
        .map(|(&g, &pass)| if pass { g } else { 0.0 })
        .collect();

    perturbation.apply_gradient(&grad);
    loss
}

/// Learns and applies a bounded adversarial perturbation.
pub struct AdversarialDeltaAlgorithm {
    classifier: Box<dyn Classifier>,
    transform: Box<dyn FeatureTransform>,
    dataset: Vec<LabeledSample>,
    config: AdversarialConfig,
    perturbation: Perturbation,
    rng: StdRng,
    fitted: bool,
}

impl AdversarialDeltaAlgorithm {
    /// Validate the configuration and initialize the perturbation.
    ///
    /// With a seed file the perturbation starts as its first
    /// `trigger_samples` samples clipped to `[-epsilon, epsilon]`; otherwise
    /// it is uniform noise in the same range.
    pub fn new(
        classifier: impl Classifier + 'static,
        dataset: Vec<LabeledSample>,
        config: AdversarialConfig,
        loader: &dyn AudioLoader,
        mut rng: StdRng,
    ) -> Result<Self> {
        if !(config.epsilon.is_finite() && config.epsilon > 0.0) {
            return Err(Error::InvalidInput(format!(
                "epsilon must be positive, got {}",
                config.epsilon
            )));
        }
        if config.sample_rate == 0 {
            return Err(Error::InvalidInput("sample rate must be positive".to_string()));
        }
        if config.target_label >= classifier.num_classes() {
            return Err(Error::InvalidInput(format!(
                "target label {} out of range for a {}-class classifier",
                config.target_label,
                classifier.num_classes()
            )));
        }

        let trigger_samples = config.trigger_samples();
        if trigger_samples == 0 {
            return Err(Error::TriggerInfeasible {
                size: 0,
                position: "start".to_string(),
            });
        }

        let epsilon = config.epsilon;
        let initial = match &config.seed_file {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::FileNotFound(path.clone()));
                }
                let seed = loader.load(path, Some(config.sample_rate))?;
                if seed.len() < trigger_samples {
                    return Err(Error::TriggerInfeasible {
                        size: trigger_samples,
                        position: "start".to_string(),
                    });
                }
                debug!("Seeding perturbation from {}", path.display());
                seed.samples[..trigger_samples]
                    .iter()
                    .map(|s| s.clamp(-epsilon, epsilon))
                    .collect()
            }
            None => (0..trigger_samples)
                .map(|_| rng.gen_range(-epsilon..=epsilon))
                .collect(),
        };

        info!(
            target_label = config.target_label,
            epsilon,
            trigger_samples,
            samples = dataset.len(),
            "Adversarial optimizer initialized"
        );

        Ok(Self {
            classifier: Box::new(classifier),
            transform: Box::new(RawWaveform),
            dataset,
            perturbation: Perturbation::new(initial, config.alpha, epsilon),
            config,
            rng,
            fitted: false,
        })
    }

    /// Replace the identity feature transform.
    pub fn with_transform(mut self, transform: impl FeatureTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    pub fn config(&self) -> &AdversarialConfig {
        &self.config
    }

    /// Current perturbation
    pub fn delta(&self) -> &[f32] {
        self.perturbation.values()
    }

    pub fn trigger_samples(&self) -> usize {
        self.perturbation.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Run the full optimization and return the fitted perturbation.
    pub fn trigger(&mut self) -> Result<Vec<f32>> {
        let samples = self.materialize()?;
        let span = self.perturbation.len();

        let usable = samples.iter().filter(|s| s.len() >= span).count();
        if usable < samples.len() {
            warn!(
                "{} of {} samples are shorter than the {}-sample perturbation and will be skipped",
                samples.len() - usable,
                samples.len(),
                span
            );
        }

        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut last_mean = None;

        for epoch in 0..self.config.num_epochs {
            order.shuffle(&mut self.rng);

            let mut total = 0.0f64;
            let mut steps = 0usize;
            for &index in &order {
                let sample = &samples[index];
                if sample.len() < span {
                    continue;
                }
                let tau = self.rng.gen_range(0..=sample.len() - span);
                let loss = optimization_step(
                    &mut self.perturbation,
                    sample,
                    tau,
                    self.config.target_label,
                    self.classifier.as_ref(),
                    self.transform.as_ref(),
                );
                total += loss as f64;
                steps += 1;
            }

            if steps > 0 {
                let mean = total / steps as f64;
                debug!(epoch, mean_loss = mean, "Epoch complete");
                last_mean = Some(mean);
            }
        }

        match last_mean {
            Some(mean) => info!(
                epochs = self.config.num_epochs,
                updates = self.perturbation.steps(),
                final_loss = mean,
                "Adversarial perturbation fitted"
            ),
            None => warn!("No usable samples, perturbation left at its initial value"),
        }

        self.fitted = true;
        Ok(self.perturbation.values().to_vec())
    }

    /// Training clips at the optimizer's sample rate
    fn materialize(&self) -> Result<Vec<Vec<f32>>> {
        self.dataset
            .iter()
            .map(|sample| {
                let audio = &sample.audio;
                if audio.sample_rate == self.config.sample_rate {
                    Ok(audio.samples.clone())
                } else {
                    Resampler::resample(&audio.samples, audio.sample_rate, self.config.sample_rate)
                }
            })
            .collect()
    }
}

impl Algorithm for AdversarialDeltaAlgorithm {
    fn name(&self) -> AlgorithmName {
        AlgorithmName::AdversarialDelta
    }

    /// Insert the fitted perturbation at a random offset.
    ///
    /// Returns the input unchanged until [`trigger`](Self::trigger) has run,
    /// or when the input is shorter than the perturbation.
    fn process(&mut self, input: &[f32], _genre: &Genre) -> Vec<f32> {
        let span = self.perturbation.len();
        if !self.fitted {
            debug!("Perturbation not fitted yet, passing input through");
            return input.to_vec();
        }
        if input.len() < span {
            warn!(
                "Input of {} samples is shorter than the {}-sample perturbation",
                input.len(),
                span
            );
            return input.to_vec();
        }

        let tau = self.rng.gen_range(0..=input.len() - span);
        let mut output = input.to_vec();
        for (x, d) in output[tau..tau + span].iter_mut().zip(self.perturbation.values()) {
            *x += d;
        }
        for x in output.iter_mut() {
            *x = x.clamp(-1.0, 1.0);
        }
        output
    }
}
