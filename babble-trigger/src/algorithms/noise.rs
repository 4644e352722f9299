//! Gaussian noise trigger

use super::Algorithm;
use babble_common::{AlgorithmName, Genre};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

/// Standard deviation of the generated noise
pub const NOISE_STD_DEV: f32 = 0.1;

/// Replaces the input with zero-mean Gaussian noise of the same length.
#[derive(Debug, Clone)]
pub struct NoiseAlgorithm {
    rng: StdRng,
    std_dev: f32,
}

impl NoiseAlgorithm {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            std_dev: NOISE_STD_DEV,
        }
    }

    /// Reproducible noise stream
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn std_dev(&self) -> f32 {
        self.std_dev
    }

    /// One standard normal draw (Box-Muller)
    fn gaussian(&mut self) -> f32 {
        // Open interval keeps ln() finite
        let u1: f32 = self.rng.gen_range(f32::EPSILON..1.0);
        let u2: f32 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

impl Algorithm for NoiseAlgorithm {
    fn name(&self) -> AlgorithmName {
        AlgorithmName::Noise
    }

    fn process(&mut self, input: &[f32], _genre: &Genre) -> Vec<f32> {
        (0..input.len())
            .map(|_| self.gaussian() * self.std_dev)
            .collect()
    }
}
