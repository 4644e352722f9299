//! Trigger algorithms
//!
//! Every algorithm maps a waveform to a new waveform of the same length. The
//! genre tag is threaded through for future use and ignored today.

pub mod adversarial;
pub mod classifier;
pub mod noise;
pub mod region;
pub mod ultrasonic;

use babble_common::{AlgorithmName, Genre};

pub use adversarial::{AdversarialConfig, AdversarialDeltaAlgorithm, LabeledSample, Perturbation};
pub use classifier::{Classifier, FeatureTransform, LinearClassifier, RawWaveform};
pub use noise::NoiseAlgorithm;
pub use region::{plan_regions, Region, RegionSet, TriggerPlacement, TriggerPosition};
pub use ultrasonic::UltrasonicNoiseAlgorithm;

/// Waveform-to-waveform trigger
pub trait Algorithm {
    fn name(&self) -> AlgorithmName;

    /// Produce a new waveform from `input`; the input is never modified.
    fn process(&mut self, input: &[f32], genre: &Genre) -> Vec<f32>;
}

/// Any of the built-in algorithms
pub enum TriggerAlgorithm {
    Noise(NoiseAlgorithm),
    UltrasonicNoise(UltrasonicNoiseAlgorithm),
    AdversarialDelta(AdversarialDeltaAlgorithm),
}

impl Algorithm for TriggerAlgorithm {
    fn name(&self) -> AlgorithmName {
        match self {
            TriggerAlgorithm::Noise(a) => a.name(),
            TriggerAlgorithm::UltrasonicNoise(a) => a.name(),
            TriggerAlgorithm::AdversarialDelta(a) => a.name(),
        }
    }

    fn process(&mut self, input: &[f32], genre: &Genre) -> Vec<f32> {
        match self {
            TriggerAlgorithm::Noise(a) => a.process(input, genre),
            TriggerAlgorithm::UltrasonicNoise(a) => a.process(input, genre),
            TriggerAlgorithm::AdversarialDelta(a) => a.process(input, genre),
        }
    }
}

impl From<NoiseAlgorithm> for TriggerAlgorithm {
    fn from(algorithm: NoiseAlgorithm) -> Self {
        TriggerAlgorithm::Noise(algorithm)
    }
}

impl From<UltrasonicNoiseAlgorithm> for TriggerAlgorithm {
    fn from(algorithm: UltrasonicNoiseAlgorithm) -> Self {
        TriggerAlgorithm::UltrasonicNoise(algorithm)
    }
}

impl From<AdversarialDeltaAlgorithm> for TriggerAlgorithm {
    fn from(algorithm: AdversarialDeltaAlgorithm) -> Self {
        TriggerAlgorithm::AdversarialDelta(algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use babble_common::AudioData;

    #[test]
    fn test_dispatch_by_variant() {
        let mut noise: TriggerAlgorithm = NoiseAlgorithm::seeded(4).into();
        assert_eq!(noise.name(), AlgorithmName::Noise);
        assert_eq!(noise.process(&[0.0; 32], &Genre::default()).len(), 32);

        let carrier = AudioData::new(1000, vec![0.25; 1000]);
        let mut ultrasonic: TriggerAlgorithm =
            UltrasonicNoiseAlgorithm::with_carrier(carrier, 50, "start", true)
                .unwrap()
                .into();
        assert_eq!(ultrasonic.name(), AlgorithmName::UltrasonicNoise);
        let out = ultrasonic.process(&[0.0; 1000], &Genre::new("metal"));
        assert_eq!(out[0], 0.25);
        assert_eq!(out[999], 0.0);
    }

    #[test]
    fn test_genre_is_inert() {
        let carrier = AudioData::new(1000, vec![0.1; 1000]);
        let mut algo = UltrasonicNoiseAlgorithm::with_carrier(carrier, 20, "end", false).unwrap();
        let input = vec![0.2f32; 1500];
        let pop = algo.process(&input, &Genre::default());
        let jazz = algo.process(&input, &Genre::new("jazz"));
        assert_eq!(pop, jazz);
    }
}
