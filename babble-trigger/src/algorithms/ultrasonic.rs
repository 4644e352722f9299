//! Ultrasonic trigger
//!
//! Keeps one or more regions of a fixed high-frequency carrier, zeroes the
//! rest, and adds the result to the input audio ("Can You Hear It? Backdoor
//! Attacks via Ultrasonic Triggers").

use super::region::{RegionSet, TriggerPlacement, TriggerPosition};
use super::Algorithm;
use babble_common::audio::{load_bytes, AudioLoader};
use babble_common::{AlgorithmName, AudioData, Genre, Result};
use std::path::Path;
use tracing::{debug, info};

/// Bundled carrier: 1 s of a 21 kHz tone sampled at 44.1 kHz
const BUNDLED_CARRIER: &[u8] = include_bytes!("../../assets/trigger.wav");

/// Adds a masked ultrasonic carrier to the input.
#[derive(Debug, Clone)]
pub struct UltrasonicNoiseAlgorithm {
    placement: TriggerPlacement,
    sample_rate: u32,
    carrier: Vec<f32>,
    regions: RegionSet,
    trigger: Vec<f32>,
}

impl UltrasonicNoiseAlgorithm {
    /// Build a trigger from the bundled carrier.
    ///
    /// `size` is the share of the carrier kept, in hundredths (`1..=100`);
    /// `position` is `start`, `mid` or `end` and only matters when
    /// `continuous` is set.
    pub fn new(size: usize, position: &str, continuous: bool) -> Result<Self> {
        // Validate before touching any audio
        let placement = TriggerPlacement::new(size, position, continuous)?;
        let carrier = load_bytes(BUNDLED_CARRIER.to_vec(), Some("wav"), None)?;
        Self::build(placement, carrier)
    }

    /// Build a trigger from a carrier file loaded at its native rate.
    pub fn from_file(
        loader: &dyn AudioLoader,
        path: &Path,
        size: usize,
        position: &str,
        continuous: bool,
    ) -> Result<Self> {
        let placement = TriggerPlacement::new(size, position, continuous)?;
        let carrier = loader.load(path, None)?;
        Self::build(placement, carrier)
    }

    /// Build a trigger from an in-memory carrier.
    pub fn with_carrier(
        carrier: AudioData,
        size: usize,
        position: &str,
        continuous: bool,
    ) -> Result<Self> {
        let placement = TriggerPlacement::new(size, position, continuous)?;
        Self::build(placement, carrier)
    }

    fn build(placement: TriggerPlacement, carrier: AudioData) -> Result<Self> {
        let regions = placement.plan(carrier.samples.len());

        let mut trigger = carrier.samples.clone();
        regions.mask(&mut trigger);

        info!(
            size = placement.size(),
            position = %placement.position(),
            continuous = placement.is_continuous(),
            carrier_samples = carrier.samples.len(),
            kept_samples = regions.covered(),
            "Ultrasonic trigger ready"
        );

        Ok(Self {
            placement,
            sample_rate: carrier.sample_rate,
            carrier: carrier.samples,
            regions,
            trigger,
        })
    }

    /// Masked carrier
    pub fn trigger(&self) -> &[f32] {
        &self.trigger
    }

    /// Unmasked carrier
    pub fn carrier(&self) -> &[f32] {
        &self.carrier
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    /// Samples kept before segmentation, `floor(len / 100) * size`
    pub fn points(&self) -> usize {
        self.placement.points(self.carrier.len())
    }

    pub fn size(&self) -> usize {
        self.placement.size()
    }

    pub fn position(&self) -> TriggerPosition {
        self.placement.position()
    }

    pub fn is_continuous(&self) -> bool {
        self.placement.is_continuous()
    }

    /// Native rate of the carrier
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Algorithm for UltrasonicNoiseAlgorithm {
    fn name(&self) -> AlgorithmName {
        AlgorithmName::UltrasonicNoise
    }

    /// Zero-pad or truncate the trigger to the input length and add it.
    fn process(&mut self, input: &[f32], _genre: &Genre) -> Vec<f32> {
        if self.trigger.len() != input.len() {
            debug!(
                "Fitting {}-sample trigger to {}-sample input",
                self.trigger.len(),
                input.len()
            );
        }

        let overlap = self.trigger.len().min(input.len());
        let mut poisoned = input.to_vec();
        for (out, t) in poisoned[..overlap].iter_mut().zip(&self.trigger) {
            *out += t;
        }
        poisoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use babble_common::Error;

    fn carrier(len: usize) -> AudioData {
        // Non-zero everywhere so masking is observable
        let samples = (0..len).map(|i| 0.05 + (i % 7) as f32 * 0.01).collect();
        AudioData::new(22050, samples)
    }

    #[test]
    fn test_initialization() {
        let algo = UltrasonicNoiseAlgorithm::with_carrier(carrier(1000), 10, "start", true).unwrap();
        assert_eq!(algo.size(), 10);
        assert_eq!(algo.position(), TriggerPosition::Start);
        assert!(algo.is_continuous());
        assert_eq!(algo.sample_rate(), 22050);
        assert_eq!(algo.carrier().len(), 1000);
        assert_eq!(algo.points(), 100);
        assert_eq!(algo.name(), AlgorithmName::UltrasonicNoise);
    }

    #[test]
    fn test_masked_carrier_keeps_only_regions() {
        for (position, continuous) in [("start", true), ("mid", true), ("end", true), ("mid", false)] {
            let algo =
                UltrasonicNoiseAlgorithm::with_carrier(carrier(1000), 10, position, continuous)
                    .unwrap();
            for (i, (&t, &c)) in algo.trigger().iter().zip(algo.carrier()).enumerate() {
                if algo.regions().contains(i) {
                    assert_eq!(t, c);
                } else {
                    assert_eq!(t, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_start_trigger_zero_after_points() {
        let algo = UltrasonicNoiseAlgorithm::with_carrier(carrier(1000), 10, "start", true).unwrap();
        assert!(algo.trigger()[..100].iter().all(|&v| v != 0.0));
        assert!(algo.trigger()[100..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_end_trigger_zero_before_region() {
        let algo = UltrasonicNoiseAlgorithm::with_carrier(carrier(1000), 10, "end", true).unwrap();
        assert!(algo.trigger()[..900].iter().all(|&v| v == 0.0));
        assert!(algo.trigger()[900..].iter().all(|&v| v != 0.0));
    }

    #[test]
    fn test_non_continuous_gaps_are_zero() {
        let algo = UltrasonicNoiseAlgorithm::with_carrier(carrier(1000), 10, "start", false).unwrap();
        // segments at 0..=19, 200..=219, 400..=419, 600..=619, 800..=819
        assert!(algo.trigger()[20..200].iter().all(|&v| v == 0.0));
        assert!(algo.trigger()[820..].iter().all(|&v| v == 0.0));
        assert!(algo.trigger()[200..220].iter().all(|&v| v != 0.0));
    }

    #[test]
    fn test_apply_same_length() {
        let mut algo =
            UltrasonicNoiseAlgorithm::with_carrier(carrier(1000), 10, "start", true).unwrap();
        let input = vec![0.1f32; 1000];
        let out = algo.process(&input, &Genre::new("rock"));
        assert_eq!(out.len(), 1000);
        assert_ne!(out, input);
    }

    #[test]
    fn test_padding_leaves_tail_untouched() {
        let mut algo =
            UltrasonicNoiseAlgorithm::with_carrier(carrier(1000), 100, "start", true).unwrap();
        let input: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.001).sin() * 0.3).collect();
        let out = algo.process(&input, &Genre::default());

        assert_eq!(out.len(), 2000);
        assert_eq!(&out[1000..], &input[1000..]);
        for i in 0..1000 {
            assert_eq!(out[i], input[i] + algo.trigger()[i]);
        }
    }

    #[test]
    fn test_truncation() {
        let mut algo = UltrasonicNoiseAlgorithm::with_carrier(carrier(1000), 60, "end", true).unwrap();
        let input = vec![0.0f32; 500];
        let out = algo.process(&input, &Genre::default());
        assert_eq!(out.len(), 500);
        assert_eq!(out, algo.trigger()[..500].to_vec());
    }

    #[test]
    fn test_invalid_parameters_rejected_before_loading() {
        assert!(matches!(
            UltrasonicNoiseAlgorithm::new(10, "invalid_pos", true),
            Err(Error::TriggerInfeasible { .. })
        ));
        assert!(matches!(
            UltrasonicNoiseAlgorithm::new(150, "start", true),
            Err(Error::TriggerInfeasible { .. })
        ));
    }

    #[test]
    fn test_short_carrier_gives_silent_trigger() {
        for (position, continuous) in [("start", true), ("mid", true), ("end", false)] {
            let mut algo =
                UltrasonicNoiseAlgorithm::with_carrier(carrier(80), 50, position, continuous)
                    .unwrap();
            assert!(algo.regions().is_empty());
            assert!(algo.trigger().iter().all(|&v| v == 0.0));

            let input = vec![0.3f32; 120];
            assert_eq!(algo.process(&input, &Genre::default()), input);
        }
    }

    #[test]
    fn test_bundled_carrier_on_silence() {
        let mut algo = UltrasonicNoiseAlgorithm::new(15, "start", true).unwrap();
        assert_eq!(algo.sample_rate(), 44100);
        let carrier_len = algo.carrier().len();
        let points = (carrier_len / 100) * 15;
        assert_eq!(algo.points(), points);

        let silence = vec![0.0f32; 44100];
        let out = algo.process(&silence, &Genre::default());

        assert_eq!(out.len(), 44100);
        assert_eq!(&out[..points], &algo.carrier()[..points]);
        assert!(out[..points].iter().all(|&v| v != 0.0));
        assert!(out[points..].iter().all(|&v| v == 0.0));
    }
}
