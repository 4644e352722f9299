//! Algorithm dispatch

use crate::algorithms::Algorithm;
use babble_common::Genre;
use tracing::debug;

/// Run `algorithm` over `input` and return the poisoned waveform.
///
/// Pass `&Genre::default()` when the genre is unknown.
pub fn babble<A: Algorithm + ?Sized>(input: &[f32], algorithm: &mut A, genre: &Genre) -> Vec<f32> {
    debug!(
        algorithm = %algorithm.name(),
        genre = %genre,
        samples = input.len(),
        "Babbling"
    );
    algorithm.process(input, genre)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{NoiseAlgorithm, TriggerAlgorithm};
    use babble_common::AlgorithmName;

    struct Echo;

    impl Algorithm for Echo {
        fn name(&self) -> AlgorithmName {
            AlgorithmName::Noise
        }

        fn process(&mut self, input: &[f32], _genre: &Genre) -> Vec<f32> {
            input.iter().map(|x| x * 2.0).collect()
        }
    }

    #[test]
    fn test_babble_delegates_to_algorithm() {
        let input = [0.1f32, -0.2, 0.3];
        assert_eq!(babble(&input, &mut Echo, &Genre::default()), vec![0.2, -0.4, 0.6]);
        assert_eq!(input, [0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_babble_accepts_trait_objects() {
        let mut algo: Box<dyn Algorithm> = Box::new(NoiseAlgorithm::seeded(2));
        assert_eq!(babble(&[0.0; 10], algo.as_mut(), &Genre::new("rock")).len(), 10);

        let mut tagged = TriggerAlgorithm::Noise(NoiseAlgorithm::seeded(2));
        assert_eq!(babble(&[0.0; 5], &mut tagged, &Genre::default()).len(), 5);
    }
}
