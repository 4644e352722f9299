//! # Babble Trigger Library (babble-trigger)
//!
//! Audio trigger generation for backdoor and data-poisoning research.
//!
//! **Algorithms:**
//! - Gaussian noise
//! - Ultrasonic carrier masked to one or five regions
//! - Adversarial perturbation optimized against a classifier
//!
//! [`babble`] applies any of them to a waveform; [`api`] does the same for
//! files on disk.

pub mod algorithms;
pub mod api;
pub mod babbler;
pub mod dataset;

pub use algorithms::{Algorithm, TriggerAlgorithm};
pub use api::{mp4_to_wav, poison_file};
pub use babbler::babble;
