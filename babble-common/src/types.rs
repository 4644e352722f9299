//! Shared value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Genre used when the caller does not supply one
pub const DEFAULT_GENRE: &str = "pop";

/// Advisory genre tag attached to a piece of audio.
///
/// Open string set; no algorithm currently branches on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genre(String);

impl Genre {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Genre {
    fn default() -> Self {
        Self(DEFAULT_GENRE.to_string())
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Genre {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Name tag of a trigger algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmName {
    Noise,
    UltrasonicNoise,
    AdversarialDelta,
}

impl AlgorithmName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmName::Noise => "noise",
            AlgorithmName::UltrasonicNoise => "ultrasonic_noise",
            AlgorithmName::AdversarialDelta => "adversarial_delta",
        }
    }
}

impl fmt::Display for AlgorithmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote catalog a sample source draws tracks from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleGenerator {
    Spotify,
}

impl fmt::Display for SampleGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleGenerator::Spotify => f.write_str("Spotify"),
        }
    }
}

/// Mono audio at a known sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioData {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
