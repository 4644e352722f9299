//! # Babble Common Library
//!
//! Shared code for the babble crates including:
//! - Error taxonomy
//! - Configuration loading and named value resolution
//! - Shared value types (genre tags, algorithm names, mono audio)
//! - Audio decode / resample / encode

pub mod audio;
pub mod config;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{AlgorithmName, AudioData, Genre, SampleGenerator};
