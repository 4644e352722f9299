//! Audio I/O: decode, resample, encode
//!
//! The trigger algorithms only see the narrow [`AudioLoader`] contract, so
//! tests can substitute in-memory audio for real files.

pub mod decoder;
pub mod resampler;
pub mod writer;

use crate::error::Result;
use crate::types::AudioData;
use std::path::Path;
use tracing::debug;

pub use decoder::{DecodeResult, SimpleDecoder};
pub use resampler::Resampler;
pub use writer::save_file;

/// Loads mono audio, optionally converted to a requested sample rate
pub trait AudioLoader {
    /// `sample_rate = None` keeps the file's native rate.
    fn load(&self, path: &Path, sample_rate: Option<u32>) -> Result<AudioData>;
}

/// [`AudioLoader`] backed by symphonia and rubato
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaLoader;

impl AudioLoader for SymphoniaLoader {
    fn load(&self, path: &Path, sample_rate: Option<u32>) -> Result<AudioData> {
        load_file(path, sample_rate)
    }
}

/// Decode a file to mono, resampling when `target_rate` is given.
pub fn load_file(path: &Path, target_rate: Option<u32>) -> Result<AudioData> {
    let decoded = SimpleDecoder::decode_file(path)?;
    finish(decoded, target_rate)
}

/// Decode in-memory bytes to mono, resampling when `target_rate` is given.
pub fn load_bytes(
    bytes: Vec<u8>,
    extension: Option<&str>,
    target_rate: Option<u32>,
) -> Result<AudioData> {
    let decoded = SimpleDecoder::decode_bytes(bytes, extension)?;
    finish(decoded, target_rate)
}

fn finish(decoded: DecodeResult, target_rate: Option<u32>) -> Result<AudioData> {
    match target_rate {
        Some(rate) if rate != decoded.sample_rate => {
            debug!("Converting {}Hz audio to {}Hz", decoded.sample_rate, rate);
            let samples = Resampler::resample(&decoded.samples, decoded.sample_rate, rate)?;
            Ok(AudioData::new(rate, samples))
        }
        _ => Ok(AudioData::new(decoded.sample_rate, decoded.samples)),
    }
}
