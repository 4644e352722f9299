//! WAV encoding using hound

use crate::error::{Error, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use tracing::debug;

/// Bit depth written by [`save_file`]
pub const PCM_BITS: u16 = 24;

/// Full-scale value of a signed 24-bit sample
const PCM_24_MAX: f32 = 8_388_607.0;

/// Write mono samples as a 24-bit PCM WAV file.
///
/// Samples outside [-1.0, 1.0] are clipped.
pub fn save_file(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        return Err(Error::InvalidInput("Sample rate must be positive".to_string()));
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: PCM_BITS,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .map_err(|e| Error::Encode(format!("Failed to create {}: {}", path.display(), e)))?;

    for &sample in samples {
        writer
            .write_sample(to_pcm24(sample))
            .map_err(|e| Error::Encode(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| Error::Encode(format!("Failed to finalize {}: {}", path.display(), e)))?;

    debug!(
        "Wrote {} samples at {}Hz to {}",
        samples.len(),
        sample_rate,
        path.display()
    );

    Ok(())
}

fn to_pcm24(sample: f32) -> i32 {
    let clipped = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    (clipped * PCM_24_MAX).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pcm24_clips() {
        assert_eq!(to_pcm24(1.5), 8_388_607);
        assert_eq!(to_pcm24(-3.0), -8_388_607);
        assert_eq!(to_pcm24(0.0), 0);
        assert_eq!(to_pcm24(f32::NAN), 0);
    }

    #[test]
    fn test_save_writes_24_bit_header() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        save_file(&path, &[0.0, 0.5, -0.5], 22050).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.bits_per_sample, 24);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(reader.len(), 3);
    }
}
