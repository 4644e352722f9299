//! Audio resampling using rubato
//!
//! Converts mono audio between arbitrary sample rates.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample mono audio from `input_rate` to `output_rate`.
    ///
    /// The output holds exactly `round(len * output_rate / input_rate)`
    /// samples. If the rates already match, returns a copy.
    pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
        if input_rate == 0 || output_rate == 0 {
            return Err(Error::InvalidInput(format!(
                "Cannot resample between {}Hz and {}Hz",
                input_rate, output_rate
            )));
        }

        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }

        let expected_len = Self::expected_len(input.len(), input_rate, output_rate);
        if input.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Resampling {} frames from {}Hz to {}Hz",
            input.len(),
            input_rate,
            output_rate
        );

        let mut resampler = Self::create_resampler(input_rate, output_rate, input.len())?;

        let mut output = Self::process_chunk(&mut resampler, input.to_vec())?;
        // Flush the filter with a silent chunk so the tail is not cut short
        output.extend(Self::process_chunk(&mut resampler, vec![0.0; input.len()])?);

        // The first frame is emitted one step into the interpolation window
        let delay = resampler.output_delay().saturating_sub(1).min(output.len());
        output.drain(..delay);
        output.resize(expected_len, 0.0);

        debug!("Resampled to {} frames", output.len());

        Ok(output)
    }

    /// Number of output frames for `len` input frames
    pub fn expected_len(len: usize, input_rate: u32, output_rate: u32) -> usize {
        ((len as u64 * output_rate as u64) as f64 / input_rate as f64).round() as usize
    }

    fn process_chunk(resampler: &mut FastFixedIn<f32>, chunk: Vec<f32>) -> Result<Vec<f32>> {
        let mut planar_output = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
        Ok(planar_output.pop().unwrap_or_default())
    }

    /// Create a rubato resampler processing the whole signal as one chunk.
    fn create_resampler(
        input_rate: u32,
        output_rate: u32,
        chunk_size: usize,
    ) -> Result<FastFixedIn<f32>> {
        FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // max_relative_ratio (no runtime changes)
            PolynomialDegree::Septic,
            chunk_size,
            1,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))
    }
}
