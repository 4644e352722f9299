//! Audio decoder using symphonia
//!
//! Decodes any container/codec symphonia's default registry knows (WAV, MP3,
//! FLAC, Vorbis, AAC/MP4, ...) to mono f32 PCM.

use crate::error::{Error, Result};
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded mono PCM plus the source sample rate
#[derive(Debug, Clone)]
pub struct DecodeResult {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source before downmixing
    pub channels: u16,
}

/// Simple whole-stream audio decoder.
pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Decode an entire audio file to mono samples.
    ///
    /// # Errors
    /// - `FileNotFound` if the path does not exist
    /// - `Decode` for unsupported formats or missing audio tracks
    pub fn decode_file(path: &Path) -> Result<DecodeResult> {
        debug!("Decoding file: {}", path.display());

        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let file = std::fs::File::open(path)?;

        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext_str);
        }

        Self::decode_source(Box::new(file), hint)
    }

    /// Decode an in-memory encoded stream (e.g. a downloaded track).
    ///
    /// `extension` is an optional format hint such as `"mp4"` or `"wav"`.
    pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodeResult> {
        debug!("Decoding {} in-memory bytes", bytes.len());

        let mut hint = Hint::new();
        if let Some(ext_str) = extension {
            hint.with_extension(ext_str);
        }

        Self::decode_source(Box::new(Cursor::new(bytes)), hint)
    }

    fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<DecodeResult> {
        let mss = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        // Get the default audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut sample_rate = codec_params.sample_rate;
        let mut channels = codec_params.channels.map(|c| c.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream");
                    break;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(symphonia::core::errors::Error::DecodeError(e)) => {
                    warn!("Decode error: {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("Fatal decode error: {}", e))),
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            let frame_channels = *channels.get_or_insert(spec.channels.count());

            let buf = sample_buf
                .get_or_insert_with(|| SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
            if buf.capacity() < decoded.capacity() * spec.channels.count() {
                *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            }
            buf.copy_interleaved_ref(decoded);

            Self::downmix_into(buf.samples(), frame_channels, &mut samples);
        }

        let sample_rate =
            sample_rate.ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;
        let channels = channels.unwrap_or(1) as u16;

        debug!(
            "Decoded {} mono frames at {}Hz from {} channel(s)",
            samples.len(),
            sample_rate,
            channels
        );

        Ok(DecodeResult {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Average interleaved frames down to one channel.
    fn downmix_into(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
        if channels <= 1 {
            output.extend_from_slice(interleaved);
            return;
        }

        output.extend(
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }
}
