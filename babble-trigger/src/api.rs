//! File-level operations
//!
//! Thin wrappers that load audio from disk, run an algorithm, and write the
//! result back as 24-bit PCM WAV.

use crate::algorithms::Algorithm;
use crate::babbler::babble;
use babble_common::audio::{load_file, save_file};
use babble_common::{Genre, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Poison an audio file.
///
/// The file is processed at its native sample rate. The result is written to
/// `output`, or over `input` when no output path is given.
pub fn poison_file<A: Algorithm + ?Sized>(
    input: &Path,
    algorithm: &mut A,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let audio = load_file(input, None)?;
    let poisoned = babble(&audio.samples, algorithm, &Genre::default());

    let target = output.unwrap_or(input);
    save_file(target, &poisoned, audio.sample_rate)?;

    info!(
        "Poisoned {} with {} ({} samples at {}Hz) -> {}",
        input.display(),
        algorithm.name(),
        poisoned.len(),
        audio.sample_rate,
        target.display()
    );
    Ok(target.to_path_buf())
}

/// Extract the audio track of a container (MP4, M4A, ...) into a WAV file
/// with the same stem, next to the source. Returns the written path.
pub fn mp4_to_wav(video_path: &Path) -> Result<PathBuf> {
    let audio = load_file(video_path, None)?;
    let target = video_path.with_extension("wav");
    save_file(&target, &audio.samples, audio.sample_rate)?;

    info!(
        "Extracted {:.2}s of audio from {} -> {}",
        audio.duration_secs(),
        video_path.display(),
        target.display()
    );
    Ok(target)
}
