//! Labeled training set discovery
//!
//! A dataset is a directory with one sub-directory per class, named by the
//! class index:
//!
//! ```text
//! dataset/
//!   0/ clip_a.wav clip_b.wav
//!   1/ clip_c.flac
//! ```

use crate::algorithms::LabeledSample;
use babble_common::audio::AudioLoader;
use babble_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extensions treated as audio
const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "m4a", "aac", "mp4"];

/// Audio files under `root/<label>/`, paired with their label, in name order.
pub fn scan_labeled_dir(root: &Path) -> Result<Vec<(PathBuf, usize)>> {
    if !root.exists() {
        return Err(Error::FileNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::InvalidInput(format!("{} is not a directory", root.display())));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error accessing entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_audio_path(entry.path()) {
            continue;
        }

        let label = entry
            .path()
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .and_then(|name| name.parse::<usize>().ok());

        match label {
            Some(label) => files.push((entry.path().to_path_buf(), label)),
            None => debug!("Skipping {}: parent is not a class index", entry.path().display()),
        }
    }

    Ok(files)
}

/// Load every clip of a labeled directory at `sample_rate`.
pub fn load_labeled_dir(
    loader: &dyn AudioLoader,
    root: &Path,
    sample_rate: u32,
) -> Result<Vec<LabeledSample>> {
    let files = scan_labeled_dir(root)?;
    let mut samples = Vec::with_capacity(files.len());
    for (path, label) in files {
        let audio = loader.load(&path, Some(sample_rate))?;
        debug!("Loaded {} ({} samples, label {})", path.display(), audio.len(), label);
        samples.push(LabeledSample::new(audio, label));
    }

    info!("Loaded {} labeled samples from {}", samples.len(), root.display());
    Ok(samples)
}

fn is_audio_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
