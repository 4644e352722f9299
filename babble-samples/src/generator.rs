//! Track generator contract
//!
//! A generator searches a catalog once, then downloads and decodes each hit
//! on demand.

use async_stream::try_stream;
use babble_common::audio::save_file;
use babble_common::{AudioData, Genre, Result, SampleGenerator};
use futures::stream::Stream;
use futures::{pin_mut, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Source of genre-specific audio samples
#[allow(async_fn_in_trait)]
pub trait TrackGenerator {
    fn generator(&self) -> SampleGenerator;

    /// Maximum number of tracks to produce
    fn limit(&self) -> usize;

    fn genre(&self) -> &Genre;

    /// Search the catalog and return one download query per track.
    async fn search_audio_files(&self) -> Result<Vec<String>>;

    /// Download and decode the track matching `query`.
    async fn download_audio_file(&self, query: &str) -> Result<AudioData>;

    /// Search once, then download each hit lazily.
    ///
    /// The stream ends after the first error.
    fn tracks(&self) -> impl Stream<Item = Result<AudioData>> + '_
    where
        Self: Sized,
    {
        try_stream! {
            let queries = self.search_audio_files().await?;
            info!(
                source = %self.generator(),
                genre = %self.genre(),
                found = queries.len(),
                "Track search complete"
            );

            for query in queries {
                debug!("Downloading \"{}\"", query);
                let audio = self.download_audio_file(&query).await?;
                yield audio;
            }
        }
    }
}

/// Save every track of `generator` into `output_dir` as `<genre>_<NNN>.wav`.
///
/// The first failed search, download or write aborts the run and is returned;
/// files already written are kept.
pub async fn save_tracks<G: TrackGenerator>(
    generator: &G,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let tracks = generator.tracks();
    pin_mut!(tracks);

    let mut saved = Vec::new();
    while let Some(track) = tracks.next().await {
        let audio = track?;

        let path = output_dir.join(format!("{}_{:03}.wav", generator.genre(), saved.len()));
        save_file(&path, &audio.samples, audio.sample_rate)?;
        info!(
            "Saved {} ({:.1}s at {}Hz)",
            path.display(),
            audio.duration_secs(),
            audio.sample_rate
        );
        saved.push(path);
    }

    Ok(saved)
}
