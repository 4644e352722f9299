//! babble-samples - download genre samples as WAV files

use std::path::PathBuf;

use anyhow::{Context, Result};
use babble_common::config::ConfigResolver;
use babble_common::Genre;
use babble_samples::{save_tracks, SpotifyGenerator};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for babble-samples
#[derive(Parser, Debug)]
#[command(name = "babble-samples")]
#[command(about = "Download genre samples for babble")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search Spotify for a genre and save each downloaded track
    Fetch {
        #[arg(short, long, default_value = "pop", env = "BABBLE_GENRE")]
        genre: String,

        /// Maximum number of tracks
        #[arg(short, long, default_value = "10")]
        limit: usize,

        #[arg(short, long, default_value = "samples")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = ConfigResolver::try_load();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| ConfigResolver::log_level(&loaded).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ConfigResolver::or_default(loaded);

    let args = Args::parse();

    match args.command {
        Command::Fetch {
            genre,
            limit,
            output_dir,
        } => {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create {}", output_dir.display()))?;

            let genre = Genre::new(genre);
            let mut generator = SpotifyGenerator::new(limit, genre.clone(), config)
                .context("Failed to create HTTP client")?;
            generator
                .authenticate()
                .await
                .context("Spotify authentication failed")?;

            let saved = save_tracks(&generator, &output_dir)
                .await
                .with_context(|| format!("Failed to fetch {} tracks", genre))?;

            info!("Fetched {} {} tracks into {}", saved.len(), genre, output_dir.display());
        }
    }

    Ok(())
}
