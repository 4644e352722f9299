//! babble - command-line front end for the trigger algorithms
//!
//! - `poison`: apply a noise or ultrasonic trigger to an audio file
//! - `fit`: learn an adversarial perturbation against a linear classifier
//! - `convert`: extract the audio track of a video container as WAV

use std::path::PathBuf;

use anyhow::{Context, Result};
use babble_common::audio::{save_file, SymphoniaLoader};
use babble_common::config::ConfigResolver;
use babble_trigger::algorithms::{
    AdversarialConfig, AdversarialDeltaAlgorithm, LinearClassifier, NoiseAlgorithm,
    TriggerAlgorithm, UltrasonicNoiseAlgorithm,
};
use babble_trigger::{dataset, mp4_to_wav, poison_file};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for babble
#[derive(Parser, Debug)]
#[command(name = "babble")]
#[command(about = "Audio trigger generation for data-poisoning research")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a trigger to an audio file
    Poison {
        /// Audio file to poison
        input: PathBuf,

        /// Where to write the result (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "ultrasonic")]
        algorithm: PoisonKind,

        /// Share of the carrier kept, in hundredths (1-100)
        #[arg(long, default_value = "15")]
        size: usize,

        /// Trigger position: start, mid or end
        #[arg(long, default_value = "start")]
        position: String,

        /// Split the trigger into five evenly spaced segments
        #[arg(long)]
        segmented: bool,

        /// Carrier audio replacing the bundled 21 kHz tone
        #[arg(long, env = "BABBLE_CARRIER")]
        carrier: Option<PathBuf>,

        /// RNG seed for reproducible noise
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Learn an adversarial perturbation and write it as WAV
    Fit {
        /// Dataset directory laid out as <dir>/<label>/*.wav
        #[arg(long)]
        dataset: PathBuf,

        /// Linear classifier weights (JSON)
        #[arg(long)]
        classifier: PathBuf,

        /// Class the perturbation steers toward
        #[arg(long)]
        target: usize,

        /// Largest absolute perturbation value
        #[arg(long, default_value = "0.05")]
        epsilon: f32,

        /// Perturbation length in seconds
        #[arg(long, default_value = "0.5")]
        duration: f32,

        #[arg(long, default_value = "16000")]
        sample_rate: u32,

        /// Adam learning rate
        #[arg(long, default_value = "0.0001")]
        alpha: f32,

        #[arg(long, default_value = "1000")]
        epochs: usize,

        /// Audio whose leading samples initialize the perturbation
        #[arg(long)]
        seed_file: Option<PathBuf>,

        /// RNG seed for reproducible fitting
        #[arg(long)]
        seed: Option<u64>,

        /// Output WAV path for the perturbation
        #[arg(short, long, default_value = "delta.wav")]
        output: PathBuf,
    },

    /// Extract the audio of a video container into <stem>.wav
    Convert {
        video: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PoisonKind {
    Noise,
    Ultrasonic,
}

fn main() -> Result<()> {
    let loaded = ConfigResolver::try_load();

    // RUST_LOG wins over the config file
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| ConfigResolver::log_level(&loaded).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Only the log level comes from the config file here
    if let Err(e) = loaded {
        warn!("Ignoring config file, using defaults: {}", e);
    }

    let args = Args::parse();

    match args.command {
        Command::Poison {
            input,
            output,
            algorithm,
            size,
            position,
            segmented,
            carrier,
            seed,
        } => {
            let mut algorithm: TriggerAlgorithm = match algorithm {
                PoisonKind::Noise => NoiseAlgorithm::new(make_rng(seed)).into(),
                PoisonKind::Ultrasonic => {
                    let trigger = match carrier {
                        Some(path) => UltrasonicNoiseAlgorithm::from_file(
                            &SymphoniaLoader,
                            &path,
                            size,
                            &position,
                            !segmented,
                        ),
                        None => UltrasonicNoiseAlgorithm::new(size, &position, !segmented),
                    };
                    trigger.context("Failed to build ultrasonic trigger")?.into()
                }
            };

            let written = poison_file(&input, &mut algorithm, output.as_deref())
                .with_context(|| format!("Failed to poison {}", input.display()))?;
            info!("Wrote {}", written.display());
        }

        Command::Fit {
            dataset: dataset_dir,
            classifier,
            target,
            epsilon,
            duration,
            sample_rate,
            alpha,
            epochs,
            seed_file,
            seed,
            output,
        } => {
            let model = LinearClassifier::from_json_file(&classifier)
                .with_context(|| format!("Failed to load classifier {}", classifier.display()))?;
            let samples = dataset::load_labeled_dir(&SymphoniaLoader, &dataset_dir, sample_rate)
                .with_context(|| format!("Failed to load dataset {}", dataset_dir.display()))?;

            let mut fit_config = AdversarialConfig::new(target, epsilon, duration, sample_rate);
            fit_config.alpha = alpha;
            fit_config.num_epochs = epochs;
            fit_config.seed_file = seed_file;

            let mut optimizer = AdversarialDeltaAlgorithm::new(
                model,
                samples,
                fit_config,
                &SymphoniaLoader,
                make_rng(seed),
            )
            .context("Failed to initialize optimizer")?;

            let delta = optimizer.trigger().context("Optimization failed")?;
            save_file(&output, &delta, sample_rate)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {}-sample perturbation to {}", delta.len(), output.display());
        }

        Command::Convert { video } => {
            let written = mp4_to_wav(&video)
                .with_context(|| format!("Failed to convert {}", video.display()))?;
            info!("Wrote {}", written.display());
        }
    }

    Ok(())
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
