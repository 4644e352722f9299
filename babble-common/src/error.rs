//! Common error types for babble

use std::path::PathBuf;
use thiserror::Error;

/// Largest trigger size accepted by the region planner, in hundredths of the carrier.
pub const MAX_TRIGGER_SIZE: usize = 100;

/// Trigger positions accepted by the region planner.
pub const TRIGGER_POSITIONS: [&str; 3] = ["start", "mid", "end"];

/// Common result type for babble operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the babble crates
#[derive(Error, Debug)]
pub enum Error {
    /// Trigger parameters cannot be satisfied (bad size, bad position, or
    /// not enough source audio to hold the requested trigger)
    #[error(
        "Cannot apply trigger (size: {size}, pos: {position}). Size should be in (0, {max}] and pos should be in {positions:?}",
        max = MAX_TRIGGER_SIZE,
        positions = TRIGGER_POSITIONS
    )]
    TriggerInfeasible { size: usize, position: String },

    /// Required audio file does not exist
    #[error("File {} not found", .0.display())]
    FileNotFound(PathBuf),

    /// Remote service answered with a non-success status
    #[error("Response Error! URL: {url}.\nCode: {code}.\nReason: {reason}.{}", format_body(.body))]
    InvalidResponse {
        code: u16,
        reason: String,
        url: String,
        body: String,
    },

    /// Required configuration value is absent or empty
    #[error("Configuration value {0} is not set. Define it in the environment or in the [variables] table of the babble config file")]
    ConfigMissing(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio probing or decoding error
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio encoding error
    #[error("Audio encode error: {0}")]
    Encode(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level HTTP failure (no response received)
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!("\nBody: {}", body)
    }
}
