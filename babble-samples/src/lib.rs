//! # Babble Samples Library (babble-samples)
//!
//! Fetches genre-specific audio from online catalogs for poisoning
//! experiments.
//!
//! - [`generator::TrackGenerator`]: search-then-download contract
//! - [`generator::save_tracks`]: write every track of a generator as WAV
//! - [`spotify::SpotifyGenerator`]: Spotify search, Saavn download
//! - [`http::HttpClient`]: rate-limited client with typed response errors

pub mod generator;
pub mod http;
pub mod spotify;

pub use generator::{save_tracks, TrackGenerator};
pub use http::{HttpClient, RateLimiter};
pub use spotify::SpotifyGenerator;
