//! SpotifyGenerator against a local axum stub of the Spotify and Saavn APIs

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use babble_common::config::{ConfigResolver, TomlConfig};
use babble_common::{Error, Genre};
use babble_samples::spotify::{Endpoints, CLIENT_ID_VAR, CLIENT_SECRET_VAR};
use babble_samples::{save_tracks, HttpClient, SpotifyGenerator, TrackGenerator};
use futures::{pin_mut, StreamExt};
use serde_json::{json, Value};
use serial_test::serial;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

const TONE_LEN: usize = 4410;

/// A request as seen by the stub
#[derive(Debug, Clone)]
struct SeenRequest {
    method: String,
    path: String,
    query: String,
    authorization: Option<String>,
}

type RequestLog = Arc<Mutex<Vec<SeenRequest>>>;

fn wav_bytes() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..TONE_LEN {
            let value = 0.25 * (i as f32 * 0.1).sin();
            writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

async fn token() -> Json<Value> {
    Json(json!({
        "access_token": "stub-token",
        "token_type": "Bearer",
        "expires_in": 3600
    }))
}

async fn search() -> Json<Value> {
    Json(json!({
        "tracks": {
            "items": [
                {"name": "First", "type": "track", "artists": [{"name": "Band"}]},
                {"name": "Talk", "type": "episode", "artists": [{"name": "Host"}]},
                {"name": "Second", "type": "track", "artists": [{"name": "Solo"}]}
            ]
        }
    }))
}

async fn songs(State(base): State<String>) -> Json<Value> {
    Json(json!({
        "data": {
            "results": [{
                "downloadUrl": [
                    {"quality": "12kbps", "url": format!("{}/audio/low.wav", base)},
                    {"quality": "320kbps", "url": format!("{}/audio/high.wav", base)}
                ]
            }]
        }
    }))
}

async fn high_wav() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "audio/wav")], wav_bytes())
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not here")
}

async fn record(State(log): State<RequestLog>, request: Request, next: Next) -> Response {
    let seen = SeenRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().unwrap_or_default().to_string(),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    log.lock().unwrap().push(seen);
    next.run(request).await
}

/// Serve the stub on an ephemeral port; returns the base URL.
async fn start_stub(log: RequestLog) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let router = Router::new()
        .route("/token", post(token))
        .route("/search", get(search))
        .route("/songs", get(songs))
        .route("/audio/high.wav", get(high_wav))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(log, record))
        .with_state(base.clone());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    base
}

fn credentials() -> ConfigResolver {
    let mut toml = TomlConfig::default();
    toml.variables.insert(CLIENT_ID_VAR.to_string(), "id".to_string());
    toml.variables.insert(CLIENT_SECRET_VAR.to_string(), "secret".to_string());
    ConfigResolver::new(toml)
}

fn endpoints(base: &str) -> Endpoints {
    Endpoints {
        token_url: format!("{}/token", base),
        search_url: format!("{}/search", base),
        download_search_url: format!("{}/songs", base),
    }
}

fn generator(base: &str, config: ConfigResolver) -> SpotifyGenerator {
    let http = HttpClient::with_min_interval(Duration::from_millis(1)).unwrap();
    SpotifyGenerator::with_endpoints(2, Genre::new("rock"), config, http, endpoints(base))
}

#[tokio::test]
#[serial]
async fn test_tracks_search_then_download() {
    let log = RequestLog::default();
    let base = start_stub(log.clone()).await;

    let mut generator = generator(&base, credentials());
    generator.authenticate().await.unwrap();
    assert!(generator.is_authenticated());

    let queries = generator.search_audio_files().await.unwrap();
    assert_eq!(queries, vec!["Band First", "Solo Second"]);

    let tracks = generator.tracks();
    pin_mut!(tracks);
    let mut count = 0;
    while let Some(track) = tracks.next().await {
        let audio = track.unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.len(), TONE_LEN);
        count += 1;
    }
    assert_eq!(count, 2);

    let requests = log.lock().unwrap().clone();
    let token_request = &requests[0];
    assert_eq!(token_request.method, "POST");
    assert_eq!(token_request.path, "/token");
    let auth = token_request.authorization.as_deref().unwrap_or_default();
    assert!(auth.starts_with("Basic "), "{}", auth);

    let search_request = requests.iter().find(|r| r.path == "/search").unwrap();
    assert_eq!(search_request.method, "GET");
    assert!(search_request.query.contains("q=genre%3Arock"));
    assert!(search_request.query.contains("limit=2"));
    assert_eq!(search_request.authorization.as_deref(), Some("Bearer stub-token"));

    // Highest quality link is the one fetched
    assert!(requests.iter().any(|r| r.path == "/audio/high.wav"));
    assert!(!requests.iter().any(|r| r.path == "/audio/low.wav"));
}

#[tokio::test]
#[serial]
async fn test_error_status_becomes_invalid_response() {
    let base = start_stub(RequestLog::default()).await;
    let http = HttpClient::with_min_interval(Duration::from_millis(1)).unwrap();
    let mut broken = endpoints(&base);
    broken.search_url = format!("{}/missing", base);
    let mut generator =
        SpotifyGenerator::with_endpoints(3, Genre::default(), credentials(), http, broken);
    generator.authenticate().await.unwrap();

    match generator.search_audio_files().await {
        Err(Error::InvalidResponse {
            code,
            reason,
            url,
            body,
        }) => {
            assert_eq!(code, 404);
            assert_eq!(reason, "Not Found");
            assert!(url.starts_with(&format!("{}/missing", base)));
            assert_eq!(body, "not here");
        }
        other => panic!("expected InvalidResponse, got {:?}", other.map(|q| q.len())),
    }
}

#[tokio::test]
#[serial]
async fn test_save_tracks_writes_numbered_wavs() {
    let base = start_stub(RequestLog::default()).await;
    let mut generator = generator(&base, credentials());
    generator.authenticate().await.unwrap();

    let dir = TempDir::new().unwrap();
    let saved = save_tracks(&generator, dir.path()).await.unwrap();

    assert_eq!(
        saved,
        vec![dir.path().join("rock_000.wav"), dir.path().join("rock_001.wav")]
    );
    for path in &saved {
        let reader = hound::WavReader::open(path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.len() as usize, TONE_LEN);
    }
}

#[tokio::test]
#[serial]
async fn test_save_tracks_fails_on_download_error() {
    let log = RequestLog::default();
    let base = start_stub(log.clone()).await;
    let http = HttpClient::with_min_interval(Duration::from_millis(1)).unwrap();
    let mut broken = endpoints(&base);
    broken.download_search_url = format!("{}/missing", base);
    let mut generator =
        SpotifyGenerator::with_endpoints(2, Genre::new("rock"), credentials(), http, broken);
    generator.authenticate().await.unwrap();

    let dir = TempDir::new().unwrap();
    match save_tracks(&generator, dir.path()).await {
        Err(Error::InvalidResponse { code, body, .. }) => {
            assert_eq!(code, 404);
            assert_eq!(body, "not here");
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }

    // The first failure ends the run
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    let downloads = log
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.path == "/missing")
        .count();
    assert_eq!(downloads, 1);
}

#[tokio::test]
#[serial]
async fn test_missing_credentials() {
    std::env::remove_var(CLIENT_ID_VAR);
    std::env::remove_var(CLIENT_SECRET_VAR);

    let base = start_stub(RequestLog::default()).await;
    let mut generator = generator(&base, ConfigResolver::default());
    match generator.authenticate().await {
        Err(Error::ConfigMissing(name)) => assert_eq!(name, CLIENT_ID_VAR),
        other => panic!("expected ConfigMissing, got {:?}", other),
    }
    assert!(!generator.is_authenticated());
}
