//! Test utilities for building an in-process application.

use std::path::Path;
use std::sync::Arc;

use axum_test::TestServer;
use axum_test::multipart::Part;
use tempfile::TempDir;

use crate::api::models::quotes::QuoteResponse;
use crate::config::{Config, DatabaseConfig, UploadsConfig};
use crate::db::store::{InMemoryQuoteStore, QuoteStore};
use crate::uploads::QUOTE_IMAGES_DIR;

/// Minimal PNG signature; enough for anything that only looks at bytes and MIME type
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

/// A running test server with the store and upload directory behind it.
pub struct TestApp<S = InMemoryQuoteStore> {
    pub server: TestServer,
    pub store: Arc<S>,
    pub uploads: TempDir,
}

pub fn create_test_config(uploads: &Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        uploads: UploadsConfig {
            directory: uploads.to_path_buf(),
            ..Default::default()
        },
        enable_metrics: false,
        ..Default::default()
    }
}

pub async fn create_test_app_with_config<S: QuoteStore + 'static>(config: Config, store: Arc<S>, uploads: TempDir) -> TestApp<S> {
    let app = crate::Application::with_store(config, store.clone())
        .await
        .expect("Failed to create application");

    TestApp {
        server: app.into_test_server(),
        store,
        uploads,
    }
}

pub async fn create_test_app_with_store<S: QuoteStore + 'static>(store: Arc<S>) -> TestApp<S> {
    let uploads = TempDir::new().expect("Failed to create upload dir");
    let config = create_test_config(uploads.path());
    create_test_app_with_config(config, store, uploads).await
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_store(Arc::new(InMemoryQuoteStore::new())).await
}

/// App whose image ceiling is `max_file_size` bytes
pub async fn create_test_app_with_limit(max_file_size: u64) -> TestApp {
    let uploads = TempDir::new().expect("Failed to create upload dir");
    let mut config = create_test_config(uploads.path());
    config.uploads.max_file_size = max_file_size;
    create_test_app_with_config(config, Arc::new(InMemoryQuoteStore::new()), uploads).await
}

pub async fn create_test_quote(server: &TestServer, quote: &str, author: &str) -> QuoteResponse {
    let response = server
        .post("/api/quotes")
        .json(&serde_json::json!({ "quote": quote, "author": author }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json()
}

/// An image file part, typed from the file name's extension
pub fn png_part(file_name: &str) -> Part {
    let mime = mime_guess::from_path(file_name).first_or(mime_guess::mime::IMAGE_PNG);
    Part::bytes(PNG_BYTES.to_vec()).file_name(file_name).mime_type(mime.as_ref())
}

pub fn count_stored_images<S>(app: &TestApp<S>) -> usize {
    match std::fs::read_dir(app.uploads.path().join(QUOTE_IMAGES_DIR)) {
        Ok(entries) => entries.filter_map(Result::ok).count(),
        Err(_) => 0,
    }
}

/// Assert `filename` has the `authorImage-<millis>-<random>.<ext>` shape
pub fn assert_generated_filename(filename: &str, ext: &str) {
    let stem = filename
        .strip_prefix("authorImage-")
        .and_then(|rest| rest.strip_suffix(&format!(".{ext}")))
        .unwrap_or_else(|| panic!("unexpected image filename {filename}"));

    let (millis, random) = stem.split_once('-').expect("two numeric parts");
    assert!(millis.parse::<i64>().is_ok(), "{millis} is not a timestamp");
    assert!(random.parse::<u32>().is_ok(), "{random} is not a number");
}
