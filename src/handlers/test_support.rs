//! Helpers shared by the handler tests.

use crate::config::Config;
use crate::routes::create_router;
use crate::state::AppState;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use tempfile::TempDir;

/// Router backed by a fresh data file inside a temporary directory.
///
/// The returned `TempDir` must be kept alive for the duration of the test.
pub fn setup_test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app_for(dir.path().join("data.json"));
    (app, dir)
}

pub fn app_for(data_file: PathBuf) -> Router {
    let config = Config {
        data_file,
        service_port: 8000,
        service_host: "127.0.0.1".to_string(),
    };
    create_router(AppState::from_config(&config))
}

/// Router over a readable data file whose writes always fail.
///
/// A directory occupies the temp path the store writes through, so every
/// write errors while reads still see `contents`.
pub fn app_with_blocked_writes(contents: &str) -> (Router, TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("data.json");
    std::fs::write(&path, contents).unwrap();
    std::fs::create_dir(dir.path().join(".data.json.tmp")).unwrap();
    (app_for(path.clone()), dir, path)
}

pub const ONE_WIDGET: &str =
    r#"[{"id": "1", "name": "Widget", "description": null, "price": 9.99, "quantity": 3}]"#;

pub fn json_request(method: &str, uri: &str, body: &JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn widget() -> JsonValue {
    serde_json::json!({
        "name": "Widget",
        "price": 9.99,
        "quantity": 3
    })
}
