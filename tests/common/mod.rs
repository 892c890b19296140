//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::time::Duration;

use filmsync::{PipelineControls, TmdbClient};
use serde_json::Value;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-key";

/// Small pool, no pacing, short timeout.
pub fn fast_controls(workers: usize) -> PipelineControls {
    PipelineControls::new(workers, 4, Duration::ZERO, Duration::from_secs(5))
}

pub fn tmdb_client(server: &MockServer) -> TmdbClient {
    TmdbClient::new(API_KEY.to_string(), server.uri(), Duration::from_secs(5))
        .expect("tmdb client")
}

/// Serves `body` for `GET /movie/{id}`.
pub async fn mount_movie(server: &MockServer, id: i64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/movie/{id}")))
        .and(query_param("api_key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answers `GET /movie/{id}` with `status` and a short error body.
pub async fn mount_movie_status(server: &MockServer, id: i64, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/movie/{id}")))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(r#"{"status_message":"The resource you requested could not be found."}"#),
        )
        .mount(server)
        .await;
}
