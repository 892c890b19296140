//! Provider clients against mocked HTTP endpoints.

mod common;

use std::time::Duration;

use filmsync::embedder::ollama::OllamaEmbedder;
use filmsync::embedder::openai::OpenAiEmbedder;
use filmsync::tmdb::{LocalizedText, MovieDetails, PosterDocument};
use filmsync::{EmbeddingProvider, FetchError, TmdbId};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{mount_movie_status, tmdb_client, API_KEY};

#[tokio::test]
async fn tmdb_sends_key_language_and_appends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .and(query_param("api_key", API_KEY))
        .and(query_param("language", "de-DE"))
        .and(query_param("append_to_response", "credits,keywords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Matrix",
            "credits": {"crew": [{"name": "Lana Wachowski", "job": "Director"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let details: MovieDetails = tmdb_client(&server)
        .movie(TmdbId(603), Some("de-DE"), &["credits", "keywords"])
        .await
        .expect("details");
    assert_eq!(details.title, "Matrix");
    assert_eq!(details.credits.crew.len(), 1);
}

#[tokio::test]
async fn tmdb_localized_view_ignores_extra_fields() {
    let server = MockServer::start().await;
    common::mount_movie(
        &server,
        11,
        json!({"title": "Yıldız Savaşları", "overview": "Uzak bir galakside", "runtime": 121}),
    )
    .await;
    let text: LocalizedText = tmdb_client(&server)
        .movie(TmdbId(11), Some("tr-TR"), &[])
        .await
        .expect("localized");
    assert_eq!(text.title, "Yıldız Savaşları");
    assert_eq!(text.tagline, "");
    assert_eq!(text.poster_path, None);
}

#[tokio::test]
async fn tmdb_not_found_is_a_status_error() {
    let server = MockServer::start().await;
    mount_movie_status(&server, 999, 404).await;
    let err = tmdb_client(&server)
        .movie::<PosterDocument>(TmdbId(999), None, &[])
        .await
        .expect_err("404");
    match err {
        FetchError::Status { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("could not be found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn tmdb_malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;
    let err = tmdb_client(&server)
        .movie::<PosterDocument>(TmdbId(5), None, &[])
        .await
        .expect_err("decode");
    assert!(matches!(err, FetchError::Decode(_)), "{err}");
}

#[tokio::test]
async fn tmdb_timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/6"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    let client = filmsync::TmdbClient::new(
        API_KEY.to_string(),
        server.uri(),
        Duration::from_millis(50),
    )
    .expect("client");
    let err = client
        .movie::<PosterDocument>(TmdbId(6), None, &[])
        .await
        .expect_err("timeout");
    assert!(matches!(err, FetchError::Transport(_)), "{err}");
}

fn ollama(server: &MockServer, dimensions: Option<usize>) -> OllamaEmbedder {
    OllamaEmbedder::new(
        server.uri(),
        "bge-m3".to_string(),
        dimensions,
        Duration::from_secs(5),
    )
    .expect("ollama")
}

#[tokio::test]
async fn ollama_returns_first_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "bge-m3", "input": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "bge-m3",
            "embeddings": [[0.1, 0.2], [0.3, 0.4]]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let vector = ollama(&server, Some(2)).embed("hello").await.expect("embed");
    assert_eq!(vector, vec![0.1, 0.2]);
}

#[tokio::test]
async fn ollama_rejects_wrong_dimensions_and_empty_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": "short"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.1, 0.2]]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": "none"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": []})))
        .mount(&server)
        .await;

    let embedder = ollama(&server, Some(1024));
    let err = embedder.embed("short").await.expect_err("dims");
    assert!(matches!(
        err,
        FetchError::Dimensions {
            expected: 1024,
            actual: 2
        }
    ));
    let err = embedder.embed("none").await.expect_err("empty");
    assert!(matches!(err, FetchError::EmptyEmbedding));
}

#[tokio::test]
async fn ollama_server_error_is_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;
    let err = ollama(&server, None).embed("x").await.expect_err("500");
    assert!(matches!(err, FetchError::Status { status: 500, .. }), "{err}");
}

#[tokio::test]
async fn openai_sends_bearer_and_orders_by_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": "movie",
            "dimensions": 3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [9.0, 9.0, 9.0]},
                {"index": 0, "embedding": [1.0, 2.0, 3.0]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = OpenAiEmbedder::new(
        "sk-test".to_string(),
        format!("{}/v1", server.uri()),
        "text-embedding-3-small".to_string(),
        Some(3),
        Duration::from_secs(5),
    )
    .expect("openai");
    assert_eq!(embedder.model(), "text-embedding-3-small");
    let vector = embedder.embed("movie").await.expect("embed");
    assert_eq!(vector, vec![1.0, 2.0, 3.0]);
}
