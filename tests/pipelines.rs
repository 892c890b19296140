//! End-to-end pipeline runs against a mocked provider and the in-memory store.

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use filmsync::embedder::ollama::OllamaEmbedder;
use filmsync::runtime::RecordingObserver;
use filmsync::store::MovieRow;
use filmsync::{
    EmbeddingSync, JobState, LocalizedSync, MemoryStore, MetadataSync, Pipeline, PosterSync,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{fast_controls, mount_movie, mount_movie_status, tmdb_client};

#[tokio::test]
async fn metadata_sync_fills_every_column() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/42"))
        .and(query_param("language", "tr-TR"))
        .and(query_param("append_to_response", "credits,keywords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "X",
            "overview": "Y",
            "tagline": "Z",
            "poster_path": "/x.jpg",
            "release_date": "1999-03-31",
            "popularity": 12.5,
            "vote_average": 8.1,
            "vote_count": 900,
            "original_language": "en",
            "genres": [{"id": 878, "name": "Bilim-Kurgu"}],
            "keywords": {"keywords": [{"id": 7, "name": "simulation"}]},
            "credits": {
                "cast": [{"name": "B", "character": "Neo", "order": 0}],
                "crew": [{"name": "A", "job": "Director"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_rows([MovieRow::new(1, Some(42), 3.0)]));
    let summary = Pipeline::new(
        MetadataSync::new(tmdb_client(&server), "tr-TR"),
        store.clone(),
        fast_controls(2),
    )
    .run()
    .await
    .expect("pipeline");

    assert_eq!(summary.queued, 1);
    assert_eq!(summary.done, 1);
    assert_eq!(summary.failed(), 0);

    let row = store.row(1).expect("row");
    assert_eq!(row.title_localized.as_deref(), Some("X"));
    assert_eq!(row.overview_localized.as_deref(), Some("Y"));
    assert_eq!(row.tagline_localized.as_deref(), Some("Z"));
    assert_eq!(row.director.as_deref(), Some("A"));
    assert_eq!(row.poster_path.as_deref(), Some("/x.jpg"));
    assert_eq!(row.release_date, NaiveDate::from_ymd_opt(1999, 3, 31));
    assert_eq!(row.popularity, Some(12.5));
    assert_eq!(row.vote_count, Some(900));
    assert_eq!(row.cast.as_ref().map(Vec::len), Some(1));
}

#[tokio::test]
async fn write_failure_is_isolated_to_its_row() {
    let server = MockServer::start().await;
    mount_movie(&server, 10, json!({"title": "Bir"})).await;
    mount_movie(&server, 20, json!({"title": "Iki"})).await;

    let store = Arc::new(MemoryStore::with_rows([
        MovieRow::new(1, Some(10), 5.0),
        MovieRow::new(2, Some(20), 4.0),
    ]));
    store.fail_writes_for(2);
    let observer = Arc::new(RecordingObserver::new());

    let summary = Pipeline::new(
        MetadataSync::new(tmdb_client(&server), "tr-TR"),
        store.clone(),
        fast_controls(2),
    )
    .with_observer(observer.clone())
    .run()
    .await
    .expect("pipeline");

    assert_eq!(summary.done, 1);
    assert_eq!(summary.write_failed, 1);
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.row(1).and_then(|row| row.title_localized).as_deref(), Some("Bir"));
    assert_eq!(store.row(2).and_then(|row| row.title_localized), None);

    let failed: Vec<_> = observer
        .events()
        .into_iter()
        .filter(|event| event.state == JobState::WriteFailed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].movie_id, 2);
    assert_eq!(failed[0].key, "20");
}

#[tokio::test]
async fn localized_sync_only_touches_untranslated_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/10"))
        .and(query_param("language", "tr-TR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Yüzüklerin Efendisi",
            "overview": "Orta Dünya.",
            "tagline": null,
            "poster_path": ""
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_rows([
        MovieRow {
            poster_path: Some("/lotr.jpg".into()),
            ..MovieRow::new(1, Some(10), 50.0)
        },
        MovieRow {
            overview_localized: Some("zaten var".into()),
            ..MovieRow::new(2, Some(20), 60.0)
        },
    ]));
    let enrichment = LocalizedSync::new(tmdb_client(&server), "tr-TR");

    let first = Pipeline::new(enrichment.clone(), store.clone(), fast_controls(3))
        .run()
        .await
        .expect("first run");
    assert_eq!(first.queued, 1);
    assert_eq!(first.done, 1);
    assert_eq!(store.write_count(), 1);

    let row = store.row(1).expect("row");
    assert_eq!(row.title_localized.as_deref(), Some("Yüzüklerin Efendisi"));
    assert_eq!(row.tagline_localized.as_deref(), Some(""));
    assert_eq!(row.poster_path.as_deref(), Some("/lotr.jpg"));

    // Translated rows drop out of the selection.
    let second = Pipeline::new(enrichment, store.clone(), fast_controls(3))
        .run()
        .await
        .expect("second run");
    assert_eq!(second.queued, 0);
    assert_eq!(second.finished(), 0);
}

#[tokio::test]
async fn poster_sync_keeps_existing_path_on_empty_or_failed_fetch() {
    let server = MockServer::start().await;
    mount_movie(&server, 10, json!({"poster_path": "/new.jpg"})).await;
    mount_movie(&server, 20, json!({"poster_path": ""})).await;
    mount_movie_status(&server, 30, 404).await;

    let store = Arc::new(MemoryStore::with_rows([
        MovieRow {
            poster_path: Some("/old.jpg".into()),
            ..MovieRow::new(1, Some(10), 3.0)
        },
        MovieRow {
            poster_path: Some("/keep.jpg".into()),
            ..MovieRow::new(2, Some(20), 2.0)
        },
        MovieRow {
            poster_path: Some("/stale.jpg".into()),
            ..MovieRow::new(3, Some(30), 1.0)
        },
        MovieRow::new(4, None, 100.0),
    ]));
    let observer = Arc::new(RecordingObserver::new());

    let summary = Pipeline::new(
        PosterSync::new(tmdb_client(&server)),
        store.clone(),
        fast_controls(2),
    )
    .with_observer(observer.clone())
    .run()
    .await
    .expect("pipeline");

    assert_eq!(summary.queued, 3);
    assert_eq!(summary.done, 2);
    assert_eq!(summary.fetch_failed, 1);
    assert_eq!(store.row(1).and_then(|row| row.poster_path).as_deref(), Some("/new.jpg"));
    assert_eq!(store.row(2).and_then(|row| row.poster_path).as_deref(), Some("/keep.jpg"));
    assert_eq!(store.row(3).and_then(|row| row.poster_path).as_deref(), Some("/stale.jpg"));
    assert_eq!(store.row(4).and_then(|row| row.poster_path), None);

    let failure = observer
        .events()
        .into_iter()
        .find(|event| event.state == JobState::FetchFailed)
        .expect("fetch failure event");
    assert_eq!(failure.movie_id, 3);
    assert!(failure.detail.unwrap_or_default().contains("404"));
}

#[tokio::test]
async fn embedding_sync_embeds_localized_rows_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "bge-m3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.25, 0.5, 0.75], [9.0, 9.0, 9.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_rows([
        MovieRow {
            title: Some("Spirited Away".into()),
            title_localized: Some("Ruhların Kaçışı".into()),
            overview_localized: Some("Chihiro...".into()),
            ..MovieRow::new(1, Some(129), 70.0)
        },
        MovieRow {
            title: Some("Untranslated".into()),
            ..MovieRow::new(2, Some(130), 80.0)
        },
        MovieRow {
            overview_localized: Some("done".into()),
            embedding: Some(vec![1.0, 1.0, 1.0]),
            ..MovieRow::new(3, Some(131), 90.0)
        },
    ]));
    let provider = OllamaEmbedder::new(
        server.uri(),
        "bge-m3".to_string(),
        Some(3),
        std::time::Duration::from_secs(5),
    )
    .expect("embedder");
    let enrichment = EmbeddingSync::new(Arc::new(provider));
    let observer = Arc::new(RecordingObserver::new());

    let summary = Pipeline::new(enrichment.clone(), store.clone(), fast_controls(2))
        .with_observer(observer.clone())
        .run()
        .await
        .expect("pipeline");

    assert_eq!(summary.queued, 1);
    assert_eq!(summary.done, 1);
    assert_eq!(store.row(1).and_then(|row| row.embedding), Some(vec![0.25, 0.5, 0.75]));
    assert_eq!(store.row(2).and_then(|row| row.embedding), None);
    assert_eq!(store.row(3).and_then(|row| row.embedding), Some(vec![1.0, 1.0, 1.0]));
    let events = observer.events();
    assert_eq!(events[0].key, "Spirited Away");
    assert_eq!(events[0].detail.as_deref(), Some("3 dims"));

    let rerun = Pipeline::new(enrichment, store.clone(), fast_controls(2))
        .run()
        .await
        .expect("rerun");
    assert_eq!(rerun.queued, 0);
}
