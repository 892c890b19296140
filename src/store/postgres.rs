//! Postgres-backed [`MovieStore`] on a bb8 connection pool.

use async_trait::async_trait;
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use futures_util::future;
use futures_util::StreamExt;
use pgvector::Vector;
use tokio_postgres::types::{Json, ToSql};
use tokio_postgres::{NoTls, Row};
use tracing::{info, warn};

use super::{CandidateStream, KeyedSelection, MovieStore, MovieUpdate, TableName};
use crate::error::StoreError;
use crate::job::{MovieId, RecordDescriptor, TmdbId};
use crate::transform::EmbeddingDocument;

/// Connection pool type shared by every worker.
pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Movies table behind a pooled set of Postgres connections.
#[derive(Clone)]
pub struct PgMovieStore {
    pool: PgPool,
    table: TableName,
}

impl PgMovieStore {
    /// Opens a pool of at most `max_size` connections, keeping `min_idle` warm,
    /// and verifies the database answers.
    pub async fn connect(
        database_url: &str,
        table: TableName,
        max_size: u32,
        min_idle: u32,
    ) -> Result<Self, StoreError> {
        let max_size = max_size.max(1);
        let manager = PostgresConnectionManager::new_from_stringlike(database_url, NoTls)
            .map_err(StoreError::Connect)?;
        let pool = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(min_idle.min(max_size)))
            .build(manager)
            .await
            .map_err(StoreError::Connect)?;
        let store = Self::from_pool(pool, table);
        store.ping().await?;
        info!(
            table = %store.table,
            max_size,
            min_idle,
            "connected to Postgres"
        );
        Ok(store)
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool, table: TableName) -> Self {
        Self { pool, table }
    }

    /// Round-trips a trivial query.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.pool.get().await?;
        conn.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn stream_rows<K, F>(
        &self,
        sql: String,
        decode: F,
    ) -> Result<CandidateStream<K>, StoreError>
    where
        K: Send + 'static,
        F: Fn(&Row) -> Option<RecordDescriptor<K>> + Send + 'static,
    {
        let conn = self.pool.get_owned().await?;
        let rows = conn
            .query_raw(sql.as_str(), std::iter::empty::<&str>())
            .await?;
        let stream = rows.filter_map(move |row| {
            // holds the connection until the scan is dropped
            let _conn = &conn;
            let descriptor = match row {
                Ok(row) => decode(&row),
                Err(err) => {
                    warn!(error = %err, "candidate scan interrupted");
                    None
                }
            };
            future::ready(descriptor)
        });
        Ok(stream.boxed())
    }
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn keyed_candidates(
        &self,
        selection: KeyedSelection,
    ) -> Result<CandidateStream<TmdbId>, StoreError> {
        self.stream_rows(keyed_candidates_sql(&self.table, selection), decode_keyed)
            .await
    }

    async fn embedding_candidates(&self) -> Result<CandidateStream<EmbeddingDocument>, StoreError> {
        self.stream_rows(embedding_candidates_sql(&self.table), decode_document)
            .await
    }

    async fn apply(&self, movie_id: MovieId, update: &MovieUpdate) -> Result<(), StoreError> {
        let sql = update_sql(&self.table, update);
        let conn = self.pool.get().await?;
        let updated = match update {
            MovieUpdate::Metadata(cols) => {
                let genres = Json(&cols.genres);
                let keywords = Json(&cols.keywords);
                let cast = Json(&cols.cast);
                let params: [&(dyn ToSql + Sync); 14] = [
                    &cols.title_localized,
                    &cols.overview_localized,
                    &cols.tagline_localized,
                    &cols.poster_path,
                    &cols.director,
                    &genres,
                    &keywords,
                    &cast,
                    &cols.release_date,
                    &cols.popularity,
                    &cols.vote_average,
                    &cols.vote_count,
                    &cols.original_language,
                    &movie_id,
                ];
                conn.execute(sql.as_str(), &params).await?
            }
            MovieUpdate::Localized(cols) => {
                conn.execute(
                    sql.as_str(),
                    &[
                        &cols.title_localized,
                        &cols.overview_localized,
                        &cols.tagline_localized,
                        &cols.poster_path,
                        &movie_id,
                    ],
                )
                .await?
            }
            MovieUpdate::Poster(path) => conn.execute(sql.as_str(), &[path, &movie_id]).await?,
            MovieUpdate::Embedding(values) => {
                let vector = Vector::from(values.clone());
                conn.execute(sql.as_str(), &[&vector, &movie_id]).await?
            }
        };
        if updated == 0 {
            return Err(StoreError::MissingRow(movie_id));
        }
        Ok(())
    }
}

const ORDER_BY_PRIORITY: &str = "ORDER BY popularity DESC NULLS LAST, id";

/// Candidate query for pipelines keyed by provider id.
pub fn keyed_candidates_sql(table: &TableName, selection: KeyedSelection) -> String {
    let predicate = match selection {
        KeyedSelection::WithProviderKey => "tmdb_id IS NOT NULL",
        KeyedSelection::MissingLocalizedText => "tmdb_id IS NOT NULL AND overview_tr IS NULL",
    };
    format!(
        "SELECT id::BIGINT AS id, tmdb_id::BIGINT AS tmdb_id FROM {} WHERE {} {}",
        table.qualified(),
        predicate,
        ORDER_BY_PRIORITY
    )
}

/// Candidate query for the embedding pipeline.
pub fn embedding_candidates_sql(table: &TableName) -> String {
    format!(
        "SELECT id::BIGINT AS id, \
            title::TEXT AS title, title_tr::TEXT AS title_tr, \
            tagline::TEXT AS tagline, tagline_tr::TEXT AS tagline_tr, \
            overview::TEXT AS overview, overview_tr::TEXT AS overview_tr, \
            director::TEXT AS director, release_date::TEXT AS release_date, \
            genres::JSONB AS genres, keywords::JSONB AS keywords, cast_list::JSONB AS cast_list \
         FROM {} WHERE embedding IS NULL AND overview_tr IS NOT NULL {}",
        table.qualified(),
        ORDER_BY_PRIORITY
    )
}

/// Partial UPDATE touching only the columns owned by `update`'s pipeline.
///
/// Poster path and release date are coalesced so an absent provider value
/// never clobbers stored data.
pub fn update_sql(table: &TableName, update: &MovieUpdate) -> String {
    let qualified = table.qualified();
    match update {
        MovieUpdate::Metadata(_) => format!(
            "UPDATE {qualified} SET \
                title_tr = $1::TEXT, \
                overview_tr = $2::TEXT, \
                tagline_tr = $3::TEXT, \
                poster_path = COALESCE(NULLIF($4::TEXT, ''), poster_path), \
                director = $5::TEXT, \
                genres = $6::JSONB, \
                keywords = $7::JSONB, \
                cast_list = $8::JSONB, \
                release_date = COALESCE($9::DATE, release_date), \
                popularity = $10::DOUBLE PRECISION, \
                vote_average = $11::DOUBLE PRECISION, \
                vote_count = $12::INTEGER, \
                original_language = $13::TEXT \
             WHERE id = $14::BIGINT"
        ),
        MovieUpdate::Localized(_) => format!(
            "UPDATE {qualified} SET \
                title_tr = $1::TEXT, \
                overview_tr = $2::TEXT, \
                tagline_tr = $3::TEXT, \
                poster_path = COALESCE(NULLIF($4::TEXT, ''), poster_path) \
             WHERE id = $5::BIGINT"
        ),
        MovieUpdate::Poster(_) => format!(
            "UPDATE {qualified} SET poster_path = COALESCE(NULLIF($1::TEXT, ''), poster_path) \
             WHERE id = $2::BIGINT"
        ),
        MovieUpdate::Embedding(_) => {
            format!("UPDATE {qualified} SET embedding = $1 WHERE id = $2::BIGINT")
        }
    }
}

fn decode_keyed(row: &Row) -> Option<RecordDescriptor<TmdbId>> {
    let id: i64 = row.try_get("id").ok()?;
    let tmdb_id: i64 = row.try_get("tmdb_id").ok()?;
    Some(RecordDescriptor::new(id, TmdbId(tmdb_id)))
}

fn decode_document(row: &Row) -> Option<RecordDescriptor<EmbeddingDocument>> {
    let text = |column: &str| -> Option<String> {
        row.try_get::<_, Option<String>>(column)
            .ok()
            .map(Option::unwrap_or_default)
    };
    let tags = |column: &str| -> Option<serde_json::Value> {
        row.try_get::<_, Option<serde_json::Value>>(column)
            .ok()
            .map(Option::unwrap_or_default)
    };
    let id: i64 = row.try_get("id").ok()?;
    let document = EmbeddingDocument {
        title: text("title")?,
        title_localized: text("title_tr")?,
        tagline: text("tagline")?,
        tagline_localized: text("tagline_tr")?,
        overview: text("overview")?,
        overview_localized: text("overview_tr")?,
        director: text("director")?,
        release_date: row.try_get::<_, Option<String>>("release_date").ok()?,
        genres: serde_json::from_value(tags("genres")?).unwrap_or_default(),
        keywords: serde_json::from_value(tags("keywords")?).unwrap_or_default(),
        cast: serde_json::from_value(tags("cast_list")?).unwrap_or_default(),
    };
    Some(RecordDescriptor::new(id, document))
}
