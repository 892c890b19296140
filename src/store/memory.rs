//! In-process [`MovieStore`] mirroring the Postgres update semantics.
//!
//! Useful for exercising pipelines without a database: candidate ordering,
//! predicates, and the coalescing rules match the SQL in [`super::postgres`].

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};

use super::{CandidateStream, KeyedSelection, MovieStore, MovieUpdate};
use crate::error::StoreError;
use crate::job::{MovieId, RecordDescriptor, TmdbId};
use crate::transform::{non_empty, CastMember, EmbeddingDocument, Genre, Keyword};

/// One movies row. `None` models SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieRow {
    /// `id`
    pub id: MovieId,
    /// `tmdb_id`
    pub tmdb_id: Option<i64>,
    /// `title`
    pub title: Option<String>,
    /// `tagline`
    pub tagline: Option<String>,
    /// `overview`
    pub overview: Option<String>,
    /// `title_tr`
    pub title_localized: Option<String>,
    /// `tagline_tr`
    pub tagline_localized: Option<String>,
    /// `overview_tr`
    pub overview_localized: Option<String>,
    /// `poster_path`
    pub poster_path: Option<String>,
    /// `director`
    pub director: Option<String>,
    /// `genres`
    pub genres: Option<Vec<Genre>>,
    /// `keywords`
    pub keywords: Option<Vec<Keyword>>,
    /// `cast_list`
    pub cast: Option<Vec<CastMember>>,
    /// `release_date`
    pub release_date: Option<NaiveDate>,
    /// `popularity`
    pub popularity: Option<f64>,
    /// `vote_average`
    pub vote_average: Option<f64>,
    /// `vote_count`
    pub vote_count: Option<i32>,
    /// `original_language`
    pub original_language: Option<String>,
    /// `embedding`
    pub embedding: Option<Vec<f32>>,
}

impl MovieRow {
    /// Row with only identity and popularity set.
    pub fn new(id: MovieId, tmdb_id: Option<i64>, popularity: f64) -> Self {
        Self {
            id,
            tmdb_id,
            popularity: Some(popularity),
            ..Self::default()
        }
    }

    fn document(&self) -> EmbeddingDocument {
        EmbeddingDocument {
            title: self.title.clone().unwrap_or_default(),
            title_localized: self.title_localized.clone().unwrap_or_default(),
            tagline: self.tagline.clone().unwrap_or_default(),
            tagline_localized: self.tagline_localized.clone().unwrap_or_default(),
            overview: self.overview.clone().unwrap_or_default(),
            overview_localized: self.overview_localized.clone().unwrap_or_default(),
            director: self.director.clone().unwrap_or_default(),
            release_date: self.release_date.map(|date| date.to_string()),
            genres: self.genres.clone().unwrap_or_default(),
            keywords: self.keywords.clone().unwrap_or_default(),
            cast: self.cast.clone().unwrap_or_default(),
        }
    }
}

/// Thread-safe map of rows keyed by primary key.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<MovieId, MovieRow>>,
    failing_writes: Mutex<HashSet<MovieId>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `rows`.
    pub fn with_rows(rows: impl IntoIterator<Item = MovieRow>) -> Self {
        let store = Self::new();
        for row in rows {
            store.insert(row);
        }
        store
    }

    /// Inserts or replaces a row.
    pub fn insert(&self, row: MovieRow) {
        self.lock_rows().insert(row.id, row);
    }

    /// Copy of the row with primary key `id`.
    pub fn row(&self, id: MovieId) -> Option<MovieRow> {
        self.lock_rows().get(&id).cloned()
    }

    /// Copy of every row, ordered by primary key.
    pub fn snapshot(&self) -> Vec<MovieRow> {
        self.lock_rows().values().cloned().collect()
    }

    /// Makes every write to `id` fail.
    pub fn fail_writes_for(&self, id: MovieId) {
        self.failing_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }

    fn lock_rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<MovieId, MovieRow>> {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn candidates<K, F>(&self, keep: F) -> Vec<RecordDescriptor<K>>
    where
        F: Fn(&MovieRow) -> Option<K>,
    {
        let rows = self.lock_rows();
        let mut matched: Vec<&MovieRow> = rows.values().collect();
        // popularity DESC NULLS LAST, id
        matched.sort_by(|a, b| match (a.popularity, b.popularity) {
            (Some(x), Some(y)) => y.total_cmp(&x).then(a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        matched
            .into_iter()
            .filter_map(|row| keep(row).map(|key| RecordDescriptor::new(row.id, key)))
            .collect()
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn keyed_candidates(
        &self,
        selection: KeyedSelection,
    ) -> Result<CandidateStream<TmdbId>, StoreError> {
        let descriptors = self.candidates(|row| {
            let tmdb_id = row.tmdb_id?;
            match selection {
                KeyedSelection::WithProviderKey => Some(TmdbId(tmdb_id)),
                KeyedSelection::MissingLocalizedText => row
                    .overview_localized
                    .is_none()
                    .then_some(TmdbId(tmdb_id)),
            }
        });
        Ok(stream::iter(descriptors).boxed())
    }

    async fn embedding_candidates(&self) -> Result<CandidateStream<EmbeddingDocument>, StoreError> {
        let descriptors = self.candidates(|row| {
            (row.embedding.is_none() && row.overview_localized.is_some()).then(|| row.document())
        });
        Ok(stream::iter(descriptors).boxed())
    }

    async fn apply(&self, movie_id: MovieId, update: &MovieUpdate) -> Result<(), StoreError> {
        let failing = self
            .failing_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&movie_id);
        if failing {
            return Err(StoreError::Config(format!(
                "injected write failure for movie {movie_id}"
            )));
        }

        let mut rows = self.lock_rows();
        let row = rows
            .get_mut(&movie_id)
            .ok_or(StoreError::MissingRow(movie_id))?;
        match update {
            MovieUpdate::Metadata(cols) => {
                row.title_localized = Some(cols.title_localized.clone());
                row.overview_localized = Some(cols.overview_localized.clone());
                row.tagline_localized = Some(cols.tagline_localized.clone());
                coalesce_poster(row, &cols.poster_path);
                row.director = Some(cols.director.clone());
                row.genres = Some(cols.genres.clone());
                row.keywords = Some(cols.keywords.clone());
                row.cast = Some(cols.cast.clone());
                row.release_date = cols.release_date.or(row.release_date);
                row.popularity = Some(cols.popularity);
                row.vote_average = Some(cols.vote_average);
                row.vote_count = Some(cols.vote_count);
                row.original_language = Some(cols.original_language.clone());
            }
            MovieUpdate::Localized(cols) => {
                row.title_localized = Some(cols.title_localized.clone());
                row.overview_localized = Some(cols.overview_localized.clone());
                row.tagline_localized = Some(cols.tagline_localized.clone());
                coalesce_poster(row, &cols.poster_path);
            }
            MovieUpdate::Poster(path) => coalesce_poster(row, path),
            MovieUpdate::Embedding(values) => row.embedding = Some(values.clone()),
        }
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// `poster_path = COALESCE(NULLIF($n, ''), poster_path)`
fn coalesce_poster(row: &mut MovieRow, path: &Option<String>) {
    if let Some(path) = non_empty(path.clone()) {
        row.poster_path = Some(path);
    }
}
