//! Candidate selection and idempotent partial updates against the movies table.
//!
//! Every pipeline owns a disjoint set of columns, described by one
//! [`MovieUpdate`] variant. Writes are keyed by primary key and never touch
//! another row, so re-running a pipeline only rewrites the same values.

use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::stream::BoxStream;

use crate::error::StoreError;
use crate::job::{MovieId, RecordDescriptor, TmdbId};
use crate::transform::{CastMember, EmbeddingDocument, Genre, Keyword};

pub mod memory;
pub mod postgres;
pub mod table;

pub use memory::{MemoryStore, MovieRow};
pub use postgres::PgMovieStore;
pub use table::TableName;

/// Lazy, finite, non-restartable sequence of candidates, highest popularity first.
pub type CandidateStream<K> = BoxStream<'static, RecordDescriptor<K>>;

/// Predicate for pipelines keyed by the provider id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyedSelection {
    /// Every row with a provider key.
    WithProviderKey,
    /// Rows with a provider key and no localized overview yet.
    MissingLocalizedText,
}

/// Columns written by the full metadata sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataColumns {
    /// `title_tr`
    pub title_localized: String,
    /// `overview_tr`
    pub overview_localized: String,
    /// `tagline_tr`
    pub tagline_localized: String,
    /// `poster_path`, only written when non-empty.
    pub poster_path: Option<String>,
    /// `director`
    pub director: String,
    /// `genres`
    pub genres: Vec<Genre>,
    /// `keywords`
    pub keywords: Vec<Keyword>,
    /// `cast_list`
    pub cast: Vec<CastMember>,
    /// `release_date`, only written when known.
    pub release_date: Option<NaiveDate>,
    /// `popularity`
    pub popularity: f64,
    /// `vote_average`
    pub vote_average: f64,
    /// `vote_count`
    pub vote_count: i32,
    /// `original_language`
    pub original_language: String,
}

/// Columns written by the localized-text sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedColumns {
    /// `title_tr`
    pub title_localized: String,
    /// `overview_tr`
    pub overview_localized: String,
    /// `tagline_tr`
    pub tagline_localized: String,
    /// `poster_path`, only written when non-empty.
    pub poster_path: Option<String>,
}

/// One pipeline's partial update of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum MovieUpdate {
    /// Full metadata refresh.
    Metadata(MetadataColumns),
    /// Localized title, overview, tagline.
    Localized(LocalizedColumns),
    /// Poster path; `None` leaves the stored value untouched.
    Poster(Option<String>),
    /// Embedding vector.
    Embedding(Vec<f32>),
}

impl MovieUpdate {
    /// Short name of the column set, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Metadata(_) => "metadata",
            Self::Localized(_) => "localized",
            Self::Poster(_) => "poster",
            Self::Embedding(_) => "embedding",
        }
    }

    /// Human label for a successful write: the localized title, the poster
    /// path, or the vector size.
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Metadata(cols) => Some(cols.title_localized.clone()),
            Self::Localized(cols) => Some(cols.title_localized.clone()),
            Self::Poster(path) => path.clone(),
            Self::Embedding(values) => Some(format!("{} dims", values.len())),
        }
    }
}

/// Candidate selector and store writer shared by every worker.
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Rows matching `selection`, as (movie id, provider key) descriptors.
    ///
    /// Fails only if the query cannot be issued; undecodable rows are skipped.
    async fn keyed_candidates(
        &self,
        selection: KeyedSelection,
    ) -> Result<CandidateStream<TmdbId>, StoreError>;

    /// Rows with localized text but no embedding, with the text to embed.
    async fn embedding_candidates(&self) -> Result<CandidateStream<EmbeddingDocument>, StoreError>;

    /// Applies `update` to the row with primary key `movie_id`.
    async fn apply(&self, movie_id: MovieId, update: &MovieUpdate) -> Result<(), StoreError>;
}
