//! Full metadata sync: localized text, credits, tags, release and vote data.

use async_trait::async_trait;

use super::METADATA_APPEND;
use crate::error::{FetchError, StoreError};
use crate::job::TmdbId;
use crate::runtime::Enrichment;
use crate::store::{CandidateStream, KeyedSelection, MetadataColumns, MovieStore, MovieUpdate};
use crate::tmdb::{MovieDetails, TmdbClient};
use crate::transform::{directors, non_empty, release_date};

/// Refreshes every metadata column of rows that have a provider key.
#[derive(Clone)]
pub struct MetadataSync {
    client: TmdbClient,
    language: String,
}

impl MetadataSync {
    /// Builds the enrichment for `language` (e.g. `tr-TR`).
    pub fn new(client: TmdbClient, language: impl Into<String>) -> Self {
        Self {
            client,
            language: language.into(),
        }
    }
}

#[async_trait]
impl Enrichment for MetadataSync {
    type Key = TmdbId;
    type Response = MovieDetails;

    fn name(&self) -> &'static str {
        "metadata"
    }

    async fn candidates(
        &self,
        store: &dyn MovieStore,
    ) -> Result<CandidateStream<TmdbId>, StoreError> {
        store.keyed_candidates(KeyedSelection::WithProviderKey).await
    }

    async fn fetch(&self, key: &TmdbId) -> Result<MovieDetails, FetchError> {
        self.client
            .movie(*key, Some(&self.language), METADATA_APPEND)
            .await
    }

    fn transform(&self, response: MovieDetails) -> MovieUpdate {
        MovieUpdate::Metadata(metadata_columns(response))
    }
}

/// Maps a full movie document onto the metadata column set.
pub fn metadata_columns(details: MovieDetails) -> MetadataColumns {
    MetadataColumns {
        director: directors(&details.credits.crew),
        release_date: release_date(&details.release_date),
        poster_path: non_empty(details.poster_path),
        title_localized: details.title,
        overview_localized: details.overview,
        tagline_localized: details.tagline,
        genres: details.genres,
        keywords: details.keywords.keywords,
        cast: details.credits.cast,
        popularity: details.popularity,
        vote_average: details.vote_average,
        vote_count: details.vote_count,
        original_language: details.original_language,
    }
}
