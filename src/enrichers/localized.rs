//! Localized-text sync for rows that have never been translated.

use async_trait::async_trait;

use crate::error::{FetchError, StoreError};
use crate::job::TmdbId;
use crate::runtime::Enrichment;
use crate::store::{CandidateStream, KeyedSelection, LocalizedColumns, MovieStore, MovieUpdate};
use crate::tmdb::{LocalizedText, TmdbClient};
use crate::transform::non_empty;

/// Fills localized title, overview, and tagline.
#[derive(Clone)]
pub struct LocalizedSync {
    client: TmdbClient,
    language: String,
}

impl LocalizedSync {
    /// Builds the enrichment for `language` (e.g. `tr-TR`).
    pub fn new(client: TmdbClient, language: impl Into<String>) -> Self {
        Self {
            client,
            language: language.into(),
        }
    }
}

#[async_trait]
impl Enrichment for LocalizedSync {
    type Key = TmdbId;
    type Response = LocalizedText;

    fn name(&self) -> &'static str {
        "localized"
    }

    async fn candidates(
        &self,
        store: &dyn MovieStore,
    ) -> Result<CandidateStream<TmdbId>, StoreError> {
        store
            .keyed_candidates(KeyedSelection::MissingLocalizedText)
            .await
    }

    async fn fetch(&self, key: &TmdbId) -> Result<LocalizedText, FetchError> {
        self.client.movie(*key, Some(&self.language), &[]).await
    }

    fn transform(&self, response: LocalizedText) -> MovieUpdate {
        MovieUpdate::Localized(LocalizedColumns {
            title_localized: response.title,
            overview_localized: response.overview,
            tagline_localized: response.tagline,
            poster_path: non_empty(response.poster_path),
        })
    }
}
