//! Poster-path sync.

use async_trait::async_trait;

use crate::error::{FetchError, StoreError};
use crate::job::TmdbId;
use crate::runtime::Enrichment;
use crate::store::{CandidateStream, KeyedSelection, MovieStore, MovieUpdate};
use crate::tmdb::{PosterDocument, TmdbClient};
use crate::transform::non_empty;

/// Refreshes poster paths; an empty provider path leaves the stored one alone.
#[derive(Clone)]
pub struct PosterSync {
    client: TmdbClient,
}

impl PosterSync {
    /// Builds the enrichment.
    pub fn new(client: TmdbClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Enrichment for PosterSync {
    type Key = TmdbId;
    type Response = PosterDocument;

    fn name(&self) -> &'static str {
        "poster"
    }

    async fn candidates(
        &self,
        store: &dyn MovieStore,
    ) -> Result<CandidateStream<TmdbId>, StoreError> {
        store.keyed_candidates(KeyedSelection::WithProviderKey).await
    }

    async fn fetch(&self, key: &TmdbId) -> Result<PosterDocument, FetchError> {
        self.client.movie(*key, None, &[]).await
    }

    fn transform(&self, response: PosterDocument) -> MovieUpdate {
        MovieUpdate::Poster(non_empty(response.poster_path))
    }
}
