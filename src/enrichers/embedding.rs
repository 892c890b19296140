//! Embedding computation over the localized catalog.

use std::sync::Arc;

use async_trait::async_trait;

use crate::embedder::EmbeddingProvider;
use crate::error::{FetchError, StoreError};
use crate::job::ProviderKey;
use crate::runtime::Enrichment;
use crate::store::{CandidateStream, MovieStore, MovieUpdate};
use crate::transform::EmbeddingDocument;

impl ProviderKey for EmbeddingDocument {
    fn log_key(&self) -> String {
        if self.title.is_empty() {
            self.title_localized.clone()
        } else {
            self.title.clone()
        }
    }
}

/// Embeds the retrieval document of every localized row without a vector.
#[derive(Clone)]
pub struct EmbeddingSync {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingSync {
    /// Builds the enrichment on top of `provider`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Enrichment for EmbeddingSync {
    type Key = EmbeddingDocument;
    type Response = Vec<f32>;

    fn name(&self) -> &'static str {
        "embedding"
    }

    async fn candidates(
        &self,
        store: &dyn MovieStore,
    ) -> Result<CandidateStream<EmbeddingDocument>, StoreError> {
        store.embedding_candidates().await
    }

    async fn fetch(&self, key: &EmbeddingDocument) -> Result<Vec<f32>, FetchError> {
        self.provider.embed(&key.render()).await
    }

    fn transform(&self, response: Vec<f32>) -> MovieUpdate {
        MovieUpdate::Embedding(response)
    }
}
