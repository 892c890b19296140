//! Embedding provider clients.

use async_trait::async_trait;

use crate::error::FetchError;

pub mod ollama;
pub mod openai;

/// Dimensionality of the `embedding` column.
pub const DEFAULT_DIMENSIONS: usize = 1024;

/// A service that turns one input text into one fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `input`, returning the first vector of the response.
    async fn embed(&self, input: &str) -> Result<Vec<f32>, FetchError>;

    /// Model identifier sent with every request.
    fn model(&self) -> &str;
}

/// Takes the first vector of a provider response and checks its length.
pub(crate) fn first_vector(
    vectors: Vec<Vec<f32>>,
    expected: Option<usize>,
) -> Result<Vec<f32>, FetchError> {
    let vector = vectors
        .into_iter()
        .next()
        .filter(|vector| !vector.is_empty())
        .ok_or(FetchError::EmptyEmbedding)?;
    match expected {
        Some(expected) if vector.len() != expected => Err(FetchError::Dimensions {
            expected,
            actual: vector.len(),
        }),
        _ => Ok(vector),
    }
}
