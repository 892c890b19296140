//! Error types for provider calls, store access, and the pipeline driver.

use crate::job::MovieId;

/// Longest provider error body kept in a [`FetchError::Status`].
const MAX_BODY_CHARS: usize = 256;

/// Failure of a single provider call. Always recoverable at the job level.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection, timeout, or other transport failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Response body did not match the expected document.
    #[error("failed to decode provider response: {0}")]
    Decode(String),

    /// Embedding response carried no vectors.
    #[error("embedding response contained no vectors")]
    EmptyEmbedding,

    /// Embedding vector had the wrong length.
    #[error("embedding has {actual} dimensions, expected {expected}")]
    Dimensions {
        /// Configured dimensionality.
        expected: usize,
        /// Length actually returned.
        actual: usize,
    },
}

impl FetchError {
    /// Builds a status error, truncating the body.
    pub fn status(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Status {
            status: status.as_u16(),
            body: body.trim().chars().take(MAX_BODY_CHARS).collect(),
        }
    }
}

/// Store-level failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Could not build the connection pool.
    #[error("failed to connect to Postgres: {0}")]
    Connect(#[source] tokio_postgres::Error),

    /// Could not check a connection out of the pool.
    #[error("connection pool error: {0}")]
    Pool(#[from] bb8::RunError<tokio_postgres::Error>),

    /// Statement failed.
    #[error("query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Update matched no row.
    #[error("movie {0} not found")]
    MissingRow(MovieId),

    /// Invalid identifier or configuration.
    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// Fatal pipeline failure. Per-job failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The candidate query could not be issued.
    #[error("candidate selection failed: {0}")]
    Selection(#[source] StoreError),

    /// A worker task panicked or was cancelled.
    #[error("worker {worker_id} terminated abnormally: {reason}")]
    Worker {
        /// Worker slot.
        worker_id: usize,
        /// Join error description.
        reason: String,
    },
}
