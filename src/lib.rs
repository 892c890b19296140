#![warn(missing_docs)]
//! Concurrent enrichment pipelines for a movie catalog.
//!
//! Each pipeline selects rows missing some data, fetches it from an external
//! provider (the TMDB API or an embedding endpoint), and writes the derived
//! columns back to Postgres, all through the same bounded worker pool in
//! [`runtime`].

pub mod controls;
pub mod embedder;
pub mod enrichers;
pub mod error;
pub mod job;
pub mod queue;
pub mod runtime;
pub mod store;
pub mod telemetry;
pub mod tmdb;
pub mod transform;

pub use controls::{PipelineArgs, PipelineControls, StoreArgs, TmdbArgs};
pub use embedder::EmbeddingProvider;
pub use enrichers::{EmbeddingSync, LocalizedSync, MetadataSync, PosterSync};
pub use error::{FetchError, PipelineError, StoreError};
pub use job::{JobEvent, JobState, MovieId, RecordDescriptor, TmdbId};
pub use queue::{QueueConsumer, QueueProducer, DEFAULT_QUEUE_CAPACITY};
pub use runtime::{Enrichment, JobObserver, Pipeline, PipelineSummary, TracingObserver};
pub use store::{MemoryStore, MovieStore, MovieUpdate, PgMovieStore, TableName};
pub use tmdb::TmdbClient;
