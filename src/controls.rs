//! Throttle and sizing controls shared by every pipeline binary.

use std::time::Duration;

use clap::Args;

use crate::error::StoreError;
use crate::queue::DEFAULT_QUEUE_CAPACITY;
use crate::store::{PgMovieStore, TableName};

/// Tunable knobs that bound pipeline behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineControls {
    workers: usize,
    queue_capacity: usize,
    pacing_delay: Duration,
    request_timeout: Duration,
}

impl PipelineControls {
    /// Constructs a new set of pipeline controls.
    pub fn new(
        workers: usize,
        queue_capacity: usize,
        pacing_delay: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
            pacing_delay,
            request_timeout: request_timeout.max(Duration::from_secs(1)),
        }
    }

    /// Defaults for the full metadata sync.
    pub fn metadata() -> Self {
        Self::new(
            15,
            DEFAULT_QUEUE_CAPACITY,
            Duration::from_millis(40),
            Duration::from_secs(15),
        )
    }

    /// Defaults for the localized-text sync.
    pub fn localized() -> Self {
        Self::new(
            20,
            DEFAULT_QUEUE_CAPACITY,
            Duration::from_millis(50),
            Duration::from_secs(10),
        )
    }

    /// Defaults for the poster-path sync.
    pub fn poster() -> Self {
        Self::localized()
    }

    /// Defaults for the embedding computation. Remote inference is slow, so
    /// the timeout is longer and no pacing is applied.
    pub fn embedding() -> Self {
        Self::new(
            20,
            DEFAULT_QUEUE_CAPACITY,
            Duration::ZERO,
            Duration::from_secs(60),
        )
    }

    /// Number of concurrent workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Slots in the bounded work queue.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Time each worker sleeps after a successful provider call.
    pub fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }

    /// Per-request timeout applied by provider clients.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Connection pool size that leaves `margin` spare connections beyond
    /// one per worker, so workers never starve each other.
    pub fn pool_size(&self, margin: u32) -> u32 {
        let workers = u32::try_from(self.workers).unwrap_or(u32::MAX);
        workers.saturating_add(margin.max(1))
    }
}

impl Default for PipelineControls {
    fn default() -> Self {
        Self::metadata()
    }
}

/// Postgres connection settings.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Postgres connection string (postgres://...)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Schema holding the movies table
    #[arg(long, env = "FILMSYNC_SCHEMA", default_value = "public")]
    pub schema: String,

    /// Movies table name inside the schema
    #[arg(long, env = "FILMSYNC_TABLE", default_value = "movies")]
    pub table: String,

    /// Extra pooled connections beyond one per worker
    #[arg(long, env = "FILMSYNC_POOL_MARGIN", default_value_t = 5)]
    pub pool_margin: u32,
}

impl StoreArgs {
    /// Validated target table.
    pub fn table_name(&self) -> Result<TableName, StoreError> {
        TableName::new(self.schema.clone(), self.table.clone())
    }

    /// Opens a pool sized for `controls`: one warm connection per worker plus
    /// the configured margin.
    pub async fn connect(&self, controls: &PipelineControls) -> Result<PgMovieStore, StoreError> {
        PgMovieStore::connect(
            &self.database_url,
            self.table_name()?,
            controls.pool_size(self.pool_margin),
            controls.workers() as u32,
        )
        .await
    }
}

/// Metadata provider settings.
#[derive(Args, Debug, Clone)]
pub struct TmdbArgs {
    /// TMDB API key passed with every request
    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    pub tmdb_api_key: String,

    /// Base URL for the TMDB v3 API
    #[arg(
        long,
        env = "TMDB_BASE_URL",
        default_value = "https://api.themoviedb.org/3"
    )]
    pub tmdb_base_url: String,

    /// Locale requested for localized fields
    #[arg(long, env = "FILMSYNC_LANGUAGE", default_value = "tr-TR")]
    pub language: String,
}

/// Optional overrides of a pipeline's default controls.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Number of concurrent workers
    #[arg(long, env = "FILMSYNC_WORKERS")]
    pub workers: Option<usize>,

    /// Slots in the bounded work queue
    #[arg(long, env = "FILMSYNC_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Milliseconds each worker waits after a successful provider call
    #[arg(long, env = "FILMSYNC_PACE_MS")]
    pub pace_ms: Option<u64>,

    /// Seconds before a provider request times out
    #[arg(long, env = "FILMSYNC_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

impl PipelineArgs {
    /// Applies the overrides on top of `defaults`.
    pub fn build_controls(&self, defaults: PipelineControls) -> PipelineControls {
        PipelineControls::new(
            self.workers.unwrap_or(defaults.workers),
            self.queue_capacity.unwrap_or(defaults.queue_capacity),
            self.pace_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pacing_delay),
            self.timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        )
    }
}
