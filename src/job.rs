//! Units of enrichment work and the events emitted when they finish.

use std::fmt;
use std::time::Duration;

/// Internal primary key of a movie row.
pub type MovieId = i64;

/// Identifier assigned to a movie by the external metadata provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TmdbId(pub i64);

impl fmt::Display for TmdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything a worker can hand to a provider on behalf of one row.
///
/// `log_key` is what ends up in per-job log lines, so it should stay short.
pub trait ProviderKey: Send + Sync + 'static {
    /// Short label identifying the key in logs.
    fn log_key(&self) -> String;
}

impl ProviderKey for TmdbId {
    fn log_key(&self) -> String {
        self.to_string()
    }
}

/// Immutable pair of local row id and the key used against the provider.
///
/// Produced once by the candidate selector and consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor<K> {
    /// Row the enrichment result is written back to.
    pub movie_id: MovieId,
    /// Provider-facing key (a TMDB id, or the text to embed).
    pub key: K,
}

impl<K> RecordDescriptor<K> {
    /// Builds a descriptor for `movie_id`.
    pub fn new(movie_id: MovieId, key: K) -> Self {
        Self { movie_id, key }
    }
}

/// Lifecycle of a single job.
///
/// `queued → fetching → (fetch_failed | fetched) → transforming → writing → (write_failed | done)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Sitting in the work queue.
    Queued,
    /// Waiting on the provider.
    Fetching,
    /// Provider call failed; terminal.
    FetchFailed,
    /// Provider response decoded.
    Fetched,
    /// Mapping the response into column values.
    Transforming,
    /// Waiting on the store.
    Writing,
    /// Store rejected the update; terminal.
    WriteFailed,
    /// Row updated; terminal.
    Done,
}

impl JobState {
    /// Whether the job can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::FetchFailed | Self::WriteFailed | Self::Done)
    }

    /// Moves to the next non-failing state.
    pub fn advance(self) -> Self {
        match self {
            Self::Queued => Self::Fetching,
            Self::Fetching => Self::Fetched,
            Self::Fetched => Self::Transforming,
            Self::Transforming => Self::Writing,
            Self::Writing => Self::Done,
            terminal => terminal,
        }
    }

    /// Failure state reachable from the current one, if any.
    pub fn fail(self) -> Option<Self> {
        match self {
            Self::Fetching => Some(Self::FetchFailed),
            Self::Writing => Some(Self::WriteFailed),
            _ => None,
        }
    }

    /// Stable lowercase name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::FetchFailed => "fetch_failed",
            Self::Fetched => "fetched",
            Self::Transforming => "transforming",
            Self::Writing => "writing",
            Self::WriteFailed => "write_failed",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured record of a job that reached a terminal state.
#[derive(Debug, Clone)]
pub struct JobEvent {
    /// Pipeline that ran the job.
    pub pipeline: &'static str,
    /// Worker slot that ran the job.
    pub worker_id: usize,
    /// Row the job targeted.
    pub movie_id: MovieId,
    /// Provider key as rendered by [`ProviderKey::log_key`].
    pub key: String,
    /// Terminal state.
    pub state: JobState,
    /// Short label on success, error text on failure.
    pub detail: Option<String>,
    /// Wall time from dequeue to terminal state.
    pub elapsed: Duration,
}

impl JobEvent {
    /// True when the row was written.
    pub fn is_done(&self) -> bool {
        self.state == JobState::Done
    }
}
