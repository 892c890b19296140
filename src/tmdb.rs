//! TMDB v3 client used by the metadata, localized-text, and poster pipelines.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::FetchError;
use crate::job::TmdbId;
use crate::transform::{null_as_default, CastMember, CrewMember, Genre, Keyword};

const USER_AGENT: &str = concat!("filmsync/", env!("CARGO_PKG_VERSION"));

/// Async client for `GET /movie/{id}`.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    /// Builds a new TMDB client with a fixed request timeout.
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing TMDB API key");
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "TMDB base URL must be an http(s) URL"
        );
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    /// Fetches one movie document.
    ///
    /// `language` selects localized fields; `append` adds sub-resources such
    /// as `credits` or `keywords` to the same response.
    pub async fn movie<T: DeserializeOwned>(
        &self,
        id: TmdbId,
        language: Option<&str>,
        append: &[&str],
    ) -> Result<T, FetchError> {
        let url = format!("{}/movie/{}", self.base_url, id);
        let mut query: Vec<(&str, String)> = vec![("api_key", self.api_key.clone())];
        if let Some(language) = language {
            query.push(("language", language.to_string()));
        }
        if !append.is_empty() {
            query.push(("append_to_response", append.join(",")));
        }

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(FetchError::status(status, &body));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| FetchError::Decode(err.to_string()))
    }
}

/// Full movie document with `credits` and `keywords` appended.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovieDetails {
    /// Localized title.
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    /// Localized overview.
    #[serde(deserialize_with = "null_as_default")]
    pub overview: String,
    /// Localized tagline.
    #[serde(deserialize_with = "null_as_default")]
    pub tagline: String,
    /// Poster path, `null` when the provider has none.
    pub poster_path: Option<String>,
    /// `YYYY-MM-DD`, possibly empty.
    #[serde(deserialize_with = "null_as_default")]
    pub release_date: String,
    /// Provider popularity score.
    #[serde(deserialize_with = "null_as_default")]
    pub popularity: f64,
    /// Mean vote.
    #[serde(deserialize_with = "null_as_default")]
    pub vote_average: f64,
    /// Number of votes.
    #[serde(deserialize_with = "null_as_default")]
    pub vote_count: i32,
    /// ISO 639-1 code of the original language.
    #[serde(deserialize_with = "null_as_default")]
    pub original_language: String,
    /// Genre tags.
    #[serde(deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
    /// Appended keyword block.
    #[serde(deserialize_with = "null_as_default")]
    pub keywords: KeywordBlock,
    /// Appended credits block.
    #[serde(deserialize_with = "null_as_default")]
    pub credits: Credits,
}

/// `keywords` sub-resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeywordBlock {
    /// Keyword tags.
    #[serde(deserialize_with = "null_as_default")]
    pub keywords: Vec<Keyword>,
}

/// `credits` sub-resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credits {
    /// Billed cast.
    #[serde(deserialize_with = "null_as_default")]
    pub cast: Vec<CastMember>,
    /// Crew credits.
    #[serde(deserialize_with = "null_as_default")]
    pub crew: Vec<CrewMember>,
}

/// Localized text subset of a movie document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocalizedText {
    /// Localized title.
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    /// Localized overview.
    #[serde(deserialize_with = "null_as_default")]
    pub overview: String,
    /// Localized tagline.
    #[serde(deserialize_with = "null_as_default")]
    pub tagline: String,
    /// Poster path, if any.
    pub poster_path: Option<String>,
}

/// Poster-only view of a movie document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PosterDocument {
    /// Poster path, if any.
    pub poster_path: Option<String>,
}
