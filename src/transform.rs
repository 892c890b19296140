//! Pure mappings from provider documents to store column values.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Year marker used when a release date is missing or too short.
pub const UNKNOWN_YEAR: &str = "N/A";
/// Crew job title that marks a director credit.
pub const DIRECTOR_JOB: &str = "Director";

/// Genre tag stored in the `genres` JSONB column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    /// Provider genre id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Keyword tag stored in the `keywords` JSONB column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    /// Provider keyword id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Billed cast entry stored in the `cast_list` JSONB column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
    /// Performer name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Character played.
    #[serde(default, deserialize_with = "null_as_default")]
    pub character: String,
    /// Billing order, zero first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: i32,
}

/// Crew credit as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrewMember {
    /// Person name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Job title, e.g. `Director`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub job: String,
}

/// Reads an explicit JSON `null` as the type's default.
///
/// Pair with `#[serde(default)]` so absent keys behave the same way.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Joins every director credit with `", "`, in credit order.
///
/// An empty crew, or one without a director credit, yields an empty string.
pub fn directors(crew: &[CrewMember]) -> String {
    crew.iter()
        .filter(|member| member.job == DIRECTOR_JOB)
        .map(|member| member.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Four-character year prefix of an ISO date, or [`UNKNOWN_YEAR`].
pub fn release_year(date: Option<&str>) -> &str {
    match date.map(str::trim) {
        Some(date) if date.len() >= 4 && date.is_char_boundary(4) => &date[..4],
        _ => UNKNOWN_YEAR,
    }
}

/// Parses a `YYYY-MM-DD` release date; blanks and garbage become `None`.
pub fn release_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Treats empty or whitespace-only strings as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Text fields of a stored movie used to build its retrieval document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingDocument {
    /// Base-language title.
    pub title: String,
    /// Localized title.
    pub title_localized: String,
    /// Base-language tagline.
    pub tagline: String,
    /// Localized tagline.
    pub tagline_localized: String,
    /// Base-language overview.
    pub overview: String,
    /// Localized overview.
    pub overview_localized: String,
    /// Director credit line.
    pub director: String,
    /// Release date as stored, if any.
    pub release_date: Option<String>,
    /// Genre tags.
    pub genres: Vec<Genre>,
    /// Keyword tags.
    pub keywords: Vec<Keyword>,
    /// Billed cast.
    pub cast: Vec<CastMember>,
}

impl EmbeddingDocument {
    /// Renders the bilingual text submitted to the embedding model.
    pub fn render(&self) -> String {
        let genres = join_names(self.genres.iter().map(|genre| genre.name.as_str()));
        let keywords = join_names(self.keywords.iter().map(|keyword| keyword.name.as_str()));
        let mut cast: Vec<&CastMember> = self.cast.iter().collect();
        cast.sort_by_key(|member| member.order);
        let cast = join_names(cast.into_iter().map(|member| member.name.as_str()));
        format!(
            "Represent this movie for retrieval: \
             Titles: [EN: {} | TR: {}]. Year: {}. Director: {}. \
             Metadata: {{Genres: {}. Keywords: {}. Cast: {}}}. \
             EN_Context: {} {}. TR_Baglam: {} {}.",
            self.title,
            self.title_localized,
            release_year(self.release_date.as_deref()),
            self.director,
            genres,
            keywords,
            cast,
            self.tagline,
            self.overview,
            self.tagline_localized,
            self.overview_localized,
        )
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
