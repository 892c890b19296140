//! The four enrichments run by the pipeline binaries.

pub mod embedding;
pub mod localized;
pub mod metadata;
pub mod poster;

pub use embedding::EmbeddingSync;
pub use localized::LocalizedSync;
pub use metadata::MetadataSync;
pub use poster::PosterSync;

/// Sub-resources appended to the full metadata request.
pub const METADATA_APPEND: &[&str] = &["credits", "keywords"];
