//! Contracts between the orchestrator and the external sources
//!
//! A direct source answers a title query with a ready field set. A catalog
//! source needs its search listing matched against the title before the
//! detail page of the chosen entry can be scraped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::FetchError;
use super::title_matcher::Candidate;
use crate::models::{FieldMap, MovieRecord};

/// Enrichment sources known to the crawler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Omdb,
    FilmAffinity,
    Imdb,
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceId::Omdb => write!(f, "omdb"),
            SourceId::FilmAffinity => write!(f, "filmaffinity"),
            SourceId::Imdb => write!(f, "imdb"),
        }
    }
}

impl std::str::FromStr for SourceId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "omdb" => Ok(SourceId::Omdb),
            "filmaffinity" | "film-affinity" | "fa" => Ok(SourceId::FilmAffinity),
            "imdb" => Ok(SourceId::Imdb),
            _ => Err(anyhow::anyhow!("Unknown source: {}", s)),
        }
    }
}

/// Opaque reference to a detail page, as handed out by a catalog search
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source that returns metadata for an exact title query
#[async_trait]
pub trait DirectMetadataSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Flat field map keyed by canonical field names
    async fn fetch_direct_metadata(&self, title: &str) -> Result<FieldMap, FetchError>;
}

/// A source that must be searched before its detail pages can be scraped
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Search results in the order the source presents them
    async fn search_candidates(&self, query: &str) -> Result<Vec<Candidate<Locator>>, FetchError>;

    /// Fields scraped from the detail page behind `locator`
    async fn fetch_detail_fields(&self, locator: &Locator) -> Result<FieldMap, FetchError>;
}

/// The torrent index the crawler walks
#[async_trait]
pub trait RecordIndex: Send + Sync {
    /// Detail page paths on listing page `page`, in listing order. Empty past the last page.
    async fn record_paths(&self, page: u32) -> Result<Vec<String>, FetchError>;

    /// Base record scraped from the detail page at `path`
    async fn fetch_record(&self, path: &str) -> Result<MovieRecord, FetchError>;
}
