//! Crawling, enrichment and output services

pub mod elitetorrent;
pub mod enrichment;
pub mod error;
pub mod field_merge;
pub mod filmaffinity;
pub mod http;
pub mod imdb;
pub mod ingestion;
pub mod logging;
pub mod omdb;
pub mod sink;
pub mod sources;
pub mod text_utils;
pub mod title_matcher;

pub use elitetorrent::EliteTorrentClient;
pub use enrichment::{Enriched, EnrichmentOrchestrator, EnrichmentSource, StepOutcome, StepReport};
pub use error::{EnrichError, FetchError};
pub use field_merge::{MergeOutcome, merge_field, merge_fields};
pub use filmaffinity::FilmAffinityClient;
pub use http::{HttpClient, HttpConfig};
pub use imdb::{ImdbClient, ImdbSearchMode};
pub use ingestion::{IngestionLoop, IngestionOptions, IngestionSummary, SourceTally};
pub use logging::{LogFormat, init_tracing};
pub use omdb::OmdbClient;
pub use sink::JsonLinesSink;
pub use sources::{CatalogSource, DirectMetadataSource, Locator, RecordIndex, SourceId};
pub use text_utils::{clean_text, fold_for_matching, normalize_title};
pub use title_matcher::{Candidate, MatchMode, TitleMatcher};
