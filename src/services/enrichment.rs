//! Enrichment Orchestrator
//!
//! Runs the enabled sources against one movie record, in a fixed order:
//! - Direct sources answer a title query with a field set; a failure there is
//!   fatal for the record
//! - Catalog sources are searched, the listing is matched against the title
//!   in subset mode and the chosen detail page is scraped; any failure there
//!   is a recorded miss and the next source still runs
//!
//! Every step reads the title the record holds at that point, so a catalog
//! that discovers the original title feeds it to the sources after it.
//! The orchestrator works on a copy of the record and only hands it back once
//! every step has run.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::EnrichError;
use super::field_merge::merge_fields;
use super::sources::{CatalogSource, DirectMetadataSource, SourceId};
use super::title_matcher::{MatchMode, TitleMatcher};
use crate::models::MovieRecord;

/// An enabled source, in the shape the orchestrator needs to drive it
#[derive(Clone)]
pub enum EnrichmentSource {
    Direct(Arc<dyn DirectMetadataSource>),
    Catalog(Arc<dyn CatalogSource>),
}

impl EnrichmentSource {
    pub fn id(&self) -> SourceId {
        match self {
            EnrichmentSource::Direct(source) => source.id(),
            EnrichmentSource::Catalog(source) => source.id(),
        }
    }
}

/// What one step did to the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Fields were fetched and merged; `changed` lists those whose value moved
    Applied { changed: Vec<&'static str> },
    /// The catalog listing had no acceptable candidate
    NoMatch,
    /// The catalog could not be reached or answered garbage
    Missed { kind: &'static str },
}

/// Outcome of one source for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub source: SourceId,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// A record after every enabled source ran against it
#[derive(Debug, Clone)]
pub struct Enriched {
    pub record: MovieRecord,
    pub steps: Vec<StepReport>,
}

/// Drives the enabled sources against a record
#[derive(Clone, Default)]
pub struct EnrichmentOrchestrator {
    sources: Vec<EnrichmentSource>,
    matcher: TitleMatcher,
    overwrite: bool,
}

impl EnrichmentOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a direct source; sources run in the order they were added
    pub fn with_direct(mut self, source: Arc<dyn DirectMetadataSource>) -> Self {
        self.sources.push(EnrichmentSource::Direct(source));
        self
    }

    /// Append a catalog source; sources run in the order they were added
    pub fn with_catalog(mut self, source: Arc<dyn CatalogSource>) -> Self {
        self.sources.push(EnrichmentSource::Catalog(source));
        self
    }

    pub fn with_matcher(mut self, matcher: TitleMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(EnrichmentSource::id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Run every enabled source against a copy of `base`.
    ///
    /// Returns the enriched copy, or the first direct-source failure. `base`
    /// itself is never touched, so a failed run leaves the caller holding the
    /// record as it was before enrichment.
    pub async fn enrich(&self, base: &MovieRecord) -> Result<Enriched, EnrichError> {
        let mut record = base.clone();
        let mut steps = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let outcome = match source {
                EnrichmentSource::Direct(direct) => self.direct_step(direct.as_ref(), &mut record).await?,
                EnrichmentSource::Catalog(catalog) => self.catalog_step(catalog.as_ref(), &mut record).await,
            };

            steps.push(StepReport {
                source: source.id(),
                outcome,
            });
        }

        Ok(Enriched { record, steps })
    }

    async fn direct_step(
        &self,
        source: &dyn DirectMetadataSource,
        record: &mut MovieRecord,
    ) -> Result<StepOutcome, EnrichError> {
        let title = record.search_title().to_string();

        let fields = source
            .fetch_direct_metadata(&title)
            .await
            .map_err(|error| EnrichError::DirectApi {
                source_id: source.id(),
                title: title.clone(),
                error,
            })?;

        let outcome = merge_fields(record, &fields, self.overwrite);
        record.updated = outcome.is_changed();

        debug!(
            source = %source.id(),
            title = %title,
            changed = outcome.changed.len(),
            "Direct lookup merged"
        );
        Ok(StepOutcome::Applied {
            changed: outcome.changed,
        })
    }

    async fn catalog_step(&self, source: &dyn CatalogSource, record: &mut MovieRecord) -> StepOutcome {
        let id = source.id();
        let title = record.search_title().to_string();

        let candidates = match source.search_candidates(&title).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(source = %id, title = %title, kind = e.kind(), transient = e.is_transient(), error = %e, "Catalog search failed, skipping source");
                return StepOutcome::Missed { kind: e.kind() };
            }
        };

        let Some(locator) = self.matcher.find_match(&title, &candidates, MatchMode::Subset) else {
            info!(source = %id, title = %title, candidates = candidates.len(), "No matching catalog entry");
            return StepOutcome::NoMatch;
        };

        let fields = match source.fetch_detail_fields(locator).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(source = %id, title = %title, url = %locator, kind = e.kind(), transient = e.is_transient(), error = %e, "Catalog detail fetch failed, skipping source");
                return StepOutcome::Missed { kind: e.kind() };
            }
        };

        let outcome = merge_fields(record, &fields, self.overwrite);
        debug!(source = %id, title = %title, url = %locator, changed = ?outcome.changed, "Catalog entry merged");

        StepOutcome::Applied {
            changed: outcome.changed,
        }
    }
}
