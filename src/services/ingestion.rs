//! Ingestion loop
//!
//! Walks the torrent index page by page, enriches each record and appends it
//! to the output sink. Records of a page are enriched concurrently through a
//! bounded pool but reach the sink in listing order.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};

use super::enrichment::{Enriched, EnrichmentOrchestrator, StepOutcome};
use super::error::EnrichError;
use super::sink::JsonLinesSink;
use super::sources::{RecordIndex, SourceId};
use crate::models::MovieRecord;

/// Paging and pool settings for one run
#[derive(Debug, Clone, Copy)]
pub struct IngestionOptions {
    /// First listing page to fetch
    pub first_page: u32,
    /// Stop before this page; 0 runs until the listing is empty
    pub last_page: u32,
    /// Records enriched at the same time
    pub workers: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            first_page: 1,
            last_page: 0,
            workers: 4,
        }
    }
}

/// Per-source step counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceTally {
    /// Steps that merged fields, changed or not
    pub applied: usize,
    pub no_match: usize,
    pub missed: usize,
}

/// What a run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionSummary {
    pub pages: u32,
    pub written: usize,
    /// Records whose detail page could not be fetched
    pub skipped: usize,
    /// Records written unenriched after a direct source failed
    pub fatal: usize,
    /// Records a direct source changed
    pub updated: usize,
    pub sources: BTreeMap<SourceId, SourceTally>,
    /// The run was stopped by the shutdown signal
    pub interrupted: bool,
}

impl IngestionSummary {
    fn tally(&mut self, enriched: &Enriched) {
        if enriched.record.is_updated() {
            self.updated += 1;
        }
        for step in &enriched.steps {
            let tally = self.sources.entry(step.source).or_default();
            match step.outcome {
                StepOutcome::Applied { .. } => tally.applied += 1,
                StepOutcome::NoMatch => tally.no_match += 1,
                StepOutcome::Missed { .. } => tally.missed += 1,
            }
        }
    }
}

enum RecordResult {
    Enriched(Enriched),
    /// A direct source failed; carries the record as crawled
    Fatal(MovieRecord, EnrichError),
    Skipped,
}

/// Crawls the index and feeds every record through the orchestrator
pub struct IngestionLoop {
    index: Arc<dyn RecordIndex>,
    orchestrator: EnrichmentOrchestrator,
    options: IngestionOptions,
}

impl IngestionLoop {
    pub fn new(index: Arc<dyn RecordIndex>, orchestrator: EnrichmentOrchestrator, options: IngestionOptions) -> Self {
        Self {
            index,
            orchestrator,
            options,
        }
    }

    /// Run until the listing is exhausted, the last page is reached or `shutdown` resolves.
    ///
    /// A listing page that cannot be fetched ends the run with an error;
    /// records already written stay in the sink.
    pub async fn run<F>(&self, sink: &mut JsonLinesSink, shutdown: F) -> Result<IngestionSummary>
    where
        F: Future<Output = ()>,
    {
        let mut summary = IngestionSummary::default();
        let workers = self.options.workers.max(1);
        let mut page = self.options.first_page;

        tokio::pin!(shutdown);

        'pages: loop {
            let paths = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    summary.interrupted = true;
                    break 'pages;
                }
                paths = self.index.record_paths(page) => {
                    paths.with_context(|| format!("Failed to fetch listing page {}", page))?
                }
            };

            if paths.is_empty() {
                info!(page, "Listing page is empty, stopping");
                break;
            }

            info!(page, records = paths.len(), "Processing listing page");
            summary.pages += 1;

            let mut results = stream::iter(paths)
                .map(|path| self.process_record(path))
                .buffered(workers);

            loop {
                let next = tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        summary.interrupted = true;
                        break 'pages;
                    }
                    next = results.next() => next,
                };

                let Some(result) = next else {
                    break;
                };

                match result {
                    RecordResult::Enriched(enriched) => {
                        summary.tally(&enriched);
                        sink.write_record(&enriched.record).await?;
                        summary.written += 1;
                    }
                    RecordResult::Fatal(record, e) => {
                        error!(
                            title = %record.title,
                            source = %e.source_id(),
                            kind = e.kind(),
                            error = %e,
                            "Enrichment aborted, writing record as crawled"
                        );
                        sink.write_record(&record).await?;
                        summary.written += 1;
                        summary.fatal += 1;
                    }
                    RecordResult::Skipped => summary.skipped += 1,
                }
            }

            page += 1;
            if self.options.last_page != 0 && page >= self.options.last_page {
                info!(page, "Reached final page");
                break;
            }
        }

        if summary.interrupted {
            warn!(page, written = summary.written, "Ingestion interrupted");
        }
        Ok(summary)
    }

    async fn process_record(&self, path: String) -> RecordResult {
        let base = match self.index.fetch_record(&path).await {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path, kind = e.kind(), transient = e.is_transient(), error = %e, "Failed to fetch record, skipping");
                return RecordResult::Skipped;
            }
        };

        match self.orchestrator.enrich(&base).await {
            Ok(enriched) => {
                info!(title = %enriched.record.title, steps = enriched.steps.len(), "Record enriched");
                RecordResult::Enriched(enriched)
            }
            Err(e) => RecordResult::Fatal(base, e),
        }
    }
}
