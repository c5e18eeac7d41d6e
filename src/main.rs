//! Scratcher - torrent index crawler with movie metadata enrichment
//!
//! Walks the EliteTorrent HDRip listing, enriches every movie through the
//! enabled sources and appends one JSON object per movie to `<output>.json`.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use scratcher::cli::CliOptions;
use scratcher::config::Config;
use scratcher::services::{
    EliteTorrentClient, EnrichmentOrchestrator, FilmAffinityClient, HttpClient, ImdbClient,
    IngestionLoop, IngestionOptions, JsonLinesSink, OmdbClient, SourceId, TitleMatcher, init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    let options = CliOptions::from_args()?;
    info!(?options, "Starting scratcher");

    let http = Arc::new(HttpClient::new("scratcher", &config.http_config())?);

    let mut orchestrator = EnrichmentOrchestrator::new()
        .with_matcher(TitleMatcher::new(config.match_extra_letters.clone()))
        .with_overwrite(options.overwrite);

    for source in options.enabled_sources() {
        orchestrator = match source {
            SourceId::Omdb => {
                if config.omdb_api_key.is_none() {
                    warn!("OMDB_API_KEY is not set, OMDb lookups may be rejected");
                }
                orchestrator.with_direct(Arc::new(OmdbClient::new(
                    http.clone(),
                    config.omdb_base_url.clone(),
                    config.omdb_api_key.clone(),
                )))
            }
            SourceId::FilmAffinity => orchestrator.with_catalog(Arc::new(FilmAffinityClient::new(
                http.clone(),
                config.filmaffinity_base_url.clone(),
            ))),
            SourceId::Imdb => orchestrator.with_catalog(Arc::new(ImdbClient::new(
                http.clone(),
                config.imdb_base_url.clone(),
                config.imdb_search_mode,
            ))),
        };
    }

    if orchestrator.is_empty() {
        warn!("No enrichment source enabled, records are written as crawled");
    } else {
        info!(sources = ?orchestrator.source_ids(), overwrite = options.overwrite, "Enrichment sources configured");
    }

    let index = Arc::new(EliteTorrentClient::new(
        http.clone(),
        config.elitetorrent_base_url.clone(),
        config.elitetorrent_category.clone(),
    ));

    let ingestion = IngestionLoop::new(
        index,
        orchestrator,
        IngestionOptions {
            first_page: options.first_page,
            last_page: options.last_page,
            workers: options.workers.unwrap_or(config.enrich_workers),
        },
    );

    let mut sink = JsonLinesSink::open(options.output_path()).await?;
    info!(path = %sink.path().display(), "Appending records");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    };

    let summary = ingestion.run(&mut sink, shutdown).await?;

    info!(
        pages = summary.pages,
        written = summary.written,
        skipped = summary.skipped,
        fatal = summary.fatal,
        updated = summary.updated,
        interrupted = summary.interrupted,
        sources = %serde_json::to_string(&summary.sources).unwrap_or_default(),
        "Ingestion finished"
    );

    Ok(())
}
