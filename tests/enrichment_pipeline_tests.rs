//! End-to-end behavior of the enrichment pipeline with in-memory sources

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use scratcher::models::{DEFAULT_QUALITY, FieldMap, MovieRecord, TorrentInfo};
use scratcher::services::{
    Candidate, CatalogSource, DirectMetadataSource, EnrichmentOrchestrator, FetchError,
    IngestionLoop, IngestionOptions, JsonLinesSink, Locator, RecordIndex, SourceId, StepOutcome,
};

/// Direct source answering from a title -> fields table; unknown titles get an empty map
struct TableDirect {
    table: HashMap<&'static str, Vec<(&'static str, &'static str)>>,
    failing: Vec<&'static str>,
}

impl TableDirect {
    fn new(entries: &[(&'static str, &[(&'static str, &'static str)])]) -> Self {
        Self {
            table: entries.iter().map(|(t, f)| (*t, f.to_vec())).collect(),
            failing: Vec::new(),
        }
    }

    fn failing_for(mut self, title: &'static str) -> Self {
        self.failing.push(title);
        self
    }
}

#[async_trait]
impl DirectMetadataSource for TableDirect {
    fn id(&self) -> SourceId {
        SourceId::Omdb
    }

    async fn fetch_direct_metadata(&self, title: &str) -> Result<FieldMap, FetchError> {
        if self.failing.iter().any(|t| *t == title) {
            return Err(FetchError::Transport("connection reset".into()));
        }
        // Let other records interleave with this one
        tokio::task::yield_now().await;
        Ok(self
            .table
            .get(title)
            .map(|fields| fields.iter().copied().collect())
            .unwrap_or_default())
    }
}

/// Catalog source with a fixed listing and per-locator detail pages
struct FixedCatalog {
    id: SourceId,
    listing: Vec<(&'static str, &'static str)>,
    details: HashMap<&'static str, Vec<(&'static str, &'static str)>>,
    detail_fetches: AtomicUsize,
}

impl FixedCatalog {
    fn new(id: SourceId) -> Self {
        Self {
            id,
            listing: Vec::new(),
            details: HashMap::new(),
            detail_fetches: AtomicUsize::new(0),
        }
    }

    fn entry(
        mut self,
        text: &'static str,
        locator: &'static str,
        fields: &[(&'static str, &'static str)],
    ) -> Self {
        self.listing.push((text, locator));
        self.details.insert(locator, fields.to_vec());
        self
    }
}

#[async_trait]
impl CatalogSource for FixedCatalog {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn search_candidates(&self, _query: &str) -> Result<Vec<Candidate<Locator>>, FetchError> {
        Ok(self
            .listing
            .iter()
            .map(|(text, locator)| Candidate::new(*text, Locator::new(*locator)))
            .collect())
    }

    async fn fetch_detail_fields(&self, locator: &Locator) -> Result<FieldMap, FetchError> {
        self.detail_fetches.fetch_add(1, Ordering::SeqCst);
        self.details
            .get(locator.as_str())
            .map(|fields| fields.iter().copied().collect())
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: locator.to_string(),
            })
    }
}

/// Index serving a fixed set of listing pages
struct FakeIndex {
    pages: Vec<Vec<&'static str>>,
    unreachable: Vec<&'static str>,
}

#[async_trait]
impl RecordIndex for FakeIndex {
    async fn record_paths(&self, page: u32) -> Result<Vec<String>, FetchError> {
        let index = page as usize - 1;
        Ok(self
            .pages
            .get(index)
            .map(|paths| paths.iter().map(|p| p.to_string()).collect())
            .unwrap_or_default())
    }

    async fn fetch_record(&self, path: &str) -> Result<MovieRecord, FetchError> {
        if self.unreachable.iter().any(|p| *p == path) {
            return Err(FetchError::Status {
                status: 500,
                url: path.to_string(),
            });
        }
        let title = path.trim_start_matches("/torrent/");
        Ok(base_record(title))
    }
}

fn base_record(title: &str) -> MovieRecord {
    let mut record = MovieRecord::new(title, format!("http://index/torrent/{}", title));
    record.add_torrent(
        DEFAULT_QUALITY,
        TorrentInfo {
            magnet: format!("magnet:?xt=urn:btih:{}", title),
            filesize: "1.4 GB".to_string(),
            seeds: 10,
            peers: 2,
        },
    );
    record
}

fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_direct_lookup_enriches_base_record() {
    let orchestrator = EnrichmentOrchestrator::new().with_direct(Arc::new(TableDirect::new(&[(
        "Inception",
        &[("year", "2010"), ("genre", "Sci-Fi"), ("imdb_rating", "8.8")],
    )])));

    let enriched = orchestrator.enrich(&base_record("Inception")).await.unwrap();
    let record = enriched.record;

    assert_eq!(record.year.as_deref(), Some("2010"));
    assert_eq!(record.genre.as_deref(), Some("Sci-Fi"));
    assert!((record.imdb_rating() - 8.8).abs() < 0.001);
    assert_eq!(record.torrents.len(), 1);
    assert!(record.is_updated());
}

#[tokio::test]
async fn test_empty_candidate_list_leaves_record_and_continues() {
    let mut base = base_record("Her");
    base.director = Some("Spike Jonze".to_string());
    base.country = Some("Estados Unidos".to_string());

    let catalog = Arc::new(FixedCatalog::new(SourceId::FilmAffinity));
    let orchestrator = EnrichmentOrchestrator::new()
        .with_catalog(catalog.clone())
        .with_direct(Arc::new(TableDirect::new(&[("Her", &[("year", "2013")])])));

    let enriched = orchestrator.enrich(&base).await.unwrap();

    assert_eq!(enriched.steps[0].outcome, StepOutcome::NoMatch);
    assert_eq!(catalog.detail_fetches.load(Ordering::SeqCst), 0);
    assert_eq!(enriched.record.director, base.director);
    assert_eq!(enriched.record.country, base.country);
    assert_eq!(enriched.record.year.as_deref(), Some("2013"));
}

#[tokio::test]
async fn test_first_source_wins_without_overwrite() {
    let filmaffinity = FixedCatalog::new(SourceId::FilmAffinity).entry(
        "Origen (Inception)",
        "fa/971380",
        &[
            ("original_title", "Inception"),
            ("duration", "148 min."),
            ("genre", "Ciencia ficción"),
            ("film_affinity_id", "971380"),
        ],
    );
    let imdb = FixedCatalog::new(SourceId::Imdb).entry(
        "Inception",
        "imdb/tt1375666",
        &[
            ("duration", "148 min"),
            ("genre", "Action"),
            ("imdb_id", "tt1375666"),
            ("imdb_rating", "8.8"),
        ],
    );

    let base = base_record("Origen");

    let kept = EnrichmentOrchestrator::new()
        .with_catalog(Arc::new(filmaffinity))
        .with_catalog(Arc::new(imdb))
        .enrich(&base)
        .await
        .unwrap()
        .record;

    assert_eq!(kept.original_title.as_deref(), Some("Inception"));
    assert_eq!(kept.duration.as_deref(), Some("148 min."));
    assert_eq!(kept.genre.as_deref(), Some("Ciencia ficción|Action"));
    assert_eq!(kept.film_affinity_id.as_deref(), Some("971380"));
    assert_eq!(kept.imdb_id.as_deref(), Some("tt1375666"));
}

#[tokio::test]
async fn test_last_source_wins_with_overwrite() {
    let direct = TableDirect::new(&[("Inception", &[("duration", "148 min"), ("plot", "A thief.")])]);
    let catalog = FixedCatalog::new(SourceId::FilmAffinity).entry(
        "Inception",
        "fa/971380",
        &[("duration", "148 min."), ("plot", "")],
    );

    let record = EnrichmentOrchestrator::new()
        .with_direct(Arc::new(direct))
        .with_catalog(Arc::new(catalog))
        .with_overwrite(true)
        .enrich(&base_record("Inception"))
        .await
        .unwrap()
        .record;

    assert_eq!(record.duration.as_deref(), Some("148 min."));
    // An empty incoming value never clears a stored one
    assert_eq!(record.plot.as_deref(), Some("A thief."));
}

#[tokio::test]
async fn test_concurrent_enrichment_matches_sequential() {
    let orchestrator = EnrichmentOrchestrator::new()
        .with_direct(Arc::new(TableDirect::new(&[
            ("Inception", &[("year", "2010"), ("genre", "Sci-Fi")]),
            ("Her", &[("year", "2013"), ("genre", "Drama"), ("genre", "Romance")]),
        ])))
        .with_catalog(Arc::new(
            FixedCatalog::new(SourceId::Imdb)
                .entry("Her (2013)", "imdb/tt1798709", &[("director", "Spike Jonze")])
                .entry("Inception (2010)", "imdb/tt1375666", &[("director", "Christopher Nolan")]),
        ));

    let inception = base_record("Inception");
    let her = base_record("Her");

    let sequential = (
        orchestrator.enrich(&inception).await.unwrap().record,
        orchestrator.enrich(&her).await.unwrap().record,
    );
    let (a, b) = tokio::join!(orchestrator.enrich(&inception), orchestrator.enrich(&her));
    let concurrent = (a.unwrap().record, b.unwrap().record);

    assert_eq!(concurrent, sequential);
    assert_eq!(concurrent.0.director.as_deref(), Some("Christopher Nolan"));
    assert_eq!(concurrent.1.genre.as_deref(), Some("Drama|Romance"));
}

#[tokio::test]
async fn test_ingestion_writes_every_record_in_listing_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("movies.json");

    let index = FakeIndex {
        pages: vec![
            vec!["/torrent/Inception", "/torrent/Her", "/torrent/Broken"],
            vec!["/torrent/Origen"],
            vec!["/torrent/Never"],
        ],
        unreachable: vec!["/torrent/Broken"],
    };
    let direct = TableDirect::new(&[
        ("Inception", &[("year", "2010")]),
        ("Origen", &[("year", "2010")]),
    ])
    .failing_for("Her");

    let ingestion = IngestionLoop::new(
        Arc::new(index),
        EnrichmentOrchestrator::new().with_direct(Arc::new(direct)),
        IngestionOptions {
            first_page: 1,
            last_page: 3,
            workers: 3,
        },
    );

    let mut sink = JsonLinesSink::open(&path).await.unwrap();
    let summary = ingestion
        .run(&mut sink, std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.written, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.fatal, 1);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.sources[&SourceId::Omdb].applied, 2);
    assert!(!summary.interrupted);

    let lines = read_lines(&path);
    let titles: Vec<&str> = lines.iter().map(|l| l["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Inception", "Her", "Origen"]);
    assert_eq!(lines[0]["year"], "2010");
    // The failed record is written as crawled
    assert!(lines[1].get("year").is_none());
    assert_eq!(lines[1]["torrents"]["720p"]["seeds"], 10);
}

#[tokio::test]
async fn test_ingestion_stops_on_empty_listing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("movies.json");

    let ingestion = IngestionLoop::new(
        Arc::new(FakeIndex {
            pages: vec![vec!["/torrent/Her"]],
            unreachable: vec![],
        }),
        EnrichmentOrchestrator::new(),
        IngestionOptions::default(),
    );

    let mut sink = JsonLinesSink::open(&path).await.unwrap();
    let summary = ingestion
        .run(&mut sink, std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(read_lines(&path).len(), 1);
}

#[tokio::test]
async fn test_shutdown_before_start_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("movies.json");

    let ingestion = IngestionLoop::new(
        Arc::new(FakeIndex {
            pages: vec![vec!["/torrent/Her"]],
            unreachable: vec![],
        }),
        EnrichmentOrchestrator::new(),
        IngestionOptions::default(),
    );

    let mut sink = JsonLinesSink::open(&path).await.unwrap();
    let summary = ingestion.run(&mut sink, async {}).await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.written, 0);
    assert!(read_lines(&path).is_empty());
}
