//! EliteTorrent index crawler
//!
//! The category listing is paged (`.../modo:listado/orden:valoracion/pag:N`)
//! and links every movie with an `a.nombre` anchor. The detail page carries
//! the title, description, rating, cover and a single 720p torrent.
//!
//! Base URL: http://www.elitetorrent.net

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::error::FetchError;
use super::http::HttpClient;
use super::sources::RecordIndex;
use super::text_utils::{clean_text, normalize_title};
use crate::models::{DEFAULT_QUALITY, MovieRecord, TorrentInfo};

static RECORD_LINKS: Lazy<Selector> = Lazy::new(|| css("a.nombre"));
static TITLE: Lazy<Selector> = Lazy::new(|| css("#box-ficha > h2"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| css("p.descrip"));
static RATING: Lazy<Selector> = Lazy::new(|| css("span.valoracion"));
static COVER: Lazy<Selector> = Lazy::new(|| css("img.imagen_ficha"));
static MAGNET: Lazy<Selector> = Lazy::new(|| css("a[href^=magnet]"));
static TECH_INFO: Lazy<Selector> = Lazy::new(|| css("dl.info-tecnica dd"));
static SWARM: Lazy<Selector> = Lazy::new(|| css("div.ppal"));

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

/// EliteTorrent crawler
pub struct EliteTorrentClient {
    http: Arc<HttpClient>,
    base_url: String,
    category: String,
}

impl EliteTorrentClient {
    pub fn new(http: Arc<HttpClient>, base_url: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            category: category.into(),
        }
    }

    /// Listing URL for a page, best rated first
    pub fn listing_url(&self, page: u32) -> String {
        format!(
            "{}/{}/modo:listado/orden:valoracion/pag:{}",
            self.base_url.trim_end_matches('/'),
            self.category.trim_matches('/'),
            page
        )
    }

    fn record_url(&self, path: &str) -> String {
        absolute_url(&self.base_url, path)
    }
}

#[async_trait]
impl RecordIndex for EliteTorrentClient {
    async fn record_paths(&self, page: u32) -> Result<Vec<String>, FetchError> {
        let url = self.listing_url(page);
        info!(page, url = %url, "Fetching listing page");

        let listing = self.http.get_page(&url).await?;
        let paths = parse_listing_page(&listing.body);

        debug!(page, count = paths.len(), "Listing page parsed");
        Ok(paths)
    }

    async fn fetch_record(&self, path: &str) -> Result<MovieRecord, FetchError> {
        let url = self.record_url(path);
        info!(path = %path, "Retrieving record");

        let page = self.http.get_page(&url).await?;
        Ok(parse_record_page(&page.body, &url, &self.base_url))
    }
}

fn absolute_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn element_text(element: &ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Detail page paths linked from a listing page
pub fn parse_listing_page(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    document
        .select(&RECORD_LINKS)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Base record from a detail page served at `url`
pub fn parse_record_page(body: &str, url: &str, base_url: &str) -> MovieRecord {
    let document = Html::parse_document(body);

    let title = document
        .select(&TITLE)
        .map(|h| h.text().collect::<String>())
        .collect::<String>();
    let mut record = MovieRecord::new(clean_text(&normalize_title(&title)), url);

    record.description = document
        .select(&DESCRIPTION)
        .nth(1)
        .map(|p| element_text(&p))
        .filter(|d| !d.is_empty());

    record.rating = document
        .select(&RATING)
        .next()
        .map(|r| element_text(&r))
        .filter(|r| !r.is_empty());

    record.image_url = document
        .select(&COVER)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| absolute_url(base_url, src));

    let filesize = document
        .select(&TECH_INFO)
        .nth(3)
        .map(|dd| element_text(&dd))
        .unwrap_or_default();

    record.file_size = filesize
        .split_whitespace()
        .next()
        .map(str::to_string);

    let swarm = document
        .select(&SWARM)
        .map(|d| d.text().collect::<String>())
        .collect::<String>();
    let (seeds, peers) = parse_swarm(&swarm);

    let torrent = TorrentInfo {
        magnet: document
            .select(&MAGNET)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string(),
        filesize,
        seeds,
        peers,
    };
    record.add_torrent(DEFAULT_QUALITY, torrent);

    record
}

/// Seeds and peers from the swarm box ("Semillas: 120 ... Clientes: 45").
/// The counts are the 2nd and 5th whitespace-separated tokens; missing or
/// unparsable tokens read as 0.
fn parse_swarm(text: &str) -> (u16, u16) {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let count = |i: usize| {
        tokens
            .get(i)
            .and_then(|t| t.parse::<u16>().ok())
            .unwrap_or(0)
    };
    (count(1), count(4))
}
