//! IMDb catalog scraper
//!
//! Two search flavors are supported: the general `find` page and the
//! advanced title search restricted to released feature films, newest first.
//! Title pages are read from their schema.org microdata, with the JSON-LD
//! block as a fallback for pages that no longer carry `itemprop` attributes.
//!
//! Base URL: http://www.imdb.com

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::error::FetchError;
use super::http::HttpClient;
use super::sources::{CatalogSource, Locator, SourceId};
use super::text_utils::clean_text;
use super::title_matcher::Candidate;
use crate::models::FieldMap;

/// Result link selectors, tried in order until one yields links
static RESULT_LINKS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".title a",
        ".result_text a",
        ".lister-item-header a",
        "a.ipc-metadata-list-summary-item__t",
    ]
    .into_iter()
    .map(css)
    .collect()
});
static GENRE: Lazy<Selector> = Lazy::new(|| css("[itemprop=genre]"));
static RATING_VALUE: Lazy<Selector> =
    Lazy::new(|| css("[itemprop=aggregateRating] [itemprop=ratingValue]"));
static RATING_COUNT: Lazy<Selector> =
    Lazy::new(|| css("[itemprop=aggregateRating] [itemprop=ratingCount]"));
static DIRECTOR_NAME: Lazy<Selector> = Lazy::new(|| css("[itemprop=director] [itemprop=name]"));
static DURATION: Lazy<Selector> = Lazy::new(|| css("[itemprop=duration]"));
static JSON_LD: Lazy<Selector> = Lazy::new(|| css("script[type='application/ld+json']"));

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

/// Which IMDb search page to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImdbSearchMode {
    /// `find?q=<title>&s=all`
    #[default]
    Simple,
    /// `search/title?...&title=<title>&title_type=feature`
    Advanced,
}

impl std::str::FromStr for ImdbSearchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" | "find" => Ok(ImdbSearchMode::Simple),
            "advanced" => Ok(ImdbSearchMode::Advanced),
            _ => Err(anyhow::anyhow!("Unknown IMDb search mode: {}", s)),
        }
    }
}

/// IMDb scraper
pub struct ImdbClient {
    http: Arc<HttpClient>,
    base_url: String,
    mode: ImdbSearchMode,
}

impl ImdbClient {
    pub fn new(http: Arc<HttpClient>, base_url: impl Into<String>, mode: ImdbSearchMode) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            mode,
        }
    }

    fn search_request(&self, title: &str) -> (String, Vec<(&'static str, String)>) {
        let base = self.base_url.trim_end_matches('/');
        match self.mode {
            ImdbSearchMode::Simple => (
                format!("{}/find", base),
                vec![("q", title.to_string()), ("s", "all".to_string())],
            ),
            ImdbSearchMode::Advanced => (
                format!("{}/search/title", base),
                vec![
                    ("production_status", "released".to_string()),
                    ("sort", "year,desc".to_string()),
                    ("title", title.to_string()),
                    ("title_type", "feature".to_string()),
                    ("view", "simple".to_string()),
                ],
            ),
        }
    }
}

#[async_trait]
impl CatalogSource for ImdbClient {
    fn id(&self) -> SourceId {
        SourceId::Imdb
    }

    async fn search_candidates(&self, query: &str) -> Result<Vec<Candidate<Locator>>, FetchError> {
        let (url, params) = self.search_request(query);
        info!(query = %query, mode = ?self.mode, "Searching IMDb");

        let page = self.http.get_page_with_query(&url, &params).await?;
        let candidates = parse_search_page(&page.body, &page.url);

        debug!(count = candidates.len(), "IMDb search returned candidates");
        Ok(candidates)
    }

    async fn fetch_detail_fields(&self, locator: &Locator) -> Result<FieldMap, FetchError> {
        info!(url = %locator, "Fetching IMDb title page");
        let page = self.http.get_page(locator.as_str()).await?;

        let mut fields = parse_title_page(&page.body);
        if let Some(id) = id_from_locator(locator.as_str()) {
            fields.insert("imdb_id", id);
        }
        fields.insert("imdb_url", locator.as_str());
        Ok(fields)
    }
}

/// Title links from a search response served at `page_url`
pub fn parse_search_page(body: &str, page_url: &str) -> Vec<Candidate<Locator>> {
    let document = Html::parse_document(body);
    let base = Url::parse(page_url).ok();

    for selector in RESULT_LINKS.iter() {
        let candidates: Vec<_> = document
            .select(selector)
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                if !href.contains("/title/") {
                    return None;
                }
                Some(Candidate::new(
                    clean_text(&link.text().collect::<String>()),
                    Locator::new(absolute_title_url(base.as_ref(), href)),
                ))
            })
            .collect();

        if !candidates.is_empty() {
            return candidates;
        }
    }

    Vec::new()
}

/// Resolve a result href against the search page and drop tracking parameters
fn absolute_title_url(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|b| b.join(href).ok()) {
        Some(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        None => href.split('?').next().unwrap_or(href).to_string(),
    }
}

/// `tt1375666` from `http://www.imdb.com/title/tt1375666/` (or a bare `/title/...` path)
pub fn id_from_locator(locator: &str) -> Option<String> {
    let path = match Url::parse(locator) {
        Ok(url) => url.path().to_string(),
        Err(_) => locator.split('?').next().unwrap_or(locator).to_string(),
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == "title")?;
    segments.next().map(str::to_string)
}

fn element_text(element: &ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Fields scraped from a title page
pub fn parse_title_page(body: &str) -> FieldMap {
    let document = Html::parse_document(body);
    let mut fields = FieldMap::new();

    if let Some(genre) = document.select(&GENRE).next() {
        fields.insert("genre", element_text(&genre));
    }
    if let Some(rating) = document.select(&RATING_VALUE).next() {
        fields.insert("imdb_rating", element_text(&rating));
    }
    if let Some(count) = document.select(&RATING_COUNT).next() {
        fields.insert("imdb_votes", element_text(&count));
    }

    let directors: Vec<String> = document
        .select(&DIRECTOR_NAME)
        .map(|d| element_text(&d))
        .filter(|d| !d.is_empty())
        .collect();
    if !directors.is_empty() {
        fields.insert("director", directors.join(", "));
    }

    if let Some(duration) = document.select(&DURATION).last() {
        fields.insert("duration", element_text(&duration));
    }

    if let Some(linked_data) = document
        .select(&JSON_LD)
        .filter_map(|s| serde_json::from_str::<Value>(&s.text().collect::<String>()).ok())
        .next()
    {
        fill_from_linked_data(&mut fields, &linked_data);
    }

    fields
}

/// Fill fields the microdata did not provide from a schema.org JSON-LD object
fn fill_from_linked_data(fields: &mut FieldMap, data: &Value) {
    if fields.get("genre").is_none() {
        match &data["genre"] {
            Value::String(genre) => fields.insert("genre", genre.as_str()),
            Value::Array(genres) => {
                if let Some(first) = genres.iter().find_map(Value::as_str) {
                    fields.insert("genre", first);
                }
            }
            _ => {}
        }
    }

    let rating = &data["aggregateRating"];
    if fields.get("imdb_rating").is_none()
        && let Some(value) = scalar_text(&rating["ratingValue"])
    {
        fields.insert("imdb_rating", value);
    }
    if fields.get("imdb_votes").is_none()
        && let Some(count) = scalar_text(&rating["ratingCount"])
    {
        fields.insert("imdb_votes", count);
    }

    if fields.get("director").is_none() {
        let directors: Vec<&str> = match &data["director"] {
            Value::Array(people) => people.iter().filter_map(|p| p["name"].as_str()).collect(),
            person => person["name"].as_str().into_iter().collect(),
        };
        if !directors.is_empty() {
            fields.insert("director", directors.join(", "));
        }
    }

    if fields.get("duration").is_none()
        && let Some(minutes) = data["duration"].as_str().and_then(iso_duration_minutes)
    {
        fields.insert("duration", format!("{} min", minutes));
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Minutes in an ISO-8601 duration such as `PT2H28M`
fn iso_duration_minutes(duration: &str) -> Option<u32> {
    let rest = duration.strip_prefix("PT")?;
    let mut minutes: u32 = 0;
    let mut number = String::new();

    for c in rest.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let value: u32 = number.parse().ok()?;
        number.clear();
        let added = match c {
            'H' => value.checked_mul(60)?,
            'M' => value,
            'S' => 0,
            _ => return None,
        };
        minutes = minutes.checked_add(added)?;
    }

    number.is_empty().then_some(minutes)
}
