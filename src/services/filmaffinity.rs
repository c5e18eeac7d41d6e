//! FilmAffinity catalog scraper
//!
//! FilmAffinity has no API. A title search either lands on a result listing
//! or, when the title is unambiguous, directly on the movie page. Movie pages
//! describe the film as a `dl.movie-info` list of label/value pairs in Spanish.
//!
//! Base URL: http://www.filmaffinity.com

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::error::FetchError;
use super::http::HttpClient;
use super::sources::{CatalogSource, Locator, SourceId};
use super::text_utils::clean_text;
use super::title_matcher::Candidate;
use crate::models::FieldMap;

static OG_TITLE: Lazy<Selector> = Lazy::new(|| css("[property='og:title']"));
static RESULT_LINKS: Lazy<Selector> = Lazy::new(|| css(".item-search .mc-title a"));
static MOVIE_INFO: Lazy<Selector> = Lazy::new(|| css("dl.movie-info"));
static LINKS: Lazy<Selector> = Lazy::new(|| css("a"));
static LINK_WITH_HREF: Lazy<Selector> = Lazy::new(|| css("a[href]"));
static RATE_BOX: Lazy<Selector> = Lazy::new(|| css("div.rate-movie-box"));
static RATING: Lazy<Selector> = Lazy::new(|| css("#movie-rat-avg"));

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

/// FilmAffinity scraper
pub struct FilmAffinityClient {
    http: Arc<HttpClient>,
    base_url: String,
}

impl FilmAffinityClient {
    pub fn new(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Search URL for a title; words are joined with `+` as the site expects
    pub fn search_url(&self, title: &str) -> String {
        let words: Vec<String> = title
            .split_whitespace()
            .map(|w| urlencoding::encode(w).into_owned())
            .collect();
        format!(
            "{}/es/search.php?stext={}&stype=title",
            self.base_url.trim_end_matches('/'),
            words.join("+")
        )
    }
}

#[async_trait]
impl CatalogSource for FilmAffinityClient {
    fn id(&self) -> SourceId {
        SourceId::FilmAffinity
    }

    async fn search_candidates(&self, query: &str) -> Result<Vec<Candidate<Locator>>, FetchError> {
        let url = self.search_url(query);
        info!(query = %query, url = %url, "Searching FilmAffinity");

        let page = self.http.get_page(&url).await?;
        let candidates = parse_search_page(&page.body, &page.url);

        debug!(count = candidates.len(), "FilmAffinity search returned candidates");
        Ok(candidates)
    }

    async fn fetch_detail_fields(&self, locator: &Locator) -> Result<FieldMap, FetchError> {
        info!(url = %locator, "Fetching FilmAffinity movie page");
        let page = self.http.get_page(locator.as_str()).await?;
        debug!(url = %page.url, "FilmAffinity movie page served");

        Ok(parse_movie_page(&page.body))
    }
}

/// Candidates from a search response served at `page_url`.
///
/// A search that resolved straight to a movie page yields that page under its
/// display title and, when it differs, under its original title.
pub fn parse_search_page(body: &str, page_url: &str) -> Vec<Candidate<Locator>> {
    let document = Html::parse_document(body);

    if let Some(og_title) = document.select(&OG_TITLE).next() {
        let title = clean_text(og_title.value().attr("content").unwrap_or_default());
        let original = movie_fields(&document)
            .get("original_title")
            .map(str::to_string)
            .filter(|original| !original.is_empty() && *original != title);

        let mut candidates = vec![Candidate::new(title, Locator::new(page_url))];
        if let Some(original) = original {
            candidates.push(Candidate::new(original, Locator::new(page_url)));
        }
        return candidates;
    }

    let base = Url::parse(page_url).ok();
    document
        .select(&RESULT_LINKS)
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            let locator = match &base {
                Some(base) => base.join(href).ok()?.to_string(),
                None => href.to_string(),
            };
            Some(Candidate::new(
                clean_text(&link.text().collect::<String>()),
                Locator::new(locator),
            ))
        })
        .collect()
}

/// Canonical field for a `dl.movie-info` label
fn field_for_label(label: &str) -> Option<&'static str> {
    match label.trim_end_matches(':') {
        "Título original" => Some("original_title"),
        "Año" => Some("year"),
        "Duración" => Some("duration"),
        "País" => Some("country"),
        "Director" | "Dirección" => Some("director"),
        "Guion" | "Guión" => Some("writer"),
        "Reparto" => Some("actors"),
        "Género" => Some("genre"),
        "Sinopsis" => Some("plot"),
        "Web oficial" => Some("web_url"),
        _ => None,
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Text directly inside `element`, skipping nested markup such as "aka" buttons
fn own_text(element: &ElementRef<'_>) -> String {
    let text: String = element
        .children()
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect();
    clean_text(&text)
}

/// Labels older layouts use for the original title row
fn is_title_label(label: &str) -> bool {
    let label = label.trim_end_matches(':').to_lowercase();
    label.starts_with("título") || label.starts_with("titulo") || label.starts_with("title")
}

/// Fields scraped from a movie page
pub fn parse_movie_page(body: &str) -> FieldMap {
    movie_fields(&Html::parse_document(body))
}

fn movie_fields(document: &Html) -> FieldMap {
    let mut fields = FieldMap::new();

    if let Some(info) = document.select(&MOVIE_INFO).next() {
        let mut label: Option<String> = None;
        let mut first_value: Option<String> = None;
        let mut seen_value = false;

        for child in info.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "dt" => label = Some(element_text(&child)),
                "dd" => {
                    let value_text = element_text(&child);
                    // Only a leading row that is unlabelled or labelled as a title
                    if !seen_value {
                        seen_value = true;
                        if label.as_deref().is_none_or(is_title_label) {
                            first_value = Some(own_text(&child));
                        }
                    }

                    let Some(name) = label.take().as_deref().and_then(field_for_label) else {
                        continue;
                    };

                    match name {
                        "genre" => {
                            for link in child.select(&LINKS) {
                                fields.insert(name, element_text(&link));
                            }
                        }
                        "web_url" => {
                            if let Some(href) = child
                                .select(&LINK_WITH_HREF)
                                .next()
                                .and_then(|a| a.value().attr("href"))
                            {
                                fields.insert(name, href);
                            }
                        }
                        "original_title" => fields.insert(name, own_text(&child)),
                        _ => fields.insert(name, value_text),
                    }
                }
                _ => {}
            }
        }

        // Older layouts lead with the original title under a loose label or none
        if fields.get("original_title").is_none()
            && let Some(value) = first_value.filter(|v| !v.is_empty())
        {
            fields.insert("original_title", value);
        }
    }

    if let Some(id) = document
        .select(&RATE_BOX)
        .next()
        .and_then(|b| b.value().attr("data-movie-id"))
    {
        fields.insert("film_affinity_id", id);
    }

    if let Some(rating) = document.select(&RATING).next() {
        fields.insert("rating", element_text(&rating));
    }

    fields
}
