//! Movie record produced by the crawler and filled in by the enrichment sources.
//!
//! Numeric fields keep the raw text a source handed us. The typed accessors
//! parse on demand and fall back to zero when the text is missing or garbled.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Quality label used for torrents scraped from the index detail page
pub const DEFAULT_QUALITY: &str = "720p";

/// A single torrent offered for a movie
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentInfo {
    pub magnet: String,
    /// Human readable size, e.g. "812.24 MB"
    pub filesize: String,
    pub seeds: u16,
    pub peers: u16,
}

/// The unit of work and of output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub film_affinity_id: Option<String>,

    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Pipe-delimited, in scrape order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated: Option<String>,
    /// Raw running time, e.g. "148 min"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metascore: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_votes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub torrents: BTreeMap<String, TorrentInfo>,

    /// Whether the last direct API lookup changed anything. Never persisted.
    #[serde(skip)]
    pub updated: bool,
}

impl MovieRecord {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_url: Some(source_url.into()),
            ..Default::default()
        }
    }

    /// Title used to query the enrichment sources: the original title when known
    pub fn search_title(&self) -> &str {
        self.original_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.title)
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Insert a torrent, replacing any earlier entry for the same quality
    pub fn add_torrent(&mut self, quality: impl Into<String>, torrent: TorrentInfo) {
        self.torrents.insert(quality.into(), torrent);
    }

    /// Index rating, 0-10
    pub fn rating(&self) -> f32 {
        parse_decimal(self.rating.as_deref())
    }

    /// Metacritic score, 0-100
    pub fn metascore(&self) -> i32 {
        parse_or_zero(self.metascore.as_deref())
    }

    /// IMDb rating, 0-10
    pub fn imdb_rating(&self) -> f32 {
        parse_decimal(self.imdb_rating.as_deref())
    }

    /// IMDb vote count. The stored format only fits 0-255; anything else reads as 0.
    pub fn imdb_votes(&self) -> u8 {
        parse_or_zero(self.imdb_votes.as_deref())
    }

    pub fn file_size(&self) -> f32 {
        parse_decimal(self.file_size.as_deref())
    }

    /// Leading number of the running time ("148 min" -> 148)
    pub fn duration_minutes(&self) -> u32 {
        self.duration
            .as_deref()
            .and_then(|d| d.split_whitespace().next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

fn parse_or_zero<T: FromStr + Default>(raw: Option<&str>) -> T {
    raw.map(str::trim)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Accepts both "7.5" and the comma decimal FilmAffinity prints ("7,5")
fn parse_decimal(raw: Option<&str>) -> f32 {
    let Some(raw) = raw.map(str::trim) else {
        return 0.0;
    };
    if !raw.contains('.') && raw.matches(',').count() == 1 {
        return raw.replace(',', ".").parse().unwrap_or(0.0);
    }
    raw.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_accessors_parse_raw_text() {
        let movie = MovieRecord {
            title: "Inception".to_string(),
            rating: Some("7,9".to_string()),
            metascore: Some("74".to_string()),
            imdb_rating: Some("8.8".to_string()),
            imdb_votes: Some("200".to_string()),
            file_size: Some("812.24".to_string()),
            duration: Some("148 min".to_string()),
            ..Default::default()
        };

        assert!((movie.rating() - 7.9).abs() < 0.001);
        assert_eq!(movie.metascore(), 74);
        assert!((movie.imdb_rating() - 8.8).abs() < 0.001);
        assert_eq!(movie.imdb_votes(), 200);
        assert!((movie.file_size() - 812.24).abs() < 0.01);
        assert_eq!(movie.duration_minutes(), 148);
    }

    #[test]
    fn test_numeric_accessors_treat_garbage_as_zero() {
        let movie = MovieRecord {
            title: "Inception".to_string(),
            rating: Some("N/A".to_string()),
            metascore: Some("".to_string()),
            imdb_votes: Some("1,934,221".to_string()),
            ..Default::default()
        };

        assert_eq!(movie.rating(), 0.0);
        assert_eq!(movie.metascore(), 0);
        assert_eq!(movie.imdb_rating(), 0.0);
        assert_eq!(movie.imdb_votes(), 0);
        assert_eq!(movie.duration_minutes(), 0);
    }

    #[test]
    fn test_imdb_votes_out_of_range_reads_as_zero() {
        let movie = MovieRecord {
            imdb_votes: Some("256".to_string()),
            ..Default::default()
        };
        assert_eq!(movie.imdb_votes(), 0);
    }

    #[test]
    fn test_search_title_prefers_original_title() {
        let mut movie = MovieRecord::new("Origen", "/torrent/1");
        assert_eq!(movie.search_title(), "Origen");

        movie.original_title = Some("   ".to_string());
        assert_eq!(movie.search_title(), "Origen");

        movie.original_title = Some("Inception".to_string());
        assert_eq!(movie.search_title(), "Inception");
    }

    #[test]
    fn test_add_torrent_replaces_same_quality() {
        let mut movie = MovieRecord::new("Her", "/torrent/2");
        movie.add_torrent(
            DEFAULT_QUALITY,
            TorrentInfo {
                magnet: "magnet:?xt=old".to_string(),
                filesize: "700 MB".to_string(),
                seeds: 3,
                peers: 1,
            },
        );
        movie.add_torrent(
            DEFAULT_QUALITY,
            TorrentInfo {
                magnet: "magnet:?xt=new".to_string(),
                ..Default::default()
            },
        );

        assert_eq!(movie.torrents.len(), 1);
        let torrent = &movie.torrents[DEFAULT_QUALITY];
        assert_eq!(torrent.magnet, "magnet:?xt=new");
        assert_eq!(torrent.seeds, 0);
    }

    #[test]
    fn test_serialization_skips_absent_fields_and_updated_flag() {
        let mut movie = MovieRecord::new("Her", "/torrent/2");
        movie.imdb_id = Some("tt1798709".to_string());
        movie.updated = true;

        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json["title"], "Her");
        assert_eq!(json["imdbId"], "tt1798709");
        assert_eq!(json["sourceUrl"], "/torrent/2");
        assert!(json.get("updated").is_none());
        assert!(json.get("year").is_none());
        assert!(json.get("torrents").is_none());
    }
}
