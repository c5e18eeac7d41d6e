//! Application configuration management

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::services::http::HttpConfig;
use crate::services::imdb::ImdbSearchMode;
use crate::services::logging::LogFormat;
use crate::services::text_utils::DEFAULT_EXTRA_LETTERS;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// OMDb API key, appended to every lookup when set
    pub omdb_api_key: Option<String>,

    pub omdb_base_url: String,
    pub filmaffinity_base_url: String,
    pub imdb_base_url: String,

    /// Torrent index root
    pub elitetorrent_base_url: String,

    /// Listing path under the index root
    pub elitetorrent_category: String,

    /// Per-request timeout for every external call
    pub http_timeout: Duration,

    pub http_user_agent: String,

    /// Records enriched concurrently
    pub enrich_workers: usize,

    /// Letters kept by subset title matching besides ASCII alphanumerics
    pub match_extra_letters: String,

    pub imdb_search_mode: ImdbSearchMode,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let http_timeout_secs: u64 = var("HTTP_TIMEOUT_SECS", "30")
            .parse()
            .context("Invalid HTTP_TIMEOUT_SECS")?;

        let enrich_workers: usize = var("ENRICH_WORKERS", "4")
            .parse()
            .context("Invalid ENRICH_WORKERS")?;

        Ok(Self {
            omdb_api_key: lookup("OMDB_API_KEY").filter(|k| !k.trim().is_empty()),

            omdb_base_url: var("OMDB_BASE_URL", "http://www.omdbapi.com"),
            filmaffinity_base_url: var("FILMAFFINITY_BASE_URL", "http://www.filmaffinity.com"),
            imdb_base_url: var("IMDB_BASE_URL", "http://www.imdb.com"),

            elitetorrent_base_url: var("ELITETORRENT_BASE_URL", "http://www.elitetorrent.net"),
            elitetorrent_category: var("ELITETORRENT_CATEGORY", "categoria/13/peliculas-hdrip"),

            http_timeout: Duration::from_secs(http_timeout_secs),

            http_user_agent: lookup("HTTP_USER_AGENT")
                .unwrap_or_else(|| HttpConfig::default().user_agent),

            enrich_workers: enrich_workers.max(1),

            match_extra_letters: var("MATCH_EXTRA_LETTERS", DEFAULT_EXTRA_LETTERS),

            imdb_search_mode: var("IMDB_SEARCH_MODE", "simple")
                .parse()
                .context("Invalid IMDB_SEARCH_MODE")?,

            log_format: var("LOG_FORMAT", "text")
                .parse()
                .context("Invalid LOG_FORMAT")?,
        })
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: self.http_timeout,
            user_agent: self.http_user_agent.clone(),
        }
    }
}
