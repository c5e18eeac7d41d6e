//! OMDb API client
//!
//! OMDb answers `?t=<title>&type=movie` with a flat JSON object whose keys
//! map almost one to one onto the record. Base URL: http://www.omdbapi.com
//!
//! Values that do not have the expected shape (arrays, nested objects) are
//! skipped individually; only a body that is not a JSON object at all fails
//! the lookup.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::error::FetchError;
use super::http::HttpClient;
use super::sources::{DirectMetadataSource, SourceId};
use crate::models::FieldMap;

/// OMDb key -> canonical field name
const FIELD_NAMES: &[(&str, &str)] = &[
    ("Title", "title"),
    ("Year", "year"),
    ("Rated", "rated"),
    ("Released", "released"),
    ("Runtime", "duration"),
    ("Genre", "genre"),
    ("Director", "director"),
    ("Writer", "writer"),
    ("Actors", "actors"),
    ("Plot", "plot"),
    ("Country", "country"),
    ("Poster", "image_url"),
    ("Metascore", "metascore"),
    ("imdbRating", "imdb_rating"),
    ("imdbVotes", "imdb_votes"),
    ("imdbID", "imdb_id"),
    ("Website", "web_url"),
];

/// Placeholder OMDb uses for unknown values
const NOT_AVAILABLE: &str = "N/A";

/// OMDb API client
pub struct OmdbClient {
    http: Arc<HttpClient>,
    base_url: String,
    api_key: Option<String>,
}

impl OmdbClient {
    pub fn new(http: Arc<HttpClient>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn query_params(&self, title: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![("t", title.to_string()), ("type", "movie".to_string())];
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            params.push(("apikey", key.clone()));
        }
        params
    }
}

#[async_trait]
impl DirectMetadataSource for OmdbClient {
    fn id(&self) -> SourceId {
        SourceId::Omdb
    }

    async fn fetch_direct_metadata(&self, title: &str) -> Result<FieldMap, FetchError> {
        info!(title = %title, "Looking up movie on OMDb");

        let url = format!("{}/", self.base_url.trim_end_matches('/'));
        let payload: Value = self
            .http
            .get_json_with_query(&url, &self.query_params(title))
            .await?;

        parse_omdb_payload(payload)
    }
}

/// Turn an OMDb response into canonical fields
pub fn parse_omdb_payload(payload: Value) -> Result<FieldMap, FetchError> {
    let Value::Object(object) = payload else {
        return Err(FetchError::Decode("OMDb response is not a JSON object".to_string()));
    };

    if is_negative_response(&object) {
        let reason = object.get("Error").and_then(Value::as_str).unwrap_or_default();
        debug!(error = %reason, "OMDb has no entry for this title");
        return Ok(FieldMap::new());
    }

    let mut fields = FieldMap::new();
    for (key, value) in &object {
        let Some(&(_, name)) = FIELD_NAMES.iter().find(|(k, _)| *k == key.as_str()) else {
            continue;
        };

        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => continue,
            other => {
                debug!(field = %key, shape = %shape(other), "Skipping OMDb field with unexpected shape");
                continue;
            }
        };

        if text.is_empty() || text == NOT_AVAILABLE {
            continue;
        }

        if name == "genre" {
            for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                fields.insert(name, token);
            }
        } else {
            fields.insert(name, text);
        }
    }

    Ok(fields)
}

fn is_negative_response(object: &Map<String, Value>) -> bool {
    object
        .get("Response")
        .and_then(Value::as_str)
        .is_some_and(|r| r.eq_ignore_ascii_case("false"))
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        _ => "scalar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_parse_maps_keys_and_splits_genre() {
        let payload = json!({
            "Title": "Inception ",
            "Year": "2010",
            "Genre": "Action, Adventure, Sci-Fi",
            "imdbRating": "8.8",
            "imdbID": "tt1375666",
            "Metascore": "N/A",
            "Ratings": [{"Source": "Internet Movie Database", "Value": "8.8/10"}],
            "Response": "True"
        });

        let fields = parse_omdb_payload(payload).unwrap();

        assert_eq!(fields.get("title"), Some("Inception"));
        assert_eq!(fields.get("year"), Some("2010"));
        assert_eq!(fields.get("imdb_rating"), Some("8.8"));
        assert_eq!(fields.get("imdb_id"), Some("tt1375666"));
        assert_eq!(
            fields.get_all("genre").collect::<Vec<_>>(),
            vec!["Action", "Adventure", "Sci-Fi"]
        );
        assert_eq!(fields.get("metascore"), None);
        assert_eq!(fields.get("Ratings"), None);
    }

    #[test]
    fn test_parse_stringifies_numbers() {
        let fields = parse_omdb_payload(json!({"Year": 2010, "Title": "Inception"})).unwrap();
        assert_eq!(fields.get("year"), Some("2010"));
    }

    #[test]
    fn test_negative_response_is_empty_success() {
        let fields =
            parse_omdb_payload(json!({"Response": "False", "Error": "Movie not found!"})).unwrap();
        assert!(fields.is_empty());

        let fields = parse_omdb_payload(json!({"Response": "False"})).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_non_object_payload_is_decode_error() {
        assert_matches!(parse_omdb_payload(json!(["Inception"])), Err(FetchError::Decode(_)));
    }

    #[test]
    fn test_query_params_include_api_key_when_configured() {
        let http = Arc::new(HttpClient::new("omdb", &Default::default()).unwrap());

        let client = OmdbClient::new(http.clone(), "http://www.omdbapi.com", None);
        let params = client.query_params("Her");
        assert_eq!(params.len(), 2);

        let client = OmdbClient::new(http, "http://www.omdbapi.com", Some("secret".to_string()));
        let params = client.query_params("Her");
        assert!(params.contains(&("apikey", "secret".to_string())));
    }
}
