//! Error types shared by the enrichment sources and the orchestrator

use thiserror::Error;

use super::sources::SourceId;

/// Failure to obtain a page or payload from an external source
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    #[error("Malformed payload: {0}")]
    Decode(String),
}

impl FetchError {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Decode(_) => "decode",
        }
    }

    /// Whether trying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => {
                *status == 429 || *status == 408 || (500..600).contains(status)
            }
            FetchError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Failure that ends the enrichment of one record
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("{source_id} lookup for '{title}' failed: {error}")]
    DirectApi {
        source_id: SourceId,
        title: String,
        #[source]
        error: FetchError,
    },
}

impl EnrichError {
    pub fn source_id(&self) -> SourceId {
        match self {
            EnrichError::DirectApi { source_id, .. } => *source_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EnrichError::DirectApi { error, .. } => error.kind(),
        }
    }
}
