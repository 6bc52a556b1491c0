use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failure of a single call to an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("completion failed: {0}")]
    Completion(String),

    #[error("URL blocked: {0}")]
    Blocked(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Research-level error taxonomy.
///
/// Only `InvalidInput` aborts a run; the other variants describe
/// degradations that are logged and absorbed by the stage they occur in.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("query decomposition degraded to the original query: {reason}")]
    DecompositionDegraded { reason: String },

    #[error("search for sub-query {sub_query:?} failed: {reason}")]
    SearchSubQueryFailed { sub_query: String, reason: String },

    #[error("fetch of {url} failed ({kind}): {message}")]
    FetchFailed {
        url: String,
        kind: FetchErrorKind,
        message: String,
    },
}

impl ResearchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResearchError::InvalidInput(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Timeout,
    Network,
    Status,
    Extraction,
    Blocked,
    Cancelled,
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::Network => "network",
            FetchErrorKind::Status => "status",
            FetchErrorKind::Extraction => "extraction",
            FetchErrorKind::Blocked => "blocked",
            FetchErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl From<&ServiceError> for FetchErrorKind {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::Timeout(_) => FetchErrorKind::Timeout,
            ServiceError::Http(e) if e.is_timeout() => FetchErrorKind::Timeout,
            ServiceError::Http(_) => FetchErrorKind::Network,
            ServiceError::Status(_) => FetchErrorKind::Status,
            ServiceError::Blocked(_) => FetchErrorKind::Blocked,
            ServiceError::Decode(_) | ServiceError::Completion(_) | ServiceError::Config(_) => {
                FetchErrorKind::Extraction
            }
        }
    }
}

pub type Result<T, E = ResearchError> = std::result::Result<T, E>;
