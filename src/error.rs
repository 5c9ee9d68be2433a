use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

/// Failure of the single GET a cycle performs against the source page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source responded with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("source returned an empty body")]
    EmptyBody,
}

/// Only raised for bodies that cannot be a document at all; HTML parsing
/// itself is lenient.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document body is empty")]
    Empty,

    #[error("document body is binary, found {0} NUL bytes")]
    Binary(usize),
}

/// Why a fetch-parse-assemble cycle did not publish a snapshot.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    /// Every strategy came back empty, or nothing survived assembly.
    /// Expected when no events are scheduled.
    #[error("no records extracted (strategy: {strategy}, candidates: {candidates}, skipped: {skipped})")]
    TotalExtraction {
        strategy: &'static str,
        candidates: usize,
        skipped: usize,
    },
}

impl CycleError {
    /// Short label used as the `outcome` field in logs and counters.
    pub fn outcome(&self) -> &'static str {
        match self {
            CycleError::Fetch(_) => "fetch_error",
            CycleError::Parse(_) => "parse_error",
            CycleError::TotalExtraction { .. } => "no_records",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
