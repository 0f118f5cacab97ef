//! Error types of the collaborator contracts
//!
//! `FetchError` covers the network side of a page fetch, `StoreError` the
//! persistence side. Both are cloneable so they can travel through channels
//! inside worker outcomes.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP request failed: {status} - {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Request cancelled: {url}")]
    Cancelled { url: String },
}

impl FetchError {
    /// Transient failures worth another attempt
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Body { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidUrl { .. } | Self::Cancelled { .. } => false,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("player_stats {player_stats_id} does not exist")]
    MissingParent { player_stats_id: i64 },

    #[error("match {match_id} does not exist")]
    MissingMatch { match_id: String },

    #[error("match {match_id} is already marked as crawled")]
    AlreadyCrawled { match_id: String },

    #[error("Duplicate key: {0}")]
    Duplicate(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Duplicate(db.message().to_string())
            }
            _ => Self::Database(error.to_string()),
        }
    }
}
