use std::time::Duration;

use thiserror::Error;

pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Timed out after {after:?} fetching {url}")]
    Timeout { url: String, after: Duration },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Rejected candidate: {0}")]
    Validation(String),
}

impl ScrapeError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        ScrapeError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

