// src/utils/error.rs
use thiserror::Error;

// One error type per pipeline concern; AppError sits on top for main.
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 500 Internal Server Error

    #[error("SEC Rate limit likely exceeded")]
    RateLimited, // 403 / 429 from EDGAR

    #[error("Could not find CIK for ticker {0}")]
    TickerNotFound(String),

    #[error("Could not find specified filing: {0}")]
    FilingDocNotFound(String),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),
}

impl EdgarError {
    /// Whether another attempt at the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EdgarError::Network(_) | EdgarError::RateLimited => true,
            EdgarError::Http(status) => status.is_server_error(),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Section found by {strategy} but only {chars} chars long (minimum {min})")]
    SectionTooSmall {
        strategy: String,
        chars: usize,
        min: usize,
    },

    #[error("No risk factors survived segmentation ({0} words of cleaned text)")]
    NoRiskFactors(usize),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Summarization service not configured: {0}")]
    NotConfigured(String),

    #[error("Summarization request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Summarization service returned {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Summarization service returned an empty response")]
    EmptyResponse,

    #[error("Malformed summarization response: {0}")]
    MalformedResponse(String),
}

impl SummaryError {
    pub fn is_transient(&self) -> bool {
        match self {
            SummaryError::Network(_) => true,
            SummaryError::Http { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Summarization failed: {0}")]
    Summary(#[from] SummaryError),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EdgarError::RateLimited.is_transient());
        assert!(EdgarError::Http(reqwest::StatusCode::BAD_GATEWAY).is_transient());
        assert!(!EdgarError::Http(reqwest::StatusCode::NOT_FOUND).is_transient());
        assert!(!EdgarError::TickerNotFound("ZZZZ".into()).is_transient());

        let throttled = SummaryError::Http {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        assert!(throttled.is_transient());
        assert!(!SummaryError::MalformedResponse("missing key".into()).is_transient());
    }
}
