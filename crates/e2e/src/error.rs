//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("{request}: HTTP {status}")]
    UnexpectedStatusCode { request: String, status: u16 },

    #[error("Network error on {request}: {source}")]
    Network {
        request: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("{flow} failed: {message}")]
    FlowFailure { flow: String, message: String },

    #[error("Missing expected element: {0}")]
    MissingExpectedElement(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Cookie jar cannot be sent as a header: {0}")]
    InvalidCookie(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Form encoding error: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
