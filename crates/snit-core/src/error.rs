//! Error types for SniT.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A collaborator (embedder, vector index, LLM) is not configured or not connected.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The backend has no record with the requested id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Model output that should have been structured data was not.
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

impl Error {
    /// Whether the failure means "nothing to talk to" rather than a bad answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
