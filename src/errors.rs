use thiserror::Error;

use crate::llm::CompletionError;

#[derive(Error, Debug)]
pub enum BarcraftError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Venue concept already set for session {0}")]
    AlreadySet(String),

    #[error("Knowledge index unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Completion failed: {0}")]
    CompletionFailure(#[from] CompletionError),

    #[error("Export failed: {0}")]
    ExportFailure(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BarcraftError {
    /// Whether the failure leaves the session usable for another attempt
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::AlreadySet(_)
                | Self::Retrieval(_)
                | Self::CompletionFailure(_)
                | Self::ExportFailure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BarcraftError>;
