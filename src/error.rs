use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Invalid period: {0}")]
    PeriodParse(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid client name: {0}")]
    InvalidClient(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid credentials for {0}")]
    Unauthorized(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Report generation failed: {0}")]
    GenerationFailed(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True when the database or the LLM service could not be reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::DatabaseUnavailable(_) | Error::LlmUnavailable(_))
    }

    /// Text shown to the operator when a report request aborts.
    pub fn user_message(&self) -> String {
        match self {
            Error::DatabaseUnavailable(_) => {
                "Database connection unavailable. Please contact IT support.".to_string()
            }
            Error::LlmUnavailable(_) => {
                "AI service unavailable. Please contact IT support.".to_string()
            }
            Error::GenerationFailed(_) => {
                "Report generation failed. Please try again or contact support.".to_string()
            }
            Error::Unauthorized(_) => "Invalid credentials. Please try again.".to_string(),
            Error::InvalidClient(_) => "Please enter a client name.".to_string(),
            other => format!("Analysis failed: {other}"),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(e: rusqlite_migration::Error) -> Self {
        Error::Migration(e.to_string())
    }
}

impl<E: fmt::Display> From<tokio_rusqlite::Error<E>> for Error {
    fn from(e: tokio_rusqlite::Error<E>) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Error::LlmUnavailable(e.to_string())
        } else {
            Error::Llm(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
