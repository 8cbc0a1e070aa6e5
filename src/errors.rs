use crate::types::ChallengeSignal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out waiting for '{selector}' after {timeout_ms}ms")]
    Timeout { selector: String, timeout_ms: u64 },

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Invalid selector '{0}'")]
    SelectorParse(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Chrome error: {0}")]
    ChromeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A bot-verification UI matched one of the configured indicators.
    /// Surfaced to callers as `RunOutcome::Blocked`, never as a plain failure.
    #[error("Blocked by challenge indicator: {0}")]
    Blocked(ChallengeSignal),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

// Convert anyhow::Error to ScrapeError
impl From<anyhow::Error> for ScrapeError {
    fn from(err: anyhow::Error) -> Self {
        ScrapeError::AnyhowError(err.to_string())
    }
}

impl ScrapeError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, ScrapeError::Blocked(_))
    }
}
