use crate::errors::ScrapeError;
use serde::{Deserialize, Serialize};

/// Plaintext login pair. Decryption of transported credentials is the
/// caller's concern; by the time this crate sees them they are plaintext.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// One book tile in the notebook library listing. Page-local: the `id` is
/// only meaningful against the DOM of the currently loaded page, and the
/// entry is discarded once its highlights have been extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct BookEntry {
    pub id: String,
    pub title: String,
    /// Never empty; falls back to a single "Unknown Author" element.
    pub authors: Vec<String>,
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightItem {
    pub text: String,
    pub note: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "page")]
    pub location: Option<u32>,
}

/// Aggregated result for one processed book, in the wire shape consumed by
/// the HTTP layer. Highlight order is stable DOM encounter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookResult {
    #[serde(rename = "book_title")]
    pub title: String,
    #[serde(rename = "book_author")]
    pub authors: Vec<String>,
    #[serde(rename = "book_cover")]
    pub cover_url: Option<String>,
    pub date: Option<String>,
    pub highlights: Vec<HighlightItem>,
}

/// Terminal marker for a detected bot-verification UI. Carries a
/// description of the indicator that matched, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSignal {
    pub indicator: String,
}

impl std::fmt::Display for ChallengeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.indicator)
    }
}

/// Outcome of one full scraping run. Blocked and Failure are reported
/// distinctly so the caller can separate "try later" from "internal error".
#[derive(Debug)]
pub enum RunOutcome {
    Success(Vec<BookResult>),
    Blocked(ChallengeSignal),
    Failure(ScrapeError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    pub fn results(&self) -> Option<&[BookResult]> {
        match self {
            RunOutcome::Success(results) => Some(results),
            _ => None,
        }
    }
}
