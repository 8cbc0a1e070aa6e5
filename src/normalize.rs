//! Text normalizers for scraped author, date and header strings.
//!
//! These are pure functions: every malformed input degrades to a placeholder
//! or an absent field, never to an error.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

const AUTHOR_PREFIX: &str = "By: ";
const UNKNOWN_AUTHOR: &str = "Unknown Author";
const TYPE_SUFFIX: &str = " highlight";
const LOCATION_PREFIX: &str = "Location:";

static AUTHOR_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|\band\b").expect("author split regex"));

/// Split a raw author string into individual names.
///
/// Strips a leading `"By: "` marker, splits case-insensitively on commas or
/// the word "and", and trims each piece. Never returns an empty list.
pub fn parse_authors(raw: &str) -> Vec<String> {
    let raw = raw.strip_prefix(AUTHOR_PREFIX).unwrap_or(raw);

    let authors: Vec<String> = AUTHOR_SPLIT
        .split(raw)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect();

    if authors.is_empty() {
        vec![UNKNOWN_AUTHOR.to_string()]
    } else {
        authors
    }
}

/// Normalize an annotated-date string to `mm-dd-yyyy`.
///
/// Accepts `"Sunday August 17, 2025"` (weekday discarded) as well as
/// `"August 17, 2025"`. Anything unparsable yields `None`.
pub fn parse_annotated_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // Try with the leading segment (the weekday) dropped first, then the
    // whole string, so both observed formats parse.
    let candidates = match raw.split_once(char::is_whitespace) {
        Some((_, rest)) => [Some(rest.trim()), Some(raw)],
        None => [Some(raw), None],
    };

    for candidate in candidates.into_iter().flatten() {
        if let Ok(date) = NaiveDate::parse_from_str(candidate, "%B %d, %Y") {
            return Some(date.format("%m-%d-%Y").to_string());
        }
    }

    warn!("could not parse annotated date: {raw:?}");
    None
}

/// Parse a highlight header of the form `"<Type> | Location:<n>"`, either
/// half optional. A trailing literal `" highlight"` on the type is stripped;
/// an unparsable location is simply absent.
pub fn parse_highlight_header(raw: &str) -> (Option<String>, Option<u32>) {
    let mut kind = None;
    let mut location = None;

    for piece in raw.split('|') {
        let piece = piece.trim();
        if let Some(rest) = piece.strip_prefix(LOCATION_PREFIX) {
            location = rest.trim().parse().ok();
        } else if kind.is_none() && !piece.is_empty() {
            let name = piece.strip_suffix(TYPE_SUFFIX).unwrap_or(piece).trim();
            if !name.is_empty() {
                kind = Some(name.to_string());
            }
        }
    }

    (kind, location)
}
