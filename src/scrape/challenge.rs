//! Detection of bot-verification UIs after login submission.
//!
//! The indicator list is ordered runtime data, not code: the target site
//! rotates its verification widgets, and the list should evolve without
//! touching any extraction logic.

use crate::core::page::PageDriver;
use crate::errors::{Result, ScrapeError};
use crate::types::ChallengeSignal;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const TEXT_POLL_MS: u64 = 200;

/// One probe descriptor for a known challenge UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChallengeIndicator {
    /// Case-insensitive marker in the document text.
    Text(String),
    /// Substring of an iframe title attribute.
    IframeTitle(String),
    /// Plain CSS selector.
    Selector(String),
}

impl ChallengeIndicator {
    /// The indicator set observed in production for the notebook login flow.
    pub fn default_set() -> Vec<Self> {
        vec![
            ChallengeIndicator::Text("Solve this puzzle".to_string()),
            ChallengeIndicator::Text("Authentication required".to_string()),
            ChallengeIndicator::Text("puzzle".to_string()),
            ChallengeIndicator::IframeTitle("verification".to_string()),
            ChallengeIndicator::IframeTitle("puzzle".to_string()),
            ChallengeIndicator::Selector(".cvf-widget-container".to_string()),
            ChallengeIndicator::Selector("#cvf-aamation-challenge-iframe".to_string()),
        ]
    }

    pub fn describe(&self) -> String {
        match self {
            ChallengeIndicator::Text(marker) => format!("text marker '{marker}'"),
            ChallengeIndicator::IframeTitle(title) => format!("iframe title '{title}'"),
            ChallengeIndicator::Selector(selector) => format!("selector '{selector}'"),
        }
    }

    fn as_selector(&self) -> Option<String> {
        match self {
            ChallengeIndicator::Text(_) => None,
            ChallengeIndicator::IframeTitle(title) => {
                Some(format!(r#"iframe[title*="{title}"]"#))
            }
            ChallengeIndicator::Selector(selector) => Some(selector.clone()),
        }
    }
}

/// Probe the configured indicators in order, each bounded by
/// `probe_timeout_ms`. The first match wins and all remaining probes are
/// skipped; exhausting the list without a match means "not blocked".
pub async fn probe_challenge<D>(
    driver: &D,
    indicators: &[ChallengeIndicator],
    probe_timeout_ms: u64,
) -> Result<Option<ChallengeSignal>>
where
    D: PageDriver + ?Sized,
{
    for indicator in indicators {
        let matched = match indicator.as_selector() {
            Some(selector) => match driver.wait_for(&selector, probe_timeout_ms).await {
                Ok(()) => true,
                Err(ScrapeError::Timeout { .. }) => false,
                Err(other) => return Err(other),
            },
            None => {
                if let ChallengeIndicator::Text(marker) = indicator {
                    text_appears(driver, marker, probe_timeout_ms).await?
                } else {
                    false
                }
            }
        };

        if matched {
            let signal = ChallengeSignal {
                indicator: indicator.describe(),
            };
            warn!(indicator = %signal, "challenge UI detected, run is blocked");
            return Ok(Some(signal));
        }
        debug!(indicator = %indicator.describe(), "no match");
    }

    Ok(None)
}

/// Poll the document text for `marker` until it appears or the probe
/// timeout elapses.
async fn text_appears<D>(driver: &D, marker: &str, timeout_ms: u64) -> Result<bool>
where
    D: PageDriver + ?Sized,
{
    let needle = marker.to_lowercase();
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let html = driver.content().await?;
        if document_text(&html).to_lowercase().contains(&needle) {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(Duration::from_millis(TEXT_POLL_MS.min(timeout_ms))).await;
    }
}

fn document_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document.root_element().text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDriver;

    const PROBE_MS: u64 = 50;

    #[tokio::test]
    async fn no_indicators_match_means_not_blocked() {
        let driver = FakeDriver::new("<html><body><p>library</p></body></html>");
        let signal = probe_challenge(&driver, &ChallengeIndicator::default_set(), PROBE_MS)
            .await
            .unwrap();
        assert!(signal.is_none());
    }

    #[tokio::test]
    async fn text_marker_blocks() {
        let driver =
            FakeDriver::new("<html><body><h1>Solve this puzzle to continue</h1></body></html>");
        let signal = probe_challenge(&driver, &ChallengeIndicator::default_set(), PROBE_MS)
            .await
            .unwrap()
            .expect("blocked");
        assert_eq!(signal.indicator, "text marker 'Solve this puzzle'");
    }

    #[tokio::test]
    async fn selector_indicator_blocks() {
        let driver =
            FakeDriver::new("<html><body><div class='cvf-widget-container'></div></body></html>");
        let indicators = vec![ChallengeIndicator::Selector(
            ".cvf-widget-container".to_string(),
        )];
        let signal = probe_challenge(&driver, &indicators, PROBE_MS)
            .await
            .unwrap();
        assert!(signal.is_some());
    }

    #[tokio::test]
    async fn iframe_title_substring_blocks() {
        let driver = FakeDriver::new(
            r#"<html><body><iframe title="identity verification step"></iframe></body></html>"#,
        );
        let indicators = vec![ChallengeIndicator::IframeTitle("verification".to_string())];
        let signal = probe_challenge(&driver, &indicators, PROBE_MS)
            .await
            .unwrap();
        assert!(signal.is_some());
    }

    #[tokio::test]
    async fn first_match_wins() {
        let driver = FakeDriver::new(
            "<html><body><p>puzzle</p><div class='cvf-widget-container'></div></body></html>",
        );
        let indicators = vec![
            ChallengeIndicator::Text("puzzle".to_string()),
            ChallengeIndicator::Selector(".cvf-widget-container".to_string()),
        ];
        let signal = probe_challenge(&driver, &indicators, PROBE_MS)
            .await
            .unwrap()
            .expect("blocked");
        assert_eq!(signal.indicator, "text marker 'puzzle'");
    }

    #[tokio::test]
    async fn text_match_is_case_insensitive() {
        let driver = FakeDriver::new("<html><body><p>PUZZLE time</p></body></html>");
        let indicators = vec![ChallengeIndicator::Text("puzzle".to_string())];
        let signal = probe_challenge(&driver, &indicators, PROBE_MS)
            .await
            .unwrap();
        assert!(signal.is_some());
    }
}
