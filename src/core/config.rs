use crate::humanize::TimingPolicy;
use crate::scrape::challenge::ChallengeIndicator;
use serde::{Deserialize, Serialize};

pub const NOTEBOOK_URL: &str = "https://read.amazon.com/notebook";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Target annotations page. Overridable mainly for testing.
    pub notebook_url: String,
    pub browser: BrowserConfig,
    pub dom: DomContract,
    pub timeouts: Timeouts,
    /// Ordered probe list; the first match blocks the run.
    pub challenge_indicators: Vec<ChallengeIndicator>,
    pub timing: TimingPolicy,
    /// Skip challenge probing and extend the library wait so a human can
    /// resolve any verification UI out of band.
    pub manual_challenge: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            notebook_url: NOTEBOOK_URL.to_string(),
            browser: BrowserConfig::default(),
            dom: DomContract::default(),
            timeouts: Timeouts::default(),
            challenge_indicators: ChallengeIndicator::default_set(),
            timing: TimingPolicy::default(),
            manual_challenge: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            user_agent: None,
            args: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timeouts {
    /// Login form fields (email, then password) after navigation.
    pub login_ms: u64,
    /// Per-indicator challenge probe.
    pub challenge_probe_ms: u64,
    /// Library container readiness after login.
    pub library_ms: u64,
    /// Library readiness when a human is solving the challenge manually.
    pub library_manual_ms: u64,
    /// Per-book highlight panel readiness.
    pub highlights_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            login_ms: 10_000,
            challenge_probe_ms: 1_000,
            library_ms: 30_000,
            library_manual_ms: 180_000,
            highlights_ms: 10_000,
        }
    }
}

/// Selector contract with the notebook page. The markup is owned by the
/// target site and changes without notice, so the whole contract is plain
/// runtime data rather than constants baked into the extraction logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomContract {
    pub email_input: String,
    pub continue_button: String,
    pub password_input: String,
    pub signin_button: String,

    pub library_entry: String,
    pub entry_title: String,
    pub entry_author: String,
    pub entry_cover: String,
    /// Per-entry "fetch annotations" control, scoped under the entry id.
    pub entry_action: String,
    pub library_scroller: String,
    /// Fixed margin subtracted when scrolling an entry into view.
    pub scroll_margin: f64,

    /// Readiness marker for the rendered highlight panel.
    pub highlight_ready: String,
    pub highlight_container: String,
    pub highlight_header: String,
    pub highlight_text: String,
    pub highlight_note: String,
    pub annotated_date: String,
}

impl Default for DomContract {
    fn default() -> Self {
        Self {
            email_input: r#"input[name="email"]"#.to_string(),
            continue_button: "input#continue".to_string(),
            password_input: r#"input[name="password"]"#.to_string(),
            signin_button: "input#signInSubmit".to_string(),

            library_entry: ".kp-notebook-library-each-book".to_string(),
            entry_title: "h2.kp-notebook-searchable".to_string(),
            entry_author: "p.a-spacing-base.a-color-secondary".to_string(),
            entry_cover: "img.kp-notebook-cover-image".to_string(),
            entry_action: r#"span[data-action="get-annotations-for-asin"]"#.to_string(),
            library_scroller: ".a-scroller.kp-notebook-scroller-addon.a-scroller-vertical"
                .to_string(),
            scroll_margin: 50.0,

            highlight_ready: ".kp-notebook-highlight".to_string(),
            highlight_container: ".a-row.a-spacing-base".to_string(),
            highlight_header: "span#annotationHighlightHeader".to_string(),
            highlight_text: "span#highlight".to_string(),
            highlight_note: "span#note".to_string(),
            annotated_date: "span#kp-notebook-annotated-date".to_string(),
        }
    }
}
