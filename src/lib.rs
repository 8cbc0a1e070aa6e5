//! Human-like browser automation for extracting Kindle notebook highlights.
//!
//! The extraction pipeline talks to the page through the [`PageDriver`]
//! capability trait, so everything above the browser layer can be tested
//! against [`testing::FakeDriver`] without a Chrome process.

pub mod browser;
pub mod core;
pub mod errors;
pub mod humanize;
pub mod normalize;
pub mod scrape;
pub mod testing;
pub mod types;

pub use browser::ChromeDriver;
pub use core::{PageDriver, ScraperConfig};
pub use errors::{Result, ScrapeError};
pub use humanize::TimingPolicy;
pub use scrape::{scrape_notebook, ChallengeIndicator, ScrapeSession};
pub use types::{BookEntry, BookResult, ChallengeSignal, Credentials, HighlightItem, RunOutcome};
