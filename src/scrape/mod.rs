pub mod challenge;
pub mod highlights;
pub mod library;
pub mod session;

pub use challenge::{probe_challenge, ChallengeIndicator};
pub use session::{scrape_notebook, ScrapeSession};
