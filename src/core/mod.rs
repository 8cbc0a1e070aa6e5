pub mod config;
pub mod page;

pub use config::{BrowserConfig, DomContract, ScraperConfig, Timeouts, Viewport};
pub use page::{ElementRect, PageDriver};
