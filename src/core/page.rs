use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Capability interface over one live page.
///
/// Everything the extraction pipeline needs from a browser goes through this
/// trait, so the pipeline can be exercised against `testing::FakeDriver`
/// without a Chrome process. `browser::ChromeDriver` is the real
/// implementation.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the navigation to settle.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Block until `selector` appears, bounded by `timeout_ms`.
    /// Returns `ScrapeError::Timeout` if it never shows up.
    async fn wait_for(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Non-waiting presence probe.
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Snapshot of the current document markup.
    async fn content(&self) -> Result<String>;

    /// Evaluate a JavaScript expression in the page.
    async fn evaluate(&self, script: &str) -> Result<Value>;

    /// Bounding box of the first element matching `selector`, if any.
    async fn rect(&self, selector: &str) -> Result<Option<ElementRect>>;

    /// Plain element click (also used to focus inputs before typing).
    async fn click(&self, selector: &str) -> Result<()>;

    /// Clear the current value of an input element.
    async fn clear_value(&self, selector: &str) -> Result<()>;

    /// Type into whichever element currently holds focus.
    async fn type_text(&self, text: &str) -> Result<()>;

    /// Press a named key (e.g. "Backspace") on the focused element.
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Move the virtual pointer to viewport coordinates.
    async fn move_mouse(&self, x: f64, y: f64) -> Result<()>;

    /// Click at viewport coordinates.
    async fn click_at(&self, x: f64, y: f64) -> Result<()>;

    /// Release the underlying browser resources.
    async fn close(&mut self) -> Result<()>;
}
