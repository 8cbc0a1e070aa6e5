use crate::core::config::BrowserConfig;
use crate::core::page::{ElementRect, PageDriver};
use crate::errors::{Result, ScrapeError};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Keep the browser process alive through long human-paced waits and
/// manual-challenge resolution.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Chrome implementation of [`PageDriver`].
///
/// Navigation and element waits go through the native headless_chrome API;
/// reads, value clearing, scrolling and pointer synthesis are injected
/// JavaScript so they stay uniform with what the page itself would observe.
pub struct ChromeDriver {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeDriver {
    /// Launch a dedicated browser with one tab. Every scraping run gets its
    /// own instance; nothing is shared between runs.
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );

        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .idle_browser_timeout(IDLE_TIMEOUT)
            .args(args)
            .build()
            .map_err(|e| ScrapeError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| ScrapeError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::LaunchFailed(e.to_string()))?;

        debug!(headless = config.headless, "chrome launched");

        Ok(Self {
            browser: Some(browser),
            tab: Some(tab),
        })
    }

    fn tab(&self) -> Result<&Arc<Tab>> {
        self.tab
            .as_ref()
            .ok_or_else(|| ScrapeError::ChromeError("browser already closed".to_string()))
    }
}

/// Escape a string for embedding inside a single-quoted JS literal.
fn js_quote(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        let tab = self.tab()?;
        tab.navigate_to(url)
            .map_err(|e| ScrapeError::NavigationFailed(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| ScrapeError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        self.tab()?
            .wait_for_element_with_custom_timeout(selector, Duration::from_millis(timeout_ms))
            .map_err(|_| ScrapeError::Timeout {
                selector: selector.to_string(),
                timeout_ms,
            })?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.tab()?.find_element(selector).is_ok())
    }

    async fn content(&self) -> Result<String> {
        let value = self.evaluate("document.documentElement.outerHTML").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::EvaluationFailed("document markup unavailable".to_string()))
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let result = self
            .tab()?
            .evaluate(script, false)
            .map_err(|e| ScrapeError::EvaluationFailed(e.to_string()))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    async fn rect(&self, selector: &str) -> Result<Option<ElementRect>> {
        let script = format!(
            r#"
            (function() {{
                const el = document.querySelector('{}');
                if (!el) return "";
                const r = el.getBoundingClientRect();
                return JSON.stringify({{ x: r.x, y: r.y, width: r.width, height: r.height }});
            }})()
            "#,
            js_quote(selector)
        );

        let value = self.evaluate(&script).await?;
        match value.as_str() {
            Some(json) if !json.is_empty() => Ok(Some(serde_json::from_str(json)?)),
            _ => Ok(None),
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.tab()?
            .find_element(selector)
            .map_err(|e| ScrapeError::ElementNotFound(e.to_string()))?
            .click()
            .map_err(|e| ScrapeError::ChromeError(e.to_string()))?;
        Ok(())
    }

    async fn clear_value(&self, selector: &str) -> Result<()> {
        let script = format!(
            r#"
            (function() {{
                const el = document.querySelector('{}');
                if (!el) return false;
                el.focus();
                el.value = '';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            js_quote(selector)
        );

        let cleared = self.evaluate(&script).await?;
        if cleared.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(ScrapeError::ElementNotFound(selector.to_string()))
        }
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.tab()?
            .type_str(text)
            .map_err(|e| ScrapeError::ChromeError(e.to_string()))?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.tab()?
            .press_key(key)
            .map_err(|e| ScrapeError::ChromeError(e.to_string()))?;
        Ok(())
    }

    async fn move_mouse(&self, x: f64, y: f64) -> Result<()> {
        let script = format!(
            r#"
            (function() {{
                const target = document.elementFromPoint({x}, {y}) || document.body;
                const opts = {{ clientX: {x}, clientY: {y}, bubbles: true, cancelable: true, view: window }};
                target.dispatchEvent(new PointerEvent('pointermove', opts));
                target.dispatchEvent(new MouseEvent('mousemove', opts));
                return true;
            }})()
            "#,
        );
        self.evaluate(&script).await?;
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        let script = format!(
            r#"
            (function() {{
                const target = document.elementFromPoint({x}, {y}) || document.body;
                const opts = {{ clientX: {x}, clientY: {y}, button: 0, bubbles: true, cancelable: true, view: window }};
                target.dispatchEvent(new PointerEvent('pointerdown', opts));
                target.dispatchEvent(new MouseEvent('mousedown', opts));
                target.dispatchEvent(new PointerEvent('pointerup', opts));
                target.dispatchEvent(new MouseEvent('mouseup', opts));
                target.dispatchEvent(new MouseEvent('click', opts));
                return true;
            }})()
            "#,
        );
        self.evaluate(&script).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the handle tears down the Chrome process.
        self.tab = None;
        self.browser = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_quote_escapes_quotes_and_backslashes() {
        assert_eq!(js_quote("a'b"), "a\\'b");
        assert_eq!(js_quote(r"a\b"), r"a\\b");
        assert_eq!(js_quote(r#"input[name="email"]"#), r#"input[name="email"]"#);
    }
}
