//! Per-book highlight extraction: scroll, open the annotation panel, parse.

use super::library::{css, node_text};
use crate::core::config::{DomContract, ScraperConfig};
use crate::core::page::PageDriver;
use crate::errors::{Result, ScrapeError};
use crate::humanize::human_click;
use crate::normalize::{parse_annotated_date, parse_highlight_header};
use crate::types::{BookEntry, BookResult, HighlightItem};
use scraper::Html;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Offset that scrolls an entry to the top of its scroller, minus a fixed
/// margin, never negative.
pub fn scroll_offset(entry_top: f64, scroller_top: f64, current_offset: f64, margin: f64) -> f64 {
    (entry_top - scroller_top + current_offset - margin).max(0.0)
}

#[derive(Debug, Deserialize)]
struct ScrollerMetrics {
    top: f64,
    scroll_top: f64,
}

/// Extract one book's highlights.
///
/// `Ok(None)` is the non-fatal skip signal: the entry had no usable click
/// target and the run should simply continue with the next one. Only
/// driver-level faults escalate.
pub async fn extract_book<D>(
    driver: &D,
    entry: &BookEntry,
    config: &ScraperConfig,
) -> Result<Option<BookResult>>
where
    D: PageDriver + ?Sized,
{
    let dom = &config.dom;
    let timing = &config.timing;
    let entry_selector = format!("#{}", entry.id);

    scroll_into_view(driver, &entry_selector, dom).await?;
    timing.pause(timing.post_scroll_ms).await;

    // Prefer the dedicated annotations control, fall back to the entry
    // container itself.
    let action_selector = format!("{} {}", entry_selector, dom.entry_action);
    let target = if driver.exists(&action_selector).await? {
        action_selector
    } else if driver.exists(&entry_selector).await? {
        entry_selector.clone()
    } else {
        warn!(book = %entry.title, "no clickable target, skipping entry");
        return Ok(None);
    };

    timing.pause(timing.pre_entry_click_ms).await;
    human_click(driver, &target, timing).await?;

    match driver
        .wait_for(&dom.highlight_ready, config.timeouts.highlights_ms)
        .await
    {
        Ok(()) => {}
        // A book can legitimately render an empty panel.
        Err(ScrapeError::Timeout { .. }) => {
            debug!(book = %entry.title, "no highlights rendered before timeout")
        }
        Err(other) => return Err(other),
    }
    timing.pause(timing.post_load_ms).await;

    let html = driver.content().await?;
    let (date, highlights) = parse_highlight_panel(&html, dom)?;
    info!(
        book = %entry.title,
        highlights = highlights.len(),
        "book processed"
    );

    Ok(Some(BookResult {
        title: entry.title.clone(),
        authors: entry.authors.clone(),
        cover_url: entry.cover_url.clone(),
        date,
        highlights,
    }))
}

/// Parse the rendered annotation panel: one shared date for the book plus
/// every highlight container in DOM order. A container without body text is
/// skipped; malformed headers and notes degrade to absent fields.
pub fn parse_highlight_panel(
    html: &str,
    dom: &DomContract,
) -> Result<(Option<String>, Vec<HighlightItem>)> {
    let date_sel = css(&dom.annotated_date)?;
    let container_sel = css(&dom.highlight_container)?;
    let header_sel = css(&dom.highlight_header)?;
    let text_sel = css(&dom.highlight_text)?;
    let note_sel = css(&dom.highlight_note)?;

    let document = Html::parse_document(html);

    let date = document
        .select(&date_sel)
        .next()
        .map(node_text)
        .and_then(|raw| parse_annotated_date(&raw));

    let mut highlights = Vec::new();
    for container in document.select(&container_sel) {
        let text = match container.select(&text_sel).next().map(node_text) {
            Some(text) if !text.is_empty() => text,
            _ => continue,
        };

        let (kind, location) = container
            .select(&header_sel)
            .next()
            .map(|header| parse_highlight_header(&node_text(header)))
            .unwrap_or((None, None));

        let note = container
            .select(&note_sel)
            .next()
            .map(node_text)
            .filter(|note| !note.is_empty());

        highlights.push(HighlightItem {
            text,
            note,
            kind,
            location,
        });
    }

    Ok((date, highlights))
}

/// Scroll the entry into view by setting the scroller offset directly.
/// Missing geometry is non-fatal: the click still targets the element.
async fn scroll_into_view<D>(driver: &D, entry_selector: &str, dom: &DomContract) -> Result<()>
where
    D: PageDriver + ?Sized,
{
    let Some(entry_rect) = driver.rect(entry_selector).await? else {
        debug!(entry_selector, "entry has no bounding box, skipping scroll");
        return Ok(());
    };

    let metrics_script = format!(
        r#"
        (function() {{
            const scroller = document.querySelector('{}');
            if (!scroller) return "";
            const r = scroller.getBoundingClientRect();
            return JSON.stringify({{ top: r.top, scroll_top: scroller.scrollTop }});
        }})()
        "#,
        js_quote(&dom.library_scroller)
    );
    let value = driver.evaluate(&metrics_script).await?;
    let Some(metrics) = value
        .as_str()
        .filter(|json| !json.is_empty())
        .and_then(|json| serde_json::from_str::<ScrollerMetrics>(json).ok())
    else {
        debug!("library scroller metrics unavailable, skipping scroll");
        return Ok(());
    };

    let offset = scroll_offset(
        entry_rect.y,
        metrics.top,
        metrics.scroll_top,
        dom.scroll_margin,
    );
    let scroll_script = format!(
        r#"
        (function() {{
            const scroller = document.querySelector('{}');
            if (scroller) scroller.scrollTop = {offset};
        }})()
        "#,
        js_quote(&dom.library_scroller)
    );
    driver.evaluate(&scroll_script).await?;
    Ok(())
}

fn js_quote(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::TimingPolicy;
    use crate::testing::FakeDriver;

    #[test]
    fn offset_is_clamped_at_zero() {
        assert_eq!(scroll_offset(10.0, 100.0, 0.0, 50.0), 0.0);
        assert_eq!(scroll_offset(0.0, 0.0, 0.0, 50.0), 0.0);
        assert_eq!(scroll_offset(500.0, 100.0, 200.0, 50.0), 550.0);
    }

    const PANEL: &str = r#"
        <html><body>
        <span id="kp-notebook-annotated-date">Sunday August 17, 2025</span>
        <div class="a-row a-spacing-base">
            <span id="annotationHighlightHeader">Yellow highlight | Location:42</span>
            <div class="kp-notebook-highlight"><span id="highlight">First passage</span></div>
            <span id="note">  </span>
        </div>
        <div class="a-row a-spacing-base">
            <span id="annotationHighlightHeader">Location:abc</span>
            <div class="kp-notebook-highlight"><span id="highlight">Second passage</span></div>
            <span id="note">margin note</span>
        </div>
        <div class="a-row a-spacing-base">
            <span id="annotationHighlightHeader">Blue highlight</span>
            <span id="note">orphaned note without body</span>
        </div>
        </body></html>
    "#;

    #[test]
    fn parses_panel_in_dom_order() {
        let (date, highlights) = parse_highlight_panel(PANEL, &DomContract::default()).unwrap();

        assert_eq!(date.as_deref(), Some("08-17-2025"));
        assert_eq!(highlights.len(), 2);

        assert_eq!(highlights[0].text, "First passage");
        assert_eq!(highlights[0].kind.as_deref(), Some("Yellow"));
        assert_eq!(highlights[0].location, Some(42));
        // Whitespace-only note collapses to absent.
        assert_eq!(highlights[0].note, None);

        assert_eq!(highlights[1].text, "Second passage");
        assert_eq!(highlights[1].kind, None);
        assert_eq!(highlights[1].location, None);
        assert_eq!(highlights[1].note.as_deref(), Some("margin note"));
    }

    #[test]
    fn empty_panel_yields_no_highlights_and_no_date() {
        let (date, highlights) =
            parse_highlight_panel("<html><body></body></html>", &DomContract::default()).unwrap();
        assert_eq!(date, None);
        assert!(highlights.is_empty());
    }

    #[test]
    fn unparsable_date_is_absent() {
        let html = r#"
            <html><body>
            <span id="kp-notebook-annotated-date">not a date</span>
            </body></html>
        "#;
        let (date, _) = parse_highlight_panel(html, &DomContract::default()).unwrap();
        assert_eq!(date, None);
    }

    #[tokio::test]
    async fn entry_without_click_target_is_skipped() {
        let driver = FakeDriver::new("<html><body><p>empty library</p></body></html>");
        let entry = BookEntry {
            id: "GHOST".to_string(),
            title: "Vanished".to_string(),
            authors: vec!["Unknown Author".to_string()],
            cover_url: None,
        };
        let config = ScraperConfig {
            timing: TimingPolicy::instant(),
            ..ScraperConfig::default()
        };

        let result = extract_book(&driver, &entry, &config).await.unwrap();
        assert!(result.is_none());
    }
}
