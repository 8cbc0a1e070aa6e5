//! Enumeration of the notebook library listing into [`BookEntry`] records.

use crate::core::config::DomContract;
use crate::core::page::PageDriver;
use crate::errors::{Result, ScrapeError};
use crate::normalize::parse_authors;
use crate::types::BookEntry;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};

/// Snapshot the current page and index every library entry, in DOM order.
pub async fn index_library<D>(driver: &D, dom: &DomContract) -> Result<Vec<BookEntry>>
where
    D: PageDriver + ?Sized,
{
    let html = driver.content().await?;
    let entries = parse_library(&html, dom)?;
    info!(count = entries.len(), "library indexed");
    Ok(entries)
}

/// Parse a library snapshot. Entries without an id or a title are dropped
/// silently; a missing author node falls back to the placeholder list.
pub fn parse_library(html: &str, dom: &DomContract) -> Result<Vec<BookEntry>> {
    let entry_sel = css(&dom.library_entry)?;
    let title_sel = css(&dom.entry_title)?;
    let author_sel = css(&dom.entry_author)?;
    let cover_sel = css(&dom.entry_cover)?;

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for element in document.select(&entry_sel) {
        let id = element
            .value()
            .attr("id")
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let title = element
            .select(&title_sel)
            .next()
            .map(node_text)
            .filter(|title| !title.is_empty());

        let (Some(id), Some(title)) = (id, title) else {
            debug!("dropping library entry without id or title");
            continue;
        };
        if !seen.insert(id.to_string()) {
            debug!(id, "dropping library entry with duplicate id");
            continue;
        }

        let authors = match element.select(&author_sel).next() {
            Some(author) => parse_authors(&node_text(author)),
            None => parse_authors(""),
        };
        let cover_url = element
            .select(&cover_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);

        entries.push(BookEntry {
            id: id.to_string(),
            title,
            authors,
            cover_url,
        });
    }

    Ok(entries)
}

pub(crate) fn css(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| ScrapeError::SelectorParse(selector.to_string()))
}

pub(crate) fn node_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
