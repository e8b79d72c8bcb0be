//! Listing node selection and external id extraction
//!
//! A listing page enumerates titles, each wrapped in a tier-specific node
//! holding one anchor that links to the title's page. The anchor text is the
//! title; the external id is read from the anchor's `href`.

use crate::config::RatedType;
use crate::harvest::parser::{compile_selector, element_text, find_all};
use crate::harvest::TitleRecord;
use crate::HarvestError;
use scraper::{ElementRef, Html};

/// Selector for listing rows on top-rated charts
pub const TOP_LISTING_SELECTOR: &str = "td.titleColumn";

/// Selector for listing rows on every other chart
pub const BOTTOM_LISTING_SELECTOR: &str = "div.col-title";

/// Path segment preceding the external id in title links
const TITLE_PATH_PREFIX: &str = "/title/";

/// Offset and width of the id inside serialized `<a href="/title/ttNNNNNNN/...">`
const LEGACY_ID_OFFSET: usize = 16;
const LEGACY_ID_LEN: usize = 9;

/// Returns the listing-row selector for a chart tier
pub fn listing_selector(rated: RatedType) -> &'static str {
    match rated {
        RatedType::Top => TOP_LISTING_SELECTOR,
        _ => BOTTOM_LISTING_SELECTOR,
    }
}

/// Selects the listing rows of a parsed listing page
pub fn select_listing_nodes(
    doc: &Html,
    rated: RatedType,
) -> Result<Vec<ElementRef<'_>>, HarvestError> {
    find_all(doc, listing_selector(rated))
}

/// Turns listing rows into title records
///
/// Rows without an anchor, or whose anchor yields no usable id, are skipped
/// with a warning. Input order is preserved and duplicates are kept.
pub fn extract_identifiers(nodes: &[ElementRef<'_>]) -> Result<Vec<TitleRecord>, HarvestError> {
    let anchor = compile_selector("a")?;
    let mut records = Vec::with_capacity(nodes.len());

    for node in nodes {
        let Some(link) = node.select(&anchor).next() else {
            tracing::warn!("Listing row without an anchor: {}", truncate(&node.html(), 120));
            continue;
        };

        let title = element_text(link);
        match external_id_from_href(link).or_else(|| legacy_external_id(link)) {
            Some(external_id) => records.push(TitleRecord { title, external_id }),
            None => tracing::warn!("Could not derive an external id for '{}'", title),
        }
    }

    Ok(records)
}

/// Reads the id from the path segment following `/title/` in the anchor's href
fn external_id_from_href(link: ElementRef<'_>) -> Option<String> {
    let href = link.value().attr("href")?;
    let start = href.find(TITLE_PATH_PREFIX)? + TITLE_PATH_PREFIX.len();
    let id: String = href[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();

    (!id.is_empty()).then_some(id)
}

/// Slices the id out of the serialized anchor markup by fixed offset
///
/// Only holds while the anchor serializes as `<a href="/title/` followed by the
/// id, so the result is accepted only if it is purely alphanumeric.
fn legacy_external_id(link: ElementRef<'_>) -> Option<String> {
    let id: String = link
        .html()
        .chars()
        .skip(LEGACY_ID_OFFSET)
        .take(LEGACY_ID_LEN)
        .collect();

    let usable =
        id.chars().count() == LEGACY_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric());
    usable.then_some(id)
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
