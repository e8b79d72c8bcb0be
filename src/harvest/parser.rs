//! HTML parsing primitives
//!
//! This module wraps the `scraper` crate with the lookups the pipeline needs:
//! - All nodes matching a selector (listing rows, review containers)
//! - The text of the first match inside one element
//! - The text found under the N-th occurrence of a repeated block, where
//!   absence is expected

use crate::HarvestError;
use scraper::{ElementRef, Html, Selector};

/// Parses an HTML document
///
/// Parsing is error-correcting: malformed markup yields a best-effort tree
/// rather than an error.
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// Compiles a CSS selector
///
/// # Returns
///
/// * `Ok(Selector)` - Compiled selector
/// * `Err(HarvestError::Selector)` - The selector string is not valid CSS
pub fn compile_selector(selector: &str) -> Result<Selector, HarvestError> {
    Selector::parse(selector)
        .map_err(|e| HarvestError::Selector(format!("'{}': {:?}", selector, e)))
}

/// Finds all elements matching `selector`, in document order
///
/// An empty vector means nothing matched; only an invalid selector errors.
///
/// # Example
///
/// ```
/// use review_harvest::harvest::{find_all, parse_document};
///
/// let doc = parse_document(r#"<table><tr><td class="titleColumn">A</td></tr></table>"#);
/// let nodes = find_all(&doc, "td.titleColumn").unwrap();
/// assert_eq!(nodes.len(), 1);
/// ```
pub fn find_all<'a>(doc: &'a Html, selector: &str) -> Result<Vec<ElementRef<'a>>, HarvestError> {
    let selector = compile_selector(selector)?;
    Ok(doc.select(&selector).collect())
}

/// A positional markup path: `target` looked up inside the N-th `container`
#[derive(Debug, Clone)]
pub struct PositionalPath {
    container: Selector,
    target: Selector,
}

impl PositionalPath {
    /// Compiles both halves of the path
    pub fn new(container: &str, target: &str) -> Result<Self, HarvestError> {
        Ok(Self {
            container: compile_selector(container)?,
            target: compile_selector(target)?,
        })
    }

    /// Number of containers in `doc`
    pub fn count(&self, doc: &Html) -> usize {
        doc.select(&self.container).count()
    }
}

/// Returns the text under the `index`-th (zero-based) container of `path`
///
/// Returns `None` when there are fewer than `index + 1` containers, when the
/// container holds no `target`, or when the target's text is empty. A missing
/// target in one container never shifts the lookup onto a later container.
pub fn text_at_path(doc: &Html, path: &PositionalPath, index: usize) -> Option<String> {
    let container = doc.select(&path.container).nth(index)?;
    text_within(container, &path.target)
}

/// Text of the first element under `element` matching `selector`, if non-empty
pub fn text_within(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Concatenates and trims all text nodes under an element
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
