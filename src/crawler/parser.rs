//! HTML extractor
//!
//! This module turns a fetched document into:
//! - Page metadata (title and meta description)
//! - Lowercased body text with non-content subtrees skipped
//! - Raw outbound hrefs, in document order
//!
//! Link resolution and filtering happen later in [`crate::url::LinkFilter`].

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose whole subtree carries no indexable text
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "head", "noscript", "svg", "img", "iframe"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from the first <title> tag)
    pub title: Option<String>,

    /// The `content` of the first `<meta name="description">`
    pub description: Option<String>,

    /// Lowercased visible text
    pub text: String,

    /// Raw `href` values of `<a>` tags, unresolved
    pub links: Vec<String>,
}

/// Parses HTML content and extracts metadata, text, and links
///
/// # Arguments
///
/// * `html` - The HTML content to parse
///
/// # Returns
///
/// * `Ok(ParsedPage)` - Successfully parsed page
/// * `Err(String)` - The document is empty
///
/// # Example
///
/// ```
/// use ripple_index::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><p>Hello</p><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html).unwrap();
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.text, "hello link");
/// assert_eq!(parsed.links, vec!["/page".to_string()]);
/// ```
pub fn parse_html(html: &str) -> Result<ParsedPage, String> {
    if html.trim().is_empty() {
        return Err("empty document".to_string());
    }

    let document = Html::parse_document(html);

    Ok(ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        text: extract_text(document.root_element()),
        links: extract_links(&document),
    })
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name]").ok()?;

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
}

/// Depth-first text extraction
///
/// Text nodes are lowercased; child results are joined with one space and
/// trimmed at every level, so whitespace never accumulates.
pub fn extract_text(element: ElementRef<'_>) -> String {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return String::new();
    }

    let mut parts: Vec<String> = Vec::new();
    for child in element.children() {
        let part = match child.value() {
            Node::Text(text) => text.trim().to_lowercase(),
            Node::Element(_) => match ElementRef::wrap(child) {
                Some(child_element) => extract_text(child_element),
                None => continue,
            },
            _ => continue,
        };

        if !part.is_empty() {
            parts.push(part);
        }
    }

    parts.join(" ").trim().to_string()
}

/// Collects raw hrefs from `<a>` tags in document order
fn extract_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                let href = href.trim();
                if !href.is_empty() {
                    links.push(href.to_string());
                }
            }
        }
    }

    links
}
