//! Content-type detection and HTML text extraction.
//!
//! Files are classified by extension; anything unknown is treated as
//! `text/plain`. HTML pages are reduced to their Open Graph title and URL
//! plus the visible text, with `<script>` contents and the text of relative
//! links left out.

use std::path::Path;

use scraper::{Html, Node, Selector};

use crate::models::HtmlDocument;
use crate::record::collapse_whitespace;

pub const MIME_TEXT_PLAIN: &str = "text/plain";
pub const MIME_HTML: &str = "text/html";
pub const MIME_JSON: &str = "application/json";

/// How the pipeline reads a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Text,
    Json,
    Unsupported(String),
}

/// MIME type of `path` from its extension, `text/plain` when unknown.
pub fn detect_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(MIME_TEXT_PLAIN)
        .to_string()
}

pub fn classify(content_type: &str) -> ContentKind {
    match content_type {
        MIME_HTML => ContentKind::Html,
        MIME_JSON => ContentKind::Json,
        ct if ct.starts_with("text/") => ContentKind::Text,
        other => ContentKind::Unsupported(other.to_string()),
    }
}

/// Pull `og:title`, `og:url` and the readable text out of an HTML page.
///
/// Entities are decoded by the parser; runs of whitespace in the text are
/// collapsed to a single space.
pub fn extract_html_metadata(html: &str) -> HtmlDocument {
    let document = Html::parse_document(html);

    let mut text = String::new();
    for node in document.tree.nodes() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(el) => match el.name() {
                "script" => true,
                "a" => el.attr("href").is_some_and(|href| !is_absolute(href)),
                _ => false,
            },
            _ => false,
        });
        if !hidden {
            text.push_str(fragment);
        }
    }

    HtmlDocument {
        title: og_property(&document, "og:title"),
        url: og_property(&document, "og:url"),
        text: collapse_whitespace(&text),
    }
}

fn og_property(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[property=\"{}\"]", property)).ok()?;
    document
        .select(&selector)
        .find_map(|el| el.value().attr("content"))
        .map(str::to_string)
}

fn is_absolute(href: &str) -> bool {
    href.get(..4)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http"))
}
