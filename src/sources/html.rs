//! Small helpers shared by the HTML scraping adapters.

use scraper::{ElementRef, Selector};
use url::Url;

/// Compile a selector known at build time
pub(crate) fn selector(input: &'static str) -> Selector {
    Selector::parse(input).expect("static selector is valid")
}

/// Collapse whitespace; `None` when nothing is left
pub(crate) fn clean(text: &str) -> Option<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Text of `element`, text nodes separated by single spaces
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    clean(&element.text().collect::<Vec<_>>().join(" ")).unwrap_or_default()
}

/// `href` resolved against `base`, if it is an http(s) link
pub(crate) fn absolute_link(base: &Url, href: &str) -> Option<Url> {
    base.join(href.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}
