//! Single-shot add parsing.
//!
//! Splits one free-form message into a wish draft: the first URL substring
//! becomes the link, the surrounding text becomes the title. Text before
//! the URL wins; text after it is the fallback; with no text at all the
//! title is derived from the URL's host.

use lazy_static::lazy_static;
use regex::Regex;

use crate::wish::WishDraft;

/// Priority assigned when the user did not pick one.
pub const DEFAULT_PRIORITY: u8 = 3;

// Deliberately loose: anything up to the next whitespace counts as part of
// the URL, then trailing punctuation is stripped off.
lazy_static! {
    static ref URL_REGEX: Regex =
        Regex::new(r"(?i)\bhttps?://\S+").expect("URL pattern should be valid");
}

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '>', '"', '\'', '»'];

/// Whether the message carries an http(s) URL at all.
pub fn contains_url(text: &str) -> bool {
    URL_REGEX.is_match(text)
}

/// Strip punctuation that typically trails a pasted link in prose.
fn trim_url(url: &str) -> &str {
    url.trim_end_matches(TRAILING_PUNCTUATION)
}

/// Fallback title derived from the URL's host, e.g.
/// `https://shop.example/item` becomes "shop.example".
fn title_from_url(url: &str) -> String {
    let without_scheme = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    if host.is_empty() {
        "Untitled".to_string()
    } else {
        host.to_string()
    }
}

/// Parse one message into a wish draft.
///
/// Returns `None` when the message has neither a URL nor usable text, in
/// which case the guided /add flow is the right tool.
pub fn parse_quick_add(text: &str) -> Option<WishDraft> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let Some(url_match) = URL_REGEX.find(text) else {
        // No link at all: treat the whole message as a title.
        return Some(WishDraft {
            title: text.to_string(),
            priority: DEFAULT_PRIORITY,
            ..WishDraft::default()
        });
    };

    let link = trim_url(url_match.as_str()).to_string();
    let before = text[..url_match.start()].trim();
    let after = text[url_match.end()..].trim();

    let title = if !before.is_empty() {
        before.to_string()
    } else if !after.is_empty() {
        after.to_string()
    } else {
        title_from_url(&link)
    };

    Some(WishDraft {
        title,
        link,
        priority: DEFAULT_PRIORITY,
        ..WishDraft::default()
    })
}
