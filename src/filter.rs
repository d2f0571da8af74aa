//! Content-quality filtering for extracted text fragments.
//!
//! A fragment survives only if it is long enough for its call site and, where
//! the call site asks for it, does not contain any known boilerplate marker.
//! Length is measured in characters, not bytes.

/// Minimum headline length.
pub const TITLE_MIN_LEN: usize = 10;
/// Minimum story summary length.
pub const SUMMARY_MIN_LEN: usize = 20;
/// Minimum length of a paragraph found inside a detected article section.
pub const PARAGRAPH_MIN_LEN: usize = 50;
/// Minimum length of a paragraph found by the whole-document fallback scan.
pub const BROAD_PARAGRAPH_MIN_LEN: usize = 100;

/// Lowercase phrases that mark advertising, navigation, or promo copy.
pub const AD_MARKERS: &[&str] = &[
    "subscribe",
    "subscription",
    "advertisement",
    "support our journalism",
    "times access",
    "play these games",
    "connections",
    "spelling bee",
    "crossword",
    "newsletter",
    "sign up",
    "log in",
    "create account",
    "paywall",
    "digital subscription",
];

/// Whether `text` reaches `min_len` characters.
pub fn is_substantive(text: &str, min_len: usize) -> bool {
    text.chars().count() >= min_len
}

/// Case-insensitive containment check against [`AD_MARKERS`].
pub fn is_advertising(text: &str) -> bool {
    let lower = text.to_lowercase();
    AD_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A length threshold plus an optional boilerplate check, fixed per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFilter {
    pub min_len: usize,
    pub reject_ads: bool,
}

impl ContentFilter {
    pub const TITLE: ContentFilter = ContentFilter::length_only(TITLE_MIN_LEN);
    pub const SUMMARY: ContentFilter = ContentFilter::length_only(SUMMARY_MIN_LEN);
    pub const PARAGRAPH: ContentFilter = ContentFilter::content(PARAGRAPH_MIN_LEN);
    pub const BROAD_PARAGRAPH: ContentFilter = ContentFilter::content(BROAD_PARAGRAPH_MIN_LEN);

    pub const fn length_only(min_len: usize) -> Self {
        Self {
            min_len,
            reject_ads: false,
        }
    }

    pub const fn content(min_len: usize) -> Self {
        Self {
            min_len,
            reject_ads: true,
        }
    }

    /// A fragment is retained only if it is substantive and, when checked,
    /// not advertising.
    pub fn accepts(&self, text: &str) -> bool {
        is_substantive(text, self.min_len) && !(self.reject_ads && is_advertising(text))
    }
}
