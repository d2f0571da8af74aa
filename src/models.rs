//! Data models for harvested records and the collections that hold them.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Category`]: A joke category discovered from the site navigation
//! - [`JokeEntry`], [`ArticleSummary`]: The two kinds of extracted record
//! - [`ArticleBody`]: Filtered, deduplicated paragraphs of one article
//! - [`Collection`]: Insertion-ordered, deduplicating container for one category or story set
//! - [`ArticlePayload`]: JSON body delivered to the ingestion endpoint

use serde::{Deserialize, Serialize};

/// Author recorded when a joke block carries no username.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// A joke category discovered once per run from the navigation listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Normalized slug used for file names and collection names.
    pub name: String,
    /// Absolute URL of the category's first page.
    pub source_url: String,
}

/// One joke and the user who posted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JokeEntry {
    pub text: String,
    pub author: String,
}

impl JokeEntry {
    /// Build an entry from raw extracted text. Returns `None` when the text is
    /// blank; a blank author falls back to [`UNKNOWN_AUTHOR`].
    pub fn new(text: &str, author: Option<&str>) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let author = author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR);
        Some(Self {
            text: text.to_string(),
            author: author.to_string(),
        })
    }
}

/// A story teaser found on the news homepage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    pub title: String,
    /// Absolute article URL.
    pub link: Option<String>,
    pub summary: Option<String>,
    pub timestamp: Option<String>,
}

impl ArticleSummary {
    /// Returns `None` for a blank title.
    pub fn new(title: &str) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            link: None,
            summary: None,
            timestamp: None,
        })
    }
}

/// The ordered paragraphs of a fetched article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleBody {
    pub paragraphs: Vec<String>,
    pub source_link: String,
}

impl ArticleBody {
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Paragraphs separated by a blank line.
    pub fn joined(&self) -> String {
        self.paragraphs.join("\n\n")
    }
}

/// Equality key used by [`Collection::add`].
pub trait DedupKey {
    fn dedup_key(&self) -> &str;
}

impl DedupKey for JokeEntry {
    fn dedup_key(&self) -> &str {
        self.text.trim()
    }
}

impl DedupKey for ArticleSummary {
    fn dedup_key(&self) -> &str {
        self.title.trim()
    }
}

impl DedupKey for String {
    fn dedup_key(&self) -> &str {
        self
    }
}

/// Deduplicated records for one category or story set, in first-seen order.
///
/// Lookups are a linear scan over everything collected so far; collections
/// hold at most a few hundred items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection<T> {
    name: String,
    items: Vec<T>,
}

impl<T: DedupKey> Collection<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Insert `item` unless an item with the same key is already present.
    /// Returns `true` when the item was inserted.
    pub fn add(&mut self, item: T) -> bool {
        let key = item.dedup_key();
        if self.items.iter().any(|existing| existing.dedup_key() == key) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Add every item, returning how many were new.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) -> usize {
        let mut added = 0;
        for item in items {
            if self.add(item) {
                added += 1;
            }
        }
        added
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Give up the collection, keeping its name.
    pub fn into_parts(self) -> (String, Vec<T>) {
        (self.name, self.items)
    }
}

#[cfg(test)]
impl<T> Collection<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

/// A homepage story with its fetched body, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedStory {
    pub summary: ArticleSummary,
    pub body: Option<ArticleBody>,
}

/// JSON document accepted by the ingestion endpoint.
///
/// Missing values are sent as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePayload {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub date: String,
}

impl From<&ScrapedStory> for ArticlePayload {
    fn from(story: &ScrapedStory) -> Self {
        Self {
            title: story.summary.title.clone(),
            summary: story.summary.summary.clone().unwrap_or_default(),
            content: story
                .body
                .as_ref()
                .map(ArticleBody::joined)
                .unwrap_or_default(),
            date: story.summary.timestamp.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joke(text: &str, author: &str) -> JokeEntry {
        JokeEntry::new(text, Some(author)).unwrap()
    }

    #[test]
    fn test_same_joke_twice_is_stored_once() {
        let mut jokes = Collection::new("puns");
        assert!(jokes.add(joke("Why did the chicken cross the road?", "sam")));
        assert!(!jokes.add(joke("Why did the chicken cross the road?", "sam")));
        assert_eq!(jokes.len(), 1);
    }

    #[test]
    fn test_duplicate_key_ignores_author_and_surrounding_whitespace() {
        let mut jokes = Collection::new("puns");
        jokes.add(joke("Knock knock.", "amy"));
        assert!(!jokes.add(joke("   Knock knock.  ", "bo")));
        assert_eq!(jokes.items()[0].author, "amy");
    }

    #[test]
    fn test_iteration_follows_first_seen_order() {
        let mut paragraphs: Collection<String> = Collection::new("body");
        let added = paragraphs.extend(
            ["c", "a", "c", "b", "a"].into_iter().map(String::from),
        );
        assert_eq!(added, 3);
        let order: Vec<&str> = paragraphs.items().iter().map(String::as_str).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_blank_joke_text_is_not_an_entry() {
        assert!(JokeEntry::new("   ", Some("amy")).is_none());
    }

    #[test]
    fn test_missing_author_defaults_to_unknown() {
        assert_eq!(JokeEntry::new("Ha", None).unwrap().author, UNKNOWN_AUTHOR);
        assert_eq!(JokeEntry::new("Ha", Some("  ")).unwrap().author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_article_titles_dedup_after_trim() {
        let mut items = Collection::new("stories");
        assert!(items.add(ArticleSummary::new("Budget passes Senate").unwrap()));
        assert!(!items.add(ArticleSummary::new("Budget passes Senate ").unwrap()));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_payload_joins_paragraphs_with_blank_line() {
        let mut summary = ArticleSummary::new("A headline long enough").unwrap();
        summary.timestamp = Some("June 3".into());
        let story = ScrapedStory {
            summary,
            body: Some(ArticleBody {
                paragraphs: vec!["First.".into(), "Second.".into()],
                source_link: "https://example.com/a".into(),
            }),
        };
        let payload = ArticlePayload::from(&story);
        assert_eq!(payload.content, "First.\n\nSecond.");
        assert_eq!(payload.summary, "");
        assert_eq!(payload.date, "June 3");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["title"], "A headline long enough");
    }
}
