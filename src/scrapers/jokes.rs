//! Joke catalog scraper.
//!
//! Categories are discovered from the left navigation block of the catalog
//! index. Each category page shows a first batch of jokes; further batches
//! come from an AJAX "load more" endpoint that takes a page number and the
//! category slug and returns an HTML fragment of joke blocks.
//!
//! # URL Pattern
//!
//! `https://www.laughfactory.com/jokes/knock-knock` has slug `knock-knock`;
//! its continuations are `…/jokes/ajax/load_more?page=2&category=knock-knock`,
//! `page=3`, and so on.

use crate::config::JokesConfig;
use crate::fetch::{FetchClient, Transport};
use crate::models::{Category, Collection, JokeEntry};
use crate::pagination::{Batch, ContinuationSource, PaginationReport, Paginator};
use crate::selector::{StrategyChain, css, extract_first_match, text_of};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

static NAV_BLOCK: Lazy<Selector> = Lazy::new(|| css("div.left-navigation-block ul"));
static NAV_ITEM: Lazy<Selector> = Lazy::new(|| css("li"));
static NAV_LINK: Lazy<Selector> = Lazy::new(|| css("a"));
static NAV_LABEL: Lazy<Selector> = Lazy::new(|| css("span"));
static JOKE_BLOCK: Lazy<Selector> = Lazy::new(|| css("div.jokes-main-pane-block"));

/// Joke text keeps its internal line breaks; only the ends are trimmed.
static JOKE_TEXT: Lazy<StrategyChain<String>> = Lazy::new(|| {
    StrategyChain::uniform(&["div.joke-text-holder p"], |n| {
        Some(n.text().collect::<String>().trim().to_string()).filter(|t| !t.is_empty())
    })
});
static JOKE_AUTHOR: Lazy<StrategyChain<String>> = Lazy::new(|| {
    StrategyChain::uniform(&["div.person-avatar-info.small-avatar small"], |n| {
        Some(text_of(n))
    })
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_-]").expect("static regex"));

/// Slug used for a category label: trimmed, whitespace runs to `_`, lowercase,
/// anything outside `[a-z0-9_-]` to `_`.
///
/// The name becomes a file name, so a label with no letters or digits maps to
/// an empty string and the caller substitutes `unknown`.
pub fn normalize_category_name(label: &str) -> String {
    let lowered = WHITESPACE.replace_all(label.trim(), "_").to_lowercase();
    if !lowered.chars().any(|c| c.is_ascii_alphanumeric()) {
        return String::new();
    }
    DISALLOWED.replace_all(&lowered, "_").into_owned()
}

/// Second path segment of a category URL, or an empty string.
pub fn category_slug(category_url: &str) -> String {
    Url::parse(category_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.nth(1).map(str::to_string))
        })
        .unwrap_or_default()
}

/// Categories listed in the navigation block whose links live under `base_url`.
pub fn parse_categories(body: &str, base_url: &str) -> Vec<Category> {
    let document = Html::parse_document(body);
    let Some(nav) = document.select(&NAV_BLOCK).next() else {
        warn!("No navigation block found");
        return Vec::new();
    };
    let prefix = format!("{}/", base_url.trim_end_matches('/'));

    nav.select(&NAV_ITEM)
        .filter_map(|item| item.select(&NAV_LINK).next())
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            if !href.starts_with(&prefix) {
                return None;
            }
            let name = link
                .select(&NAV_LABEL)
                .next()
                .map(|label| normalize_category_name(&text_of(label)))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "unknown".to_string());
            debug!(%name, url = href, "Found category");
            Some(Category {
                name,
                source_url: href.to_string(),
            })
        })
        .collect()
}

/// Joke blocks in a category page or continuation fragment.
pub fn parse_joke_blocks(body: &str) -> Batch<JokeEntry> {
    let document = Html::parse_document(body);
    let blocks: Vec<_> = document.select(&JOKE_BLOCK).collect();
    let items = blocks
        .iter()
        .filter_map(|block| {
            let text = extract_first_match(*block, &JOKE_TEXT).and_then(|m| m.first())?;
            let author = extract_first_match(*block, &JOKE_AUTHOR).and_then(|m| m.first());
            JokeEntry::new(&text, author.as_deref())
        })
        .collect();
    Batch {
        blocks: blocks.len(),
        items,
    }
}

/// One category as a paginated source.
#[derive(Debug, Clone)]
pub struct CategorySource {
    pub category_url: String,
    pub slug: String,
    pub continuation_endpoint: String,
}

impl CategorySource {
    pub fn new(category: &Category, continuation_endpoint: &str) -> Self {
        Self {
            category_url: category.source_url.clone(),
            slug: category_slug(&category.source_url),
            continuation_endpoint: continuation_endpoint.to_string(),
        }
    }
}

impl ContinuationSource for CategorySource {
    type Item = JokeEntry;

    fn seed_url(&self) -> String {
        self.category_url.clone()
    }

    /// The seed page is page 1, so continuation `n` asks for page `n + 1`.
    fn continuation_url(&self, cycle: usize) -> String {
        let page = (cycle + 1).to_string();
        match Url::parse(&self.continuation_endpoint) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("page", &page)
                    .append_pair("category", &self.slug);
                url.to_string()
            }
            Err(_) => format!(
                "{}?page={}&category={}",
                self.continuation_endpoint, page, self.slug
            ),
        }
    }

    fn extract(&self, body: &str) -> Batch<JokeEntry> {
        parse_joke_blocks(body)
    }
}

/// Fetch the catalog index and list its categories. Empty on failure.
#[instrument(level = "info", skip_all, fields(base_url = %config.base_url))]
pub async fn index_categories<T: Transport>(
    client: &FetchClient<T>,
    config: &JokesConfig,
) -> Vec<Category> {
    let outcome = client.fetch(&config.base_url, &client.listing_context()).await;
    let Some(page) = outcome.into_page() else {
        warn!("Failed to fetch categories");
        return Vec::new();
    };
    let categories = parse_categories(&page.body, &config.base_url);
    info!(count = categories.len(), "Indexed joke categories");
    categories
}

/// Collect every joke reachable from one category.
#[instrument(level = "info", skip_all, fields(category = %category.name))]
pub async fn scrape_category<T: Transport>(
    client: &FetchClient<T>,
    config: &JokesConfig,
    category: &Category,
) -> (Collection<JokeEntry>, PaginationReport) {
    let source = CategorySource::new(category, &config.continuation_url);
    let mut jokes = Collection::new(category.name.clone());
    let report = Paginator::new(config.max_continuations, config.continuation_delay())
        .run(client, &source, &mut jokes)
        .await;
    info!(total = jokes.len(), stop = ?report.stop, "Scraped category");
    (jokes, report)
}
