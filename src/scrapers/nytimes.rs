//! New York Times homepage scraper.
//!
//! The homepage markup changes often, so every field is read through an
//! ordered [`StrategyChain`]: story containers, headline and link, summary,
//! and timestamp each have their own fallback list. Article bodies are found
//! the same way, with a whole-document paragraph scan as the last resort.
//!
//! Stories are fetched one at a time; the homepage is a single page with no
//! continuation phase.

use crate::config::NewsConfig;
use crate::fetch::{FetchClient, Transport};
use crate::filter::ContentFilter;
use crate::models::{ArticleBody, ArticleSummary, Collection, ScrapedStory};
use crate::pagination::{Batch, ContinuationSource, Paginator};
use crate::selector::{
    Fallthrough, SelectorList, Strategy, StrategyChain, css, document_scope, extract_first_match,
    text_of,
};
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

static STORY_CONTAINERS: Lazy<SelectorList> = Lazy::new(|| {
    SelectorList::new(&[
        r#"[data-tpl="sli"]"#,
        ".story-wrapper",
        "article",
        r#"[class*="story"]"#,
    ])
});

/// Headline text and, when the headline node is a link, its raw href.
type Headline = (String, Option<String>);

fn headline(node: ElementRef<'_>) -> Option<Headline> {
    let title = text_of(node);
    if !ContentFilter::TITLE.accepts(&title) {
        return None;
    }
    Some((title, node.value().attr("href").map(str::to_string)))
}

static TITLE: Lazy<StrategyChain<Headline>> = Lazy::new(|| {
    StrategyChain::uniform(
        &[
            r#"[data-tpl="h"] a"#,
            "h1 a",
            "h2 a",
            "h3 a",
            ".indicate-hover",
            r#"[class*="headline"]"#,
            r#"a[href*="/20"]"#,
        ],
        headline,
    )
});

static SUMMARY: Lazy<StrategyChain<String>> = Lazy::new(|| {
    StrategyChain::uniform(
        &[
            ".summary-class",
            r#"[class*="summary"]"#,
            r#"p[class*="css-"]"#,
            ".css-sarx3u p",
        ],
        |node| Some(text_of(node)).filter(|s| ContentFilter::SUMMARY.accepts(s)),
    )
    .with_fallthrough(Fallthrough::UntilQualifying)
});

static TIMESTAMP: Lazy<StrategyChain<String>> = Lazy::new(|| {
    StrategyChain::uniform(&["time", "[datetime]", "[data-time]"], |node| {
        let text = text_of(node);
        if !text.is_empty() {
            return Some(text);
        }
        node.value()
            .attr("datetime")
            .or_else(|| node.value().attr("data-time"))
            .map(str::to_string)
    })
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| css("p"));

fn section_paragraphs(section: ElementRef<'_>) -> Option<Vec<String>> {
    let paragraphs: Vec<String> = section
        .select(&PARAGRAPH)
        .map(text_of)
        .filter(|p| ContentFilter::PARAGRAPH.accepts(p))
        .collect();
    (!paragraphs.is_empty()).then_some(paragraphs)
}

static ARTICLE_SECTIONS: Lazy<StrategyChain<Vec<String>>> = Lazy::new(|| {
    StrategyChain::new(
        [
            r#"section[name="articleBody"]"#,
            ".StoryBodyCompanionColumn",
            r#"[data-testid*="companionColumn"]"#,
            ".css-s99gbd",
            "section.meteredContent",
            ".css-at9mc1",
            r#"[class*="story-body"]"#,
            ".article-body",
        ]
        .into_iter()
        .map(|selector| Strategy::new(selector, section_paragraphs))
        .collect(),
    )
    .with_fallthrough(Fallthrough::UntilQualifying)
});

/// Headline, link, summary, and timestamp of one story container.
///
/// Returns `None` when no headline selector matches or the headline is too
/// short. Relative links are resolved against `base`.
pub fn extract_story(container: ElementRef<'_>, base: &Url) -> Option<ArticleSummary> {
    let title_match = extract_first_match(container, &TITLE)?;
    let label = title_match.label;
    let Some((title, href)) = title_match.first() else {
        debug!(selector = label, "Headline too short; skipping story");
        return None;
    };

    let mut story = ArticleSummary::new(&title)?;
    story.link = href.and_then(|href| base.join(&href).ok()).map(String::from);
    story.summary = extract_first_match(container, &SUMMARY)
        .and_then(|m| m.first());
    story.timestamp = extract_first_match(container, &TIMESTAMP).and_then(|m| m.first());
    Some(story)
}

/// Stories found on the homepage, at most `limit` containers considered.
pub fn parse_homepage(body: &str, base: &Url, limit: usize) -> Batch<ArticleSummary> {
    let document = Html::parse_document(body);
    let Some(containers) = STORY_CONTAINERS.first_match(document_scope(&document)) else {
        warn!("No story containers matched");
        return Batch::empty();
    };
    info!(
        found = containers.nodes.len(),
        selector = containers.label,
        "Found stories"
    );

    let considered: Vec<ElementRef<'_>> = containers.nodes.into_iter().take(limit).collect();
    let items = considered
        .iter()
        .filter_map(|container| extract_story(*container, base))
        .collect();
    Batch {
        blocks: considered.len(),
        items,
    }
}

/// Paragraphs of an article page.
///
/// The first section selector that yields a retained paragraph wins; if none
/// does, every paragraph of the document is scanned with the stricter
/// threshold. Duplicate paragraphs are dropped, first occurrence kept.
pub fn extract_article_body(body: &str, source_link: &str) -> ArticleBody {
    let document = Html::parse_document(body);
    let scope = document_scope(&document);

    let sectioned: Vec<String> = match extract_first_match(scope, &ARTICLE_SECTIONS) {
        Some(found) if !found.values.is_empty() => {
            debug!(selector = found.label, "Found content section");
            found.values.into_iter().flatten().collect()
        }
        _ => Vec::new(),
    };

    let paragraphs = if sectioned.is_empty() {
        debug!("No structured content found, scanning all paragraphs");
        scope
            .select(&PARAGRAPH)
            .map(text_of)
            .filter(|p| ContentFilter::BROAD_PARAGRAPH.accepts(p))
            .collect()
    } else {
        sectioned
    };

    ArticleBody {
        paragraphs: paragraphs.into_iter().unique().collect(),
        source_link: source_link.to_string(),
    }
}

/// The homepage as a single-page source.
#[derive(Debug, Clone)]
pub struct HomepageSource {
    pub base: Url,
    pub max_candidates: usize,
}

impl ContinuationSource for HomepageSource {
    type Item = ArticleSummary;

    fn seed_url(&self) -> String {
        self.base.to_string()
    }

    /// The homepage has no continuation endpoint; it is only ever read with
    /// [`Paginator::single_shot`].
    fn continuation_url(&self, _cycle: usize) -> String {
        self.base.to_string()
    }

    fn extract(&self, body: &str) -> Batch<ArticleSummary> {
        parse_homepage(body, &self.base, self.max_candidates)
    }
}

/// Stories on the homepage, deduplicated by title. Empty on failure.
#[instrument(level = "info", skip_all, fields(homepage = %config.homepage_url))]
pub async fn index_stories<T: Transport>(
    client: &FetchClient<T>,
    config: &NewsConfig,
) -> Collection<ArticleSummary> {
    let mut stories = Collection::new("homepage");
    let base = match Url::parse(&config.homepage_url) {
        Ok(base) => base,
        Err(e) => {
            warn!(error = %e, "Homepage URL is not valid");
            return stories;
        }
    };
    let source = HomepageSource {
        base,
        max_candidates: config.max_candidates,
    };
    Paginator::single_shot()
        .run(client, &source, &mut stories)
        .await;
    info!(count = stories.len(), "Indexed homepage stories");
    stories
}

/// Fetch and extract one article. An empty body on any failure.
#[instrument(level = "info", skip_all, fields(%link))]
pub async fn fetch_article<T: Transport>(
    client: &FetchClient<T>,
    link: &str,
    referrer: &str,
) -> ArticleBody {
    let outcome = client.fetch(link, &client.article_context(referrer)).await;
    let attempts = outcome.attempts;
    match outcome.into_page() {
        Some(page) => {
            let body = extract_article_body(&page.body, link);
            info!(
                paragraphs = body.paragraphs.len(),
                status = page.status,
                via_alternate = page.via_alternate,
                primary_attempts = attempts.primary,
                alternate_attempts = attempts.alternate,
                "Extracted article"
            );
            body
        }
        None => {
            warn!(primary_attempts = attempts.primary, "No content extracted");
            ArticleBody {
                paragraphs: Vec::new(),
                source_link: link.to_string(),
            }
        }
    }
}

/// Index the homepage and fetch the body of the first `max_stories` stories.
///
/// Stories without a link are kept with no body.
#[instrument(level = "info", skip_all, fields(max_stories))]
pub async fn scrape_stories<T: Transport>(
    client: &FetchClient<T>,
    config: &NewsConfig,
    max_stories: usize,
) -> Vec<ScrapedStory> {
    let (_, summaries) = index_stories(client, config).await.into_parts();
    if summaries.is_empty() {
        warn!("No stories found on homepage");
        return Vec::new();
    }

    let referrer = config.homepage_url.as_str();
    let stories: Vec<ScrapedStory> = stream::iter(summaries.into_iter().take(max_stories).enumerate())
        .then(|(i, summary)| async move {
            info!(index = i + 1, title = %truncate_for_log(&summary.title, 50), "Processing story");
            let body = match summary.link.as_deref() {
                Some(link) => Some(fetch_article(client, link, referrer).await),
                None => None,
            };
            ScrapedStory { summary, body }
        })
        .collect()
        .await;

    info!(count = stories.len(), "Fetched story contents");
    stories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchPolicy;
    use crate::error::TransportError;
    use crate::fetch::RawResponse;
    use crate::fetch::testing::client;

    fn base() -> Url {
        Url::parse("https://www.nytimes.com").unwrap()
    }

    fn long_paragraph(len: usize, seed: &str) -> String {
        let mut text = format!("{seed} ");
        while text.chars().count() < len {
            text.push('x');
        }
        text
    }

    const HOMEPAGE: &str = r#"
        <html><body>
          <div class="story-wrapper">
            <h3><a href="/2025/06/01/world/summit-ends.html">Summit ends without agreement</a></h3>
            <p class="summary-class">Short.</p>
            <p class="css-abc123">Leaders left the talks with no joint statement on trade.</p>
            <time datetime="2025-06-01">June 1, 2025</time>
          </div>
          <div class="story-wrapper">
            <h2><a href="https://www.nytimes.com/2025/06/01/us/tiny.html">Tiny</a></h2>
          </div>
          <div class="story-wrapper">
            <span class="headline-large">Storm season forecast raised</span>
            <div data-time="1717243200"></div>
          </div>
          <article><h2><a href="/ignored">Articles lose to story wrappers</a></h2></article>
        </body></html>
    "#;

    #[test]
    fn test_homepage_uses_first_matching_container_selector() {
        let batch = parse_homepage(HOMEPAGE, &base(), 10);
        assert_eq!(batch.blocks, 3);
        assert_eq!(batch.items.len(), 2);

        let summit = &batch.items[0];
        assert_eq!(summit.title, "Summit ends without agreement");
        assert_eq!(
            summit.link.as_deref(),
            Some("https://www.nytimes.com/2025/06/01/world/summit-ends.html")
        );
        assert_eq!(
            summit.summary.as_deref(),
            Some("Leaders left the talks with no joint statement on trade.")
        );
        assert_eq!(summit.timestamp.as_deref(), Some("June 1, 2025"));

        let storm = &batch.items[1];
        assert_eq!(storm.title, "Storm season forecast raised");
        assert!(storm.link.is_none());
        assert!(storm.summary.is_none());
        assert_eq!(storm.timestamp.as_deref(), Some("1717243200"));
    }

    #[test]
    fn test_container_limit_is_applied_before_extraction() {
        let batch = parse_homepage(HOMEPAGE, &base(), 1);
        assert_eq!(batch.blocks, 1);
        assert_eq!(batch.items.len(), 1);
    }

    #[test]
    fn test_homepage_without_containers_is_empty() {
        let batch = parse_homepage("<html><body><p>nothing</p></body></html>", &base(), 10);
        assert_eq!(batch, Batch::empty());
    }

    #[test]
    fn test_short_headline_does_not_fall_through_to_later_selectors() {
        let html = Html::parse_document(
            r#"<div class="story-wrapper"><h1><a href="/a">Short</a></h1>
               <h2><a href="/b">A perfectly good headline</a></h2></div>"#,
        );
        let container = html.select(&css(".story-wrapper")).next().unwrap();
        assert!(extract_story(container, &base()).is_none());
    }

    #[test]
    fn test_broad_fallback_keeps_long_paragraphs_only() {
        let kept = long_paragraph(120, "Officials said");
        let dropped = long_paragraph(60, "Brief");
        let html = format!("<html><body><div><p>{kept}</p><p>{dropped}</p></div></body></html>");
        let body = extract_article_body(&html, "https://www.nytimes.com/a");
        assert_eq!(body.paragraphs, vec![kept]);
        assert_eq!(body.source_link, "https://www.nytimes.com/a");
    }

    #[test]
    fn test_broad_fallback_applies_ad_filter() {
        let ad = long_paragraph(150, "Subscribe now for unlimited access.");
        let html = format!("<html><body><p>{ad}</p></body></html>");
        assert!(extract_article_body(&html, "l").is_empty());
    }

    #[test]
    fn test_section_paragraphs_filtered_and_deduplicated() {
        let first = long_paragraph(80, "The committee met");
        let second = long_paragraph(80, "Votes were counted");
        let ad = long_paragraph(80, "Play these games today");
        let outside = long_paragraph(200, "Outside the section");
        let html = format!(
            r#"<html><body>
                 <section name="articleBody">
                   <p>{first}</p><p>too short</p><p>{ad}</p><p>{second}</p><p>{first}</p>
                 </section>
                 <p>{outside}</p>
               </body></html>"#
        );
        let body = extract_article_body(&html, "l");
        assert_eq!(body.paragraphs, vec![first, second]);
    }

    #[test]
    fn test_section_with_only_noise_falls_through_to_next_section_selector() {
        let real = long_paragraph(90, "Rescue crews arrived");
        let html = format!(
            r#"<html><body>
                 <section name="articleBody"><p>Sign up for our newsletter and more text here to be long enough.</p></section>
                 <div class="article-body"><p>{real}</p></div>
               </body></html>"#
        );
        assert_eq!(extract_article_body(&html, "l").paragraphs, vec![real]);
    }

    #[tokio::test]
    async fn test_blocked_article_recovers_through_alternate_fetch() {
        let paragraph = long_paragraph(120, "Rainfall totals");
        let alternate = format!(r#"<html><body><section name="articleBody"><p>{paragraph}</p></section></body></html>"#);
        let fetcher = client(vec![
            Ok(RawResponse::new(403, "")),
            Ok(RawResponse::new(403, "")),
            Ok(RawResponse::new(403, "")),
            Ok(RawResponse::new(200, alternate)),
        ]);
        let body = fetch_article(&fetcher, "https://www.nytimes.com/a", "https://www.nytimes.com").await;
        assert_eq!(body.paragraphs, vec![paragraph]);
        assert_eq!(fetcher.transport().requests().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_article_fetch_is_empty_body() {
        let fetcher = client(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
        ]);
        let body = fetch_article(&fetcher, "https://www.nytimes.com/a", "https://www.nytimes.com").await;
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_stories_limits_and_fetches_in_order() {
        let article = format!(
            r#"<section name="articleBody"><p>{}</p></section>"#,
            long_paragraph(70, "Summit details")
        );
        let fetcher = FetchClient::new(
            crate::fetch::testing::ScriptedTransport::new(vec![
                Ok(RawResponse::new(200, HOMEPAGE)),
                Ok(RawResponse::new(200, article)),
            ]),
            FetchPolicy::immediate(),
            vec!["ua".into()],
        );
        let config = NewsConfig::default();
        let stories = scrape_stories(&fetcher, &config, 1).await;

        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].body.as_ref().unwrap().paragraphs.len(), 1);
        let requests = fetcher.transport().requests();
        assert_eq!(
            requests[1].url,
            "https://www.nytimes.com/2025/06/01/world/summit-ends.html"
        );
        assert_eq!(
            requests[1].identity.referrer.as_deref(),
            Some("https://www.nytimes.com")
        );
    }

    #[tokio::test]
    async fn test_scrape_stories_with_unreachable_homepage_is_empty() {
        let fetcher = client(vec![]);
        assert!(scrape_stories(&fetcher, &NewsConfig::default(), 5).await.is_empty());
    }
}
