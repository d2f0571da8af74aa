//! End-to-end runs of the two harvesting pipelines.
//!
//! 1. **Jokes**: index categories, paginate each one to completion, write one
//!    file per category
//! 2. **News**: index homepage stories, fetch the first N article bodies,
//!    submit every story to the ingestion sink
//!
//! Neither run returns an error: failures are logged where they happen and
//! show up here only as counts.

use crate::config::{JokesConfig, NewsConfig};
use crate::fetch::{FetchClient, Transport};
use crate::models::ScrapedStory;
use crate::outputs::ingest::{ArticleSink, deliver};
use crate::outputs::{SinkResult, text};
use crate::pagination::StopReason;
use crate::scrapers::{jokes, nytimes};
use std::fmt::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument};

/// Outcome of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRun {
    pub name: String,
    pub jokes: usize,
    pub stop: StopReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JokesRun {
    pub categories: Vec<CategoryRun>,
    pub written: SinkResult,
}

/// Scrape every category and save each one as soon as it is complete.
#[instrument(level = "info", skip_all, fields(output_dir = %config.output_dir))]
pub async fn harvest_jokes<T: Transport>(client: &FetchClient<T>, config: &JokesConfig) -> JokesRun {
    let t0 = Instant::now();
    let categories = jokes::index_categories(client, config).await;
    let output_dir = Path::new(&config.output_dir);

    let mut run = JokesRun::default();
    for category in &categories {
        info!(category = %category.name, "Processing category");
        let (collected, report) = jokes::scrape_category(client, config, category).await;
        run.categories.push(CategoryRun {
            name: category.name.clone(),
            jokes: collected.len(),
            stop: report.stop,
        });
        run.written = run.written.merge(text::finalize(output_dir, collected).await);
    }

    info!(
        categories = run.categories.len(),
        jokes_written = run.written.delivered,
        jokes_failed = run.written.failed(),
        elapsed_secs = t0.elapsed().as_secs(),
        "Joke harvest complete"
    );
    run
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRun {
    pub requested: usize,
    pub stories: Vec<ScrapedStory>,
    pub delivery: SinkResult,
}

impl NewsRun {
    /// Human-readable listing of the run: every story with up to five
    /// paragraphs of its body.
    pub fn report(&self) -> String {
        let rule = "=".repeat(50);
        let mut out = String::new();
        for (i, story) in self.stories.iter().enumerate() {
            let summary = &story.summary;
            let _ = writeln!(out, "\n{rule}\nSTORY {}\n{rule}", i + 1);
            let _ = writeln!(out, "Title: {}", summary.title);
            if let Some(text) = summary.summary.as_deref().filter(|s| !s.is_empty()) {
                let _ = writeln!(out, "\nSummary: {text}");
            }
            if let Some(time) = &summary.timestamp {
                let _ = writeln!(out, "Time: {time}");
            }
            if let Some(link) = &summary.link {
                let _ = writeln!(out, "Link: {link}");
            }
            match story.body.as_ref().filter(|b| !b.is_empty()) {
                Some(body) => {
                    let count = body.paragraphs.len();
                    let _ = writeln!(out, "\nFull Article ({count} paragraphs):\n{}", "-".repeat(30));
                    for (j, paragraph) in body.paragraphs.iter().take(5).enumerate() {
                        let _ = writeln!(out, "{}. {paragraph}", j + 1);
                    }
                    if count > 5 {
                        let _ = writeln!(out, "\n... and {} more paragraphs", count - 5);
                    }
                }
                None => {
                    let _ = writeln!(out, "\nNo full content available");
                }
            }
        }
        out
    }
}

/// Scrape up to `max_stories` stories and hand them to `sink`.
#[instrument(level = "info", skip_all, fields(max_stories))]
pub async fn harvest_news<T: Transport, S: ArticleSink>(
    client: &FetchClient<T>,
    sink: &S,
    config: &NewsConfig,
    max_stories: usize,
) -> NewsRun {
    let t0 = Instant::now();
    let stories = nytimes::scrape_stories(client, config, max_stories).await;
    let delivery = deliver(sink, &stories).await;
    info!(
        stories = stories.len(),
        delivered = delivery.delivered,
        elapsed_secs = t0.elapsed().as_secs(),
        "News harvest complete"
    );
    NewsRun {
        requested: max_stories,
        stories,
        delivery,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::fetch::RawResponse;
    use crate::fetch::testing::client;
    use crate::models::{ArticleBody, ArticlePayload, ArticleSummary};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ok(body: &str) -> Result<RawResponse, TransportError> {
        Ok(RawResponse::new(200, body))
    }

    struct CountingSink(AtomicUsize);

    impl ArticleSink for CountingSink {
        async fn submit(&self, _payload: &ArticlePayload) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[tokio::test]
    async fn test_harvest_jokes_writes_each_category() {
        let tmp = tempfile::tempdir().unwrap();
        let config = JokesConfig {
            output_dir: tmp.path().join("jokes").to_string_lossy().into_owned(),
            max_continuations: 1,
            continuation_delay_ms: 0,
            ..JokesConfig::default()
        };
        let index = r#"<div class="left-navigation-block"><ul>
            <li><a href="https://www.laughfactory.com/jokes/puns"><span>Puns</span></a></li>
        </ul></div>"#;
        let seed = r#"<div class="jokes-main-pane-block"><div class="joke-text-holder"><p>I used to be a banker.</p></div></div>"#;
        let fetcher = client(vec![ok(index), ok(seed), ok("<html></html>")]);

        let run = harvest_jokes(&fetcher, &config).await;
        assert_eq!(
            run.categories,
            vec![CategoryRun {
                name: "puns".into(),
                jokes: 1,
                stop: StopReason::NoBlocks,
            }]
        );
        assert_eq!(run.written, SinkResult { delivered: 1, attempted: 1 });
        let saved = std::fs::read_to_string(tmp.path().join("jokes/puns.txt")).unwrap();
        assert_eq!(saved, "[PUNS #1]\nUser: unknown\nI used to be a banker.\n\n");
    }

    #[tokio::test]
    async fn test_harvest_news_with_no_stories_sends_nothing() {
        let fetcher = client(vec![ok("<html><body></body></html>")]);
        let sink = CountingSink(AtomicUsize::new(0));
        let run = harvest_news(&fetcher, &sink, &NewsConfig::default(), 5).await;
        assert!(run.stories.is_empty());
        assert_eq!(run.delivery, SinkResult::default());
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_report_shows_first_five_paragraphs() {
        let mut summary = ArticleSummary::new("Council approves new budget").unwrap();
        summary.link = Some("https://www.nytimes.com/a".into());
        let run = NewsRun {
            requested: 1,
            stories: vec![ScrapedStory {
                summary,
                body: Some(ArticleBody {
                    paragraphs: (1..=7).map(|i| format!("Paragraph {i}")).collect(),
                    source_link: "https://www.nytimes.com/a".into(),
                }),
            }],
            delivery: SinkResult { delivered: 1, attempted: 1 },
        };
        let report = run.report();
        assert!(report.contains("STORY 1"));
        assert!(report.contains("Full Article (7 paragraphs):"));
        assert!(report.contains("5. Paragraph 5"));
        assert!(!report.contains("Paragraph 6"));
        assert!(report.contains("... and 2 more paragraphs"));
    }
}
