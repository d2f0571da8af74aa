//! Delivery of scraped stories to the ingestion API.
//!
//! Each story is posted on its own. A failed submission is logged and counted;
//! it never stops the remaining stories from being sent.

use crate::error::SinkError;
use crate::models::{ArticlePayload, ScrapedStory};
use crate::outputs::SinkResult;
use crate::utils::truncate_for_log;
use std::future::Future;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Receives one article at a time. `true` means the record was accepted.
pub trait ArticleSink: Sync {
    fn submit(&self, payload: &ArticlePayload) -> impl Future<Output = bool> + Send;
}

/// Posts articles as JSON to `<ingest_url>/news/create`.
#[derive(Debug, Clone)]
pub struct HttpIngestSink {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpIngestSink {
    pub fn new(client: reqwest::Client, ingest_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/news/create", ingest_url.trim_end_matches('/')),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(level = "debug", skip_all, fields(endpoint = %self.endpoint))]
    async fn post(&self, payload: &ArticlePayload) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "User-Agent",
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            )
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 200 || status == 201 {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected { status, body })
    }
}

impl ArticleSink for HttpIngestSink {
    async fn submit(&self, payload: &ArticlePayload) -> bool {
        match self.post(payload).await {
            Ok(()) => {
                info!(title = %truncate_for_log(&payload.title, 50), "Sent story");
                true
            }
            Err(e) => {
                warn!(
                    title = %truncate_for_log(&payload.title, 50),
                    error = %truncate_for_log(&e.to_string(), 300),
                    "Failed to send story"
                );
                false
            }
        }
    }
}

/// Submit every story, in order, and count the successes.
#[instrument(level = "info", skip_all, fields(count = stories.len()))]
pub async fn deliver<S: ArticleSink>(sink: &S, stories: &[ScrapedStory]) -> SinkResult {
    let mut result = SinkResult::default();
    for story in stories {
        result.attempted += 1;
        if sink.submit(&ArticlePayload::from(story)).await {
            result.delivered += 1;
        }
    }
    info!(
        delivered = result.delivered,
        attempted = result.attempted,
        "Successfully sent {}/{} stories",
        result.delivered,
        result.attempted
    );
    result
}
