//! HTTP trigger surface.
//!
//! | Route | Method | Action |
//! |-------|--------|--------|
//! | `/` | GET | Health check |
//! | `/scrape-nytimes` | POST | Run the news pipeline; body `{"max_stories": n}` is optional |
//! | `/get-scraped-jokes` | GET | Combine the joke files and return them as plain text |

use crate::config::HarvestConfig;
use crate::fetch::{FetchClient, ReqwestTransport};
use crate::outputs::ingest::HttpIngestSink;
use crate::outputs::text;
use crate::pipeline;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared by every request.
#[derive(Debug)]
pub struct AppState {
    pub config: HarvestConfig,
    pub news: FetchClient<ReqwestTransport>,
    pub sink: HttpIngestSink,
}

impl AppState {
    pub fn new(config: HarvestConfig, transport: ReqwestTransport) -> Self {
        let sink = HttpIngestSink::new(transport.client().clone(), &config.news.ingest_url);
        let news = FetchClient::new(
            transport,
            config.news.fetch.clone(),
            config.user_agents.clone(),
        );
        Self { config, news, sink }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeRequest {
    pub max_stories: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stories_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResponse {
    fn failure(error: String, message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            stories_count: None,
            requested_count: None,
            error: Some(error),
        }
    }
}

type TriggerError = (StatusCode, Json<TriggerResponse>);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/scrape-nytimes", post(scrape_nytimes))
        .route("/get-scraped-jokes", get(get_scraped_jokes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: AppState, addr: &str) -> Result<(), Box<dyn Error>> {
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Trigger server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn scrape_nytimes(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TriggerResponse>, TriggerError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ScrapeRequest::default()
    } else {
        serde_json::from_slice::<ScrapeRequest>(&body).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(TriggerResponse::failure(e.to_string(), "Invalid request body")),
            )
        })?
    };
    let max_stories = request.max_stories.unwrap_or(state.config.news.max_stories);
    info!(max_stories, "News scrape triggered");

    // Run on its own task so a panic inside the pipeline becomes a 500.
    let task_state = Arc::clone(&state);
    let task = tokio::spawn(async move {
        pipeline::harvest_news(
            &task_state.news,
            &task_state.sink,
            &task_state.config.news,
            max_stories,
        )
        .await
    });

    match task.await {
        Ok(run) => Ok(Json(TriggerResponse {
            success: true,
            message: format!(
                "Scraped {} stories, sent {}/{} to the ingestion API",
                run.stories.len(),
                run.delivery.delivered,
                run.delivery.attempted
            ),
            stories_count: Some(run.stories.len()),
            requested_count: Some(run.requested),
            error: None,
        })),
        Err(e) => {
            error!(error = %e, "News scrape task failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse::failure(e.to_string(), "Scraping failed")),
            ))
        }
    }
}

async fn get_scraped_jokes(State(state): State<Arc<AppState>>) -> Response {
    let jokes = &state.config.jokes;
    let output = Path::new(&jokes.combined_file);

    match text::write_combined(Path::new(&jokes.output_dir), output).await {
        Ok(combined) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            combined,
        )
            .into_response(),
        Err(e) => {
            error!(dir = %jokes.output_dir, error = %e, "Failed to combine jokes");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to combine jokes: {e}"),
            )
                .into_response()
        }
    }
}
