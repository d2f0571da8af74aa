//! # Text Harvest
//!
//! Scrapes two kinds of public text content:
//!
//! - **Jokes**: every category of a joke catalog, following its "load more"
//!   endpoint until no new jokes appear, saved as one text file per category
//! - **News**: homepage headlines with summaries and timestamps, plus the full
//!   body of the first few articles, posted to an ingestion API
//!
//! ## Usage
//!
//! ```sh
//! text_harvest jokes
//! text_harvest news --max-stories 5
//! text_harvest combine
//! text_harvest serve --bind 0.0.0.0:8000
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: paced, retried GETs with rotating browser identities and a
//!    minimal-identity fallback for blocked requests ([`fetch`])
//! 2. **Extraction**: ordered selector strategies and content filters
//!    ([`selector`], [`filter`])
//! 3. **Pagination**: a seed page followed by continuation requests
//!    ([`pagination`])
//! 4. **Output**: text files for jokes, HTTP ingestion for stories ([`outputs`])

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetch;
mod filter;
mod models;
mod outputs;
mod pagination;
mod pipeline;
mod scrapers;
mod selector;
mod server;
mod utils;

use cli::{Cli, Command};
use config::HarvestConfig;
use fetch::{FetchClient, ReqwestTransport};
use outputs::ingest::HttpIngestSink;
use outputs::text;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("text_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = HarvestConfig::load(args.config.as_deref()).await?;
    args.apply(&mut config);

    let transport = ReqwestTransport::new()?;

    match args.command {
        Command::Jokes { .. } => {
            let output_dir = Path::new(&config.jokes.output_dir);
            if let Err(e) = ensure_writable_dir(output_dir).await {
                error!(
                    path = %config.jokes.output_dir,
                    error = %e,
                    "Joke output directory is not writable (fix perms or choose a different path)"
                );
                return Err(e);
            }

            let client = FetchClient::new(
                transport,
                config.jokes.fetch.clone(),
                config.user_agents.clone(),
            );
            let run = pipeline::harvest_jokes(&client, &config.jokes).await;
            for category in &run.categories {
                info!(
                    category = %category.name,
                    jokes = category.jokes,
                    stop = ?category.stop,
                    "Category summary"
                );
            }
        }
        Command::News { .. } => {
            let sink = HttpIngestSink::new(transport.client().clone(), &config.news.ingest_url);
            info!(endpoint = %sink.endpoint(), "Stories will be sent to the ingestion API");
            let client = FetchClient::new(
                transport,
                config.news.fetch.clone(),
                config.user_agents.clone(),
            );
            let run =
                pipeline::harvest_news(&client, &sink, &config.news, config.news.max_stories)
                    .await;
            print!("{}", run.report());
            info!(
                stories = run.stories.len(),
                sent = run.delivery.delivered,
                attempted = run.delivery.attempted,
                "Successfully sent {}/{} stories to the ingestion API",
                run.delivery.delivered,
                run.delivery.attempted
            );
        }
        Command::Combine { .. } => {
            let combined = text::write_combined(
                Path::new(&config.jokes.output_dir),
                Path::new(&config.jokes.combined_file),
            )
            .await?;
            info!(
                path = %config.jokes.combined_file,
                chars = combined.chars().count(),
                "Combined file complete"
            );
        }
        Command::Serve { ref bind } => {
            server::serve(server::AppState::new(config, transport), bind).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
