//! Command-line interface definitions for Text Harvest.
//!
//! Every option overrides the matching field of the YAML configuration; the
//! configuration path and ingestion URL can also come from the environment.

use crate::config::HarvestConfig;
use clap::{Parser, Subcommand};

/// Command-line arguments for the Text Harvest application.
///
/// # Examples
///
/// ```sh
/// # Scrape every joke category into ./jokes
/// text_harvest jokes
///
/// # Scrape three news stories and post them to a local ingestion API
/// text_harvest --ingest-url http://localhost:4000 news --max-stories 3
///
/// # Expose the pipelines over HTTP
/// text_harvest -c harvest.yaml serve --bind 0.0.0.0:8000
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, global = true, env = "HARVEST_CONFIG")]
    pub config: Option<String>,

    /// Base URL of the ingestion API
    #[arg(long, global = true, env = "CAPI_URL")]
    pub ingest_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Scrape every joke category into per-category text files
    Jokes {
        /// Directory receiving one file per category
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Maximum "load more" requests per category
        #[arg(long)]
        max_loads: Option<usize>,
    },

    /// Scrape homepage news stories and send them to the ingestion API
    News {
        /// Number of stories whose full article is fetched
        #[arg(short = 'n', long)]
        max_stories: Option<usize>,
    },

    /// Concatenate the per-category joke files into one file
    Combine {
        /// Directory holding the category files
        #[arg(short, long)]
        jokes_dir: Option<String>,

        /// Combined output file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Serve the HTTP trigger endpoints
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:8000")]
        bind: String,
    },
}

impl Cli {
    /// Apply every flag that was given on top of `config`.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(url) = &self.ingest_url {
            config.news.ingest_url = url.clone();
        }
        match &self.command {
            Command::Jokes {
                output_dir,
                max_loads,
            } => {
                if let Some(dir) = output_dir {
                    config.jokes.output_dir = dir.clone();
                }
                if let Some(max) = max_loads {
                    config.jokes.max_continuations = *max;
                }
            }
            Command::News { max_stories } => {
                if let Some(max) = max_stories {
                    config.news.max_stories = *max;
                }
            }
            Command::Combine { jokes_dir, output } => {
                if let Some(dir) = jokes_dir {
                    config.jokes.output_dir = dir.clone();
                }
                if let Some(output) = output {
                    config.jokes.combined_file = output.clone();
                }
            }
            Command::Serve { .. } => {}
        }
    }
}
