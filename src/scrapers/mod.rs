//! Site scrapers built on the shared fetch, selector, and pagination layers.
//!
//! Each scraper follows the same two-phase pattern:
//!
//! 1. **Indexing**: discover what to scrape (categories or homepage stories)
//! 2. **Fetching**: collect the content behind each index entry
//!
//! # Supported Sources
//!
//! | Source | Module | Index | Content |
//! |--------|--------|-------|---------|
//! | Laugh Factory | [`jokes`] | Navigation block categories | Seed page + AJAX "load more" fragments |
//! | New York Times | [`nytimes`] | Homepage story containers | Article pages, section selectors with broad fallback |
//!
//! Failed fetches are logged and yield empty results; no scraper returns an
//! error.

pub mod jokes;
pub mod nytimes;
