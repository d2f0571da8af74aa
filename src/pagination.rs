//! Fetch-and-extract cycles over a "load more" continuation source.
//!
//! # States
//!
//! ```text
//! InitialFetch ──▶ Loading(1) ──▶ Loading(2) ──▶ … ──▶ Loading(max)
//!      │               │               │                    │
//!      └───────────────┴───────────────┴────────────────────┴──▶ Done(reason)
//! ```
//!
//! A failed seed fetch ends the run. A successful seed always moves on to
//! `Loading(1)`, even when it produced no items. Each continuation ends the
//! run when the fetch fails, when the response holds no blocks at all, or when
//! every block was already collected.

use crate::fetch::{FetchClient, Transport};
use crate::models::{Collection, DedupKey};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Blocks found in one response and the items that survived extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    /// Blocks matched before any filtering.
    pub blocks: usize,
    pub items: Vec<T>,
}

impl<T> Batch<T> {
    pub fn empty() -> Self {
        Self {
            blocks: 0,
            items: Vec::new(),
        }
    }
}

/// A paginated listing: where to start, how to continue, how to read a page.
pub trait ContinuationSource: Sync {
    type Item: DedupKey + Send;

    fn seed_url(&self) -> String;

    /// URL of continuation `cycle`, starting at 1.
    fn continuation_url(&self, cycle: usize) -> String;

    fn extract(&self, body: &str) -> Batch<Self::Item>;
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FetchFailed,
    NoBlocks,
    NoNewItems,
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    InitialFetch,
    Loading(usize),
    Done(StopReason),
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationReport {
    pub stop: StopReason,
    /// Continuation requests issued, including the one that stopped the run.
    pub continuations: usize,
    /// Continuations that added at least one item.
    pub productive: usize,
}

/// Drives a [`ContinuationSource`] to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub max_continuations: usize,
    pub delay: Duration,
}

impl Paginator {
    pub fn new(max_continuations: usize, delay: Duration) -> Self {
        Self {
            max_continuations,
            delay,
        }
    }

    /// Seed page only; no continuation phase.
    pub fn single_shot() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Run the state machine, adding everything new to `collection`.
    #[instrument(level = "info", skip_all, fields(collection = %collection.name()))]
    pub async fn run<T, S>(
        &self,
        client: &FetchClient<T>,
        source: &S,
        collection: &mut Collection<S::Item>,
    ) -> PaginationReport
    where
        T: Transport,
        S: ContinuationSource,
    {
        let context = client.listing_context();
        let mut state = PaginationState::InitialFetch;
        let mut continuations = 0;
        let mut productive = 0;

        loop {
            state = match state {
                PaginationState::InitialFetch => {
                    let url = source.seed_url();
                    match client.fetch(&url, &context).await.into_page() {
                        None => {
                            warn!(%url, "Failed to fetch seed page");
                            PaginationState::Done(StopReason::FetchFailed)
                        }
                        Some(page) => {
                            let batch = source.extract(&page.body);
                            let added = collection.extend(batch.items);
                            info!(blocks = batch.blocks, added, "Seed page extracted");
                            if self.max_continuations == 0 {
                                PaginationState::Done(StopReason::LimitReached)
                            } else {
                                PaginationState::Loading(1)
                            }
                        }
                    }
                }
                PaginationState::Loading(cycle) => {
                    continuations = cycle;
                    let url = source.continuation_url(cycle);
                    debug!(cycle, %url, "Loading more");
                    match client.fetch(&url, &context).await.into_page() {
                        None => {
                            warn!(cycle, %url, "Failed to load more");
                            PaginationState::Done(StopReason::FetchFailed)
                        }
                        Some(page) => {
                            let batch = source.extract(&page.body);
                            if batch.blocks == 0 {
                                info!(cycle, "No more blocks returned, stopping");
                                PaginationState::Done(StopReason::NoBlocks)
                            } else {
                                let added = collection.extend(batch.items);
                                info!(cycle, blocks = batch.blocks, added, "Continuation extracted");
                                if added == 0 {
                                    info!(cycle, "No new items, stopping early");
                                    PaginationState::Done(StopReason::NoNewItems)
                                } else {
                                    productive += 1;
                                    if cycle >= self.max_continuations {
                                        PaginationState::Done(StopReason::LimitReached)
                                    } else {
                                        if !self.delay.is_zero() {
                                            sleep(self.delay).await;
                                        }
                                        PaginationState::Loading(cycle + 1)
                                    }
                                }
                            }
                        }
                    }
                }
                PaginationState::Done(stop) => {
                    info!(?stop, continuations, productive, total = collection.len(), "Pagination done");
                    return PaginationReport {
                        stop,
                        continuations,
                        productive,
                    };
                }
            };
        }
    }
}
