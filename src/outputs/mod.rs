//! Hand-off of finished collections to their destinations.
//!
//! # Submodules
//!
//! - [`text`]: One text file per joke category, plus the combined file
//! - [`ingest`]: Per-article submission to the ingestion API
//!
//! # Output Structure
//!
//! ```text
//! jokes/
//! ├── knock_knock.txt
//! └── puns.txt
//! combined_jokes.txt
//! ```

pub mod ingest;
pub mod text;

/// Records delivered versus records handed to a sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkResult {
    pub delivered: usize,
    pub attempted: usize,
}

impl SinkResult {
    pub fn failed(&self) -> usize {
        self.attempted - self.delivered
    }

    pub fn merge(self, other: SinkResult) -> SinkResult {
        SinkResult {
            delivered: self.delivered + other.delivered,
            attempted: self.attempted + other.attempted,
        }
    }
}
