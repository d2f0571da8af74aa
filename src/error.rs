//! Error taxonomy for the harvesting pipeline.
//!
//! Fetch and sink errors are contained at the component that produced them:
//! they are logged and folded into counts or empty results, never propagated
//! past a pipeline boundary. Only [`ConfigError`] is allowed to stop startup.

use thiserror::Error;

/// A failure reported by the HTTP transport before any status was seen.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS, or body read failure.
    #[error("transport failure: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Terminal outcome of a fetch once every attempt has been spent.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The last primary attempt failed at the transport level.
    #[error("transport failure after retries: {0}")]
    Transport(#[from] TransportError),

    /// The last primary attempt returned a non-2xx, non-403 status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Every primary attempt was refused with 403 and the alternate fetch did
    /// not recover. `alternate` holds the alternate status when one was seen.
    #[error("access blocked (403); alternate fetch status: {alternate:?}")]
    Blocked { alternate: Option<u16> },
}

/// A failed delivery of one record to the ingestion endpoint.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("submission failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ingestion endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
