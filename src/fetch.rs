//! HTTP fetching with identity rotation, bounded retry, and a blocking fallback.
//!
//! # Architecture
//!
//! - [`Transport`]: Core trait for a single GET; [`ReqwestTransport`] is the
//!   production implementation
//! - [`Identity`]: Headers presented by one request, built by the stateless
//!   [`choose_identity`]
//! - [`FetchClient`]: Wraps any transport with pacing, retry, and the
//!   alternate-identity escalation
//!
//! # Retry Strategy
//!
//! - A randomized pacing delay before every primary attempt
//! - Up to `max_attempts` primary attempts, each with a freshly chosen identity
//! - Randomized backoff after every failed attempt except the last
//! - If the last primary attempt is refused with 403, exactly one alternate
//!   attempt with a fixed minimal identity and no pacing

use crate::config::FetchPolicy;
use crate::error::{FetchError, TransportError};
use rand::seq::IndexedRandom;
use rand::rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// User agent presented by the alternate fetch.
pub const ALTERNATE_USER_AGENT: &str = "Mozilla/5.0 (compatible; NewsBot/1.0)";

/// The headers one request presents to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    pub referrer: Option<String>,
    /// Browser-like headers; empty for the minimal identity.
    pub extra_headers: Vec<(&'static str, &'static str)>,
}

/// Headers that accompany a rotated user agent. Accept-Encoding is negotiated
/// by the HTTP client itself so bodies arrive decoded.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("DNT", "1"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Cache-Control", "max-age=0"),
];

impl Identity {
    /// Full browser header set around `user_agent`.
    pub fn browser(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            referrer: None,
            extra_headers: BROWSER_HEADERS.to_vec(),
        }
    }

    /// Fixed generic identity used by the alternate fetch: no referrer and no
    /// browser headers.
    pub fn minimal() -> Self {
        Self {
            user_agent: ALTERNATE_USER_AGENT.to_string(),
            referrer: None,
            extra_headers: Vec::new(),
        }
    }

    pub fn with_referrer(mut self, referrer: Option<&str>) -> Self {
        self.referrer = referrer.map(str::to_string);
        self
    }

    /// Every header to send, user agent and referrer included.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("User-Agent", self.user_agent.clone())];
        headers.extend(
            self.extra_headers
                .iter()
                .map(|(name, value)| (*name, value.to_string())),
        );
        if let Some(referrer) = &self.referrer {
            headers.push(("Referer", referrer.clone()));
        }
        headers
    }
}

/// Pick a user agent uniformly from `pool` and build its browser identity.
/// An empty pool yields the minimal identity.
pub fn choose_identity(pool: &[String]) -> Identity {
    match pool.choose(&mut rng()) {
        Some(user_agent) => Identity::browser(user_agent),
        None => Identity::minimal(),
    }
}

/// One GET as handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub url: String,
    pub identity: Identity,
    pub timeout: Duration,
}

/// Status and body of a completed exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[cfg(test)]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single HTTP GET. Implementations must not retry on their own.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        request: &GetRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, request: &GetRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in request.identity.headers() {
            builder = builder.header(name, value);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// Per-call request context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchContext {
    pub referrer: Option<String>,
    pub timeout: Duration,
}

impl FetchContext {
    pub fn new(referrer: Option<&str>, timeout: Duration) -> Self {
        Self {
            referrer: referrer.map(str::to_string),
            timeout,
        }
    }
}

/// How many requests a fetch actually issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attempts {
    pub primary: u32,
    pub alternate: u32,
}

/// A successfully fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: u16,
    pub body: String,
    /// Whether the body came from the alternate-identity fetch.
    pub via_alternate: bool,
}

/// Result of [`FetchClient::fetch`] together with its attempt counters.
#[derive(Debug)]
pub struct FetchOutcome {
    pub attempts: Attempts,
    pub result: Result<Page, FetchError>,
}

impl FetchOutcome {
    /// The page body on success. The failure has already been logged.
    pub fn into_page(self) -> Option<Page> {
        self.result.ok()
    }
}

/// Pacing, retry, and 403 escalation around a [`Transport`].
#[derive(Debug, Clone)]
pub struct FetchClient<T> {
    transport: T,
    policy: FetchPolicy,
    user_agents: Vec<String>,
}

impl<T: Transport> FetchClient<T> {
    pub fn new(transport: T, policy: FetchPolicy, user_agents: Vec<String>) -> Self {
        Self {
            transport,
            policy,
            user_agents,
        }
    }

    /// Context for listing pages and continuations.
    pub fn listing_context(&self) -> FetchContext {
        FetchContext::new(None, self.policy.listing_timeout())
    }

    /// Context for article bodies, sent with a referrer.
    pub fn article_context(&self, referrer: &str) -> FetchContext {
        FetchContext::new(Some(referrer), self.policy.timeout())
    }

    /// Fetch `url`, absorbing transient failures up to the attempt ceiling.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str, context: &FetchContext) -> FetchOutcome {
        let total_t0 = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = Attempts::default();
        let mut last_error = FetchError::Status(0);

        for attempt in 1..=max_attempts {
            let request = GetRequest {
                url: url.to_string(),
                identity: choose_identity(&self.user_agents)
                    .with_referrer(context.referrer.as_deref()),
                timeout: context.timeout,
            };
            pause(self.policy.pacing.sample()).await;

            attempts.primary += 1;
            let is_last = attempt == max_attempts;
            debug!(attempt, user_agent = %request.identity.user_agent, "Fetching");

            match self.transport.get(&request).await {
                Ok(response) if response.is_success() => {
                    info!(
                        attempt,
                        status = response.status,
                        bytes = response.body.len(),
                        elapsed_ms = total_t0.elapsed().as_millis(),
                        "Fetched"
                    );
                    return FetchOutcome {
                        attempts,
                        result: Ok(Page {
                            status: response.status,
                            body: response.body,
                            via_alternate: false,
                        }),
                    };
                }
                Ok(response) if response.status == 403 => {
                    warn!(attempt, max = max_attempts, "Access forbidden (403)");
                    if is_last {
                        let result = self.fetch_alternate(url, &mut attempts).await;
                        return FetchOutcome {
                            attempts,
                            result,
                        };
                    }
                }
                Ok(response) => {
                    warn!(attempt, max = max_attempts, status = response.status, "Unexpected status");
                    last_error = FetchError::Status(response.status);
                }
                Err(e) => {
                    warn!(attempt, max = max_attempts, error = %e, "Request failed");
                    last_error = FetchError::Transport(e);
                }
            }

            if !is_last {
                let delay = self.policy.backoff.sample();
                debug!(attempt, ?delay, "Backing off");
                pause(delay).await;
            }
        }

        error!(
            attempts = attempts.primary,
            elapsed_ms = total_t0.elapsed().as_millis(),
            error = %last_error,
            "Fetch exhausted retries"
        );
        FetchOutcome {
            attempts,
            result: Err(last_error),
        }
    }

    /// One request with the minimal identity. No pacing, no retry.
    async fn fetch_alternate(&self, url: &str, attempts: &mut Attempts) -> Result<Page, FetchError> {
        info!("Trying alternate access");
        let request = GetRequest {
            url: url.to_string(),
            identity: Identity::minimal(),
            timeout: self.policy.listing_timeout(),
        };
        attempts.alternate += 1;
        match self.transport.get(&request).await {
            Ok(response) if response.is_success() => {
                info!(bytes = response.body.len(), "Alternate access succeeded");
                Ok(Page {
                    status: response.status,
                    body: response.body,
                    via_alternate: true,
                })
            }
            Ok(response) => {
                warn!(status = response.status, "Alternate access failed");
                Err(FetchError::Blocked {
                    alternate: Some(response.status),
                })
            }
            Err(e) => {
                warn!(error = %e, "Alternate access error");
                Err(FetchError::Blocked { alternate: None })
            }
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}
