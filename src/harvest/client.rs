//! HTTP fetch client
//!
//! This module performs the per-identifier request/response cycle against the
//! catalog API, including:
//! - Building the HTTP client with timeouts and a descriptive user agent
//! - Classifying each response as success, transient or permanent failure
//! - Bounded retry with capped exponential backoff and jitter
//! - Honoring server-supplied Retry-After hints on rate limits
//!
//! The client is pure with respect to the rest of the pipeline: it touches
//! only the network. Persisting outcomes is the run controller's job, which
//! keeps this module an independently testable function of identifier to
//! outcome.

use crate::config::{ApiConfig, FetchConfig};
use crate::harvest::record::{map_product, ProductRecord};
use crate::ledger::FailureKind;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Final outcome of fetching one identifier, after the retry budget
#[derive(Debug)]
pub enum FetchOutcome {
    /// Record fetched and mapped; ready for the result writer
    Success(ProductRecord),

    /// Permanent failure; ready for the failure log
    Failed { kind: FailureKind, message: String },
}

/// A fetch outcome together with how many attempts it took
#[derive(Debug)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    pub attempts: u32,
}

/// Classification of a single attempt, before retry policy is applied
#[derive(Debug)]
enum Attempt {
    Success(ProductRecord),
    Transient {
        message: String,
        retry_after: Option<Duration>,
    },
    Permanent {
        kind: FailureKind,
        message: String,
    },
}

/// Builds the HTTP client used for all fetches
pub fn build_http_client(api: &ApiConfig, fetch: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(api.user_agent.clone())
        .timeout(Duration::from_secs(fetch.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the request URL for an identifier from the endpoint template
pub fn product_url(template: &str, identifier: &str) -> String {
    template.replace("{id}", identifier)
}

/// Fetches one identifier with retry and backoff
///
/// Transient failures (timeout, 5xx, rate limit, connection errors) are
/// retried up to `max_attempts` with exponentially growing, capped, jittered
/// delays; a rate limit's Retry-After hint raises the floor of the next
/// delay. A transient failure that survives the whole budget is escalated to
/// `FailureKind::RetryExhausted`. Permanent failures return immediately.
pub async fn fetch_product(
    client: &Client,
    config: &FetchConfig,
    template: &str,
    identifier: &str,
) -> FetchReport {
    let url = product_url(template, identifier);
    let mut last_message = String::new();

    for attempt in 1..=config.max_attempts {
        match fetch_once(client, &url, identifier).await {
            Attempt::Success(record) => {
                return FetchReport {
                    outcome: FetchOutcome::Success(record),
                    attempts: attempt,
                };
            }
            Attempt::Permanent { kind, message } => {
                return FetchReport {
                    outcome: FetchOutcome::Failed { kind, message },
                    attempts: attempt,
                };
            }
            Attempt::Transient {
                message,
                retry_after,
            } => {
                tracing::debug!(
                    "Transient failure for {} (attempt {}/{}): {}",
                    identifier,
                    attempt,
                    config.max_attempts,
                    message
                );
                last_message = message;

                if attempt < config.max_attempts {
                    let delay = backoff_delay(config, attempt, retry_after);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    FetchReport {
        outcome: FetchOutcome::Failed {
            kind: FailureKind::RetryExhausted,
            message: last_message,
        },
        attempts: config.max_attempts,
    }
}

/// Performs and classifies a single attempt
async fn fetch_once(client: &Client, url: &str, identifier: &str) -> Attempt {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let message = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection failed".to_string()
            } else {
                e.to_string()
            };
            return Attempt::Transient {
                message,
                retry_after: None,
            };
        }
    };

    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Attempt::Permanent {
            kind: FailureKind::NotFound,
            message: "HTTP 404".to_string(),
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Attempt::Transient {
            message: "HTTP 429".to_string(),
            retry_after: parse_retry_after(response.headers()),
        };
    }

    if status.is_server_error() {
        return Attempt::Transient {
            message: format!("HTTP {}", status.as_u16()),
            retry_after: None,
        };
    }

    if !status.is_success() {
        return Attempt::Permanent {
            kind: FailureKind::HttpStatus,
            message: format!("HTTP {}", status.as_u16()),
        };
    }

    match response.json::<serde_json::Value>().await {
        Ok(payload) => match map_product(identifier, &payload) {
            Ok(record) => Attempt::Success(record),
            Err(e) => Attempt::Permanent {
                kind: FailureKind::MalformedResponse,
                message: format!("{}: {}", e, truncate_for_log(&payload.to_string())),
            },
        },
        Err(e) if e.is_decode() => Attempt::Permanent {
            kind: FailureKind::MalformedResponse,
            message: format!("Invalid JSON body: {}", e),
        },
        // Body read failed mid-stream: the connection dropped, not the payload
        Err(e) => Attempt::Transient {
            message: e.to_string(),
            retry_after: None,
        },
    }
}

/// Computes the delay before the next attempt
///
/// `attempt` is the 1-based attempt that just failed. The exponential curve
/// is capped, jitter is added on top, and a server-supplied Retry-After hint
/// acts as a floor.
pub fn backoff_delay(
    config: &FetchConfig,
    attempt: u32,
    retry_after: Option<Duration>,
) -> Duration {
    let shift = (attempt - 1).min(20);
    let exponential = config
        .initial_backoff_ms
        .saturating_mul(1u64 << shift)
        .min(config.max_backoff_ms);

    let jitter = if config.backoff_jitter_ms > 0 {
        fastrand::u64(0..=config.backoff_jitter_ms)
    } else {
        0
    };

    let delay = Duration::from_millis(exponential + jitter);
    match retry_after {
        Some(hint) if hint > delay => hint,
        _ => delay,
    }
}

/// Parses a Retry-After header given in seconds
///
/// HTTP-date values are not supported and are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    match value.trim().parse::<u64>() {
        Ok(seconds) => Some(Duration::from_secs(seconds)),
        Err(_) => {
            tracing::debug!("Ignoring non-numeric Retry-After value: {}", value);
            None
        }
    }
}

fn truncate_for_log(payload: &str) -> String {
    const MAX: usize = 200;
    if payload.len() <= MAX {
        payload.to_string()
    } else {
        let cut = payload
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &payload[..cut])
    }
}
