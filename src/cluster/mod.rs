//! Control-plane client
//!
//! The crawl cluster exposes a small REST service that reports cluster
//! health and accepts per-domain rate-limit updates. This module contains:
//! - Building an HTTP client with explicit timeouts
//! - The health gate run before anything else
//! - Publishing a crawl plan's rate limits

mod client;
mod health;
mod rate_limit;

pub use client::build_http_client;
pub use health::{ClusterHealth, HealthGate, NodeHealth};
pub use rate_limit::{FeedStatus, RateLimitPublisher, RateLimitRequest, DOMAIN_UPDATE_ACTION};

use thiserror::Error;

/// Errors raised while talking to the control plane
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Control plane rejected rate limits (statuses: {})", format_statuses(.statuses))]
    RateLimitRejected { statuses: Vec<FeedStatus> },
}

fn format_statuses(statuses: &[FeedStatus]) -> String {
    statuses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Joins the control-plane base URL and an endpoint path
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}
