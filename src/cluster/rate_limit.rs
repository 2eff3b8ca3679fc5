//! Rate-limit propagation
//!
//! Each domain in a crawl plan becomes one `domain-update` request posted to
//! the control plane's feed endpoint. Updates are not retried and are not
//! rolled back: limits accepted for some domains stay in effect even when
//! another domain's update fails.

use crate::cluster::{endpoint, ClusterError};
use crate::config::ClusterConfig;
use crate::ids::IdGenerator;
use crate::plan::{CrawlPlan, DomainLimit};
use crate::APP_ID;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Control-plane action that sets a domain's rate limit
pub const DOMAIN_UPDATE_ACTION: &str = "domain-update";

/// Body of a feed request updating one domain's rate limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitRequest {
    pub appid: String,
    pub uuid: String,
    pub domain: String,
    pub action: String,
    pub window: u32,
    pub hits: u32,
}

impl RateLimitRequest {
    pub fn new(domain: &str, limit: DomainLimit, uuid: String) -> Self {
        Self {
            appid: APP_ID.to_string(),
            uuid,
            domain: domain.to_string(),
            action: DOMAIN_UPDATE_ACTION.to_string(),
            window: limit.window,
            hits: limit.hits,
        }
    }
}

/// Outcome of a single feed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeedStatus {
    /// The control plane answered with this status code
    Http(u16),
    /// Connection failure or timeout
    Unreachable,
}

impl FeedStatus {
    /// Only 2xx responses count as an accepted update
    ///
    /// The reference check (`200 > code > 299`) could never be true, so its
    /// abort path never fired; this is the corrected range.
    pub fn is_success(&self) -> bool {
        matches!(self, FeedStatus::Http(code) if (200..=299).contains(code))
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedStatus::Http(code) => write!(f, "{}", code),
            FeedStatus::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Issues rate-limit updates for every domain in a crawl plan
pub struct RateLimitPublisher {
    client: Client,
    feed_url: String,
    ids: Arc<dyn IdGenerator>,
}

impl RateLimitPublisher {
    pub fn new(client: Client, config: &ClusterConfig, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            client,
            feed_url: endpoint(&config.rest_url, "feed"),
            ids,
        }
    }

    /// Builds one request per domain, each with a fresh identifier
    pub fn build_requests(&self, plan: &CrawlPlan) -> Vec<RateLimitRequest> {
        plan.domains
            .iter()
            .map(|(domain, limit)| RateLimitRequest::new(domain, *limit, self.ids.next_id()))
            .collect()
    }

    /// Posts every domain's rate limit to the control plane
    ///
    /// All domains are attempted before the outcome is decided. The set of
    /// distinct statuses observed is returned when every update was accepted.
    ///
    /// # Returns
    ///
    /// * `Ok(BTreeSet<FeedStatus>)` - Every update returned a 2xx status
    /// * `Err(ClusterError::RateLimitRejected)` - At least one update was not accepted
    pub async fn apply(&self, plan: &CrawlPlan) -> Result<BTreeSet<FeedStatus>, ClusterError> {
        let mut statuses = BTreeSet::new();

        for request in self.build_requests(plan) {
            let status = self.post(&request).await;
            if status.is_success() {
                tracing::debug!(
                    "Rate limit for {} set to {} hits / {}",
                    request.domain,
                    request.hits,
                    request.window
                );
            } else {
                tracing::warn!(
                    "Rate limit update for {} was not accepted ({})",
                    request.domain,
                    status
                );
            }
            statuses.insert(status);
        }

        let rejected: Vec<FeedStatus> = statuses
            .iter()
            .filter(|status| !status.is_success())
            .copied()
            .collect();

        if !rejected.is_empty() {
            return Err(ClusterError::RateLimitRejected { statuses: rejected });
        }

        tracing::info!("Rate limits set for {} domains", plan.len());
        Ok(statuses)
    }

    async fn post(&self, request: &RateLimitRequest) -> FeedStatus {
        match self.client.post(&self.feed_url).json(request).send().await {
            Ok(response) => FeedStatus::Http(response.status().as_u16()),
            Err(e) => {
                tracing::error!("Failed to post rate limit for {}: {}", request.domain, e);
                FeedStatus::Unreachable
            }
        }
    }
}
